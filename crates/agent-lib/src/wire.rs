//! Report serialization
//!
//! Two total, order-preserving encodings of the same report: canonical JSON
//! text and compact CBOR. Key order is fixed (header, metrics, custom_metrics)
//! and the model keeps its collections canonically sorted, so both encodings
//! are byte-for-byte reproducible for the same report value. Field names come
//! from the [`naming`](crate::naming) tables under the mode chosen for the
//! run.

use crate::error::EncodingError;
use crate::models::{
    ConnectionEntry, InterfaceCounters, ListeningPort, MetricValue, Protocol, Report,
    ReportHeader, ReportMetrics,
};
use crate::naming::{Field, NamingMode};
use ciborium::Value as Cbor;
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;

/// Encode a report as canonical JSON text.
pub fn to_json_string(report: &Report, mode: NamingMode) -> Result<String, EncodingError> {
    let value = to_json_value(report, mode)?;
    Ok(serde_json::to_string(&value)?)
}

/// Encode a report as indented JSON, for dry-run output and logs.
pub fn to_json_string_pretty(report: &Report, mode: NamingMode) -> Result<String, EncodingError> {
    let value = to_json_value(report, mode)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Encode a report as compact CBOR bytes.
pub fn to_cbor(report: &Report, mode: NamingMode) -> Result<Vec<u8>, EncodingError> {
    let value = to_cbor_value(report, mode)?;
    let mut buf = Vec::new();
    ciborium::ser::into_writer(&value, &mut buf).map_err(|e| EncodingError::Cbor(e.to_string()))?;
    Ok(buf)
}

/// Decode a JSON report produced under the same naming mode.
pub fn from_json_str(text: &str, mode: NamingMode) -> Result<Report, EncodingError> {
    let value: Json = serde_json::from_str(text)?;
    decode_json_report(&value, mode)
}

/// Decode a CBOR report produced under the same naming mode.
pub fn from_cbor(bytes: &[u8], mode: NamingMode) -> Result<Report, EncodingError> {
    let value: Cbor = ciborium::de::from_reader(bytes).map_err(|e| EncodingError::Cbor(e.to_string()))?;
    decode_cbor_report(&value, mode)
}

// ---------------------------------------------------------------------------
// JSON encoding
// ---------------------------------------------------------------------------

fn to_json_value(report: &Report, mode: NamingMode) -> Result<Json, EncodingError> {
    let mut root = Map::new();

    let mut header = Map::new();
    header.insert(
        Field::ReportId.wire(mode).to_string(),
        Json::from(report.header.report_id),
    );
    header.insert(
        Field::Version.wire(mode).to_string(),
        Json::from(report.header.version.clone()),
    );
    root.insert(Field::Header.wire(mode).to_string(), Json::Object(header));

    let mut metrics = Map::new();
    let ports: Vec<Json> = report
        .metrics
        .listening_ports
        .iter()
        .map(|p| json_listening_port(p, mode))
        .collect();
    metrics.insert(Field::ListeningPorts.wire(mode).to_string(), Json::Array(ports));

    let connections: Vec<Json> = report
        .metrics
        .established_connections
        .iter()
        .map(|c| json_connection(c, mode))
        .collect();
    metrics.insert(
        Field::EstablishedConnections.wire(mode).to_string(),
        Json::Array(connections),
    );

    let mut stats = Map::new();
    for (name, counters) in &report.metrics.network_stats {
        stats.insert(name.clone(), json_counters(counters, mode));
    }
    metrics.insert(Field::NetworkStats.wire(mode).to_string(), Json::Object(stats));
    root.insert(Field::Metrics.wire(mode).to_string(), Json::Object(metrics));

    if let Some(custom) = &report.custom_metrics {
        let mut section = Map::new();
        for (name, value) in custom {
            section.insert(name.clone(), json_metric_value(name, value)?);
        }
        root.insert(Field::CustomMetrics.wire(mode).to_string(), Json::Object(section));
    }

    Ok(Json::Object(root))
}

fn json_listening_port(port: &ListeningPort, mode: NamingMode) -> Json {
    let mut map = Map::new();
    map.insert(
        Field::Protocol.wire(mode).to_string(),
        Json::from(port.protocol.as_str()),
    );
    map.insert(Field::Port.wire(mode).to_string(), Json::from(port.port));
    map.insert(
        Field::Interface.wire(mode).to_string(),
        Json::from(port.interface.clone()),
    );
    Json::Object(map)
}

fn json_connection(conn: &ConnectionEntry, mode: NamingMode) -> Json {
    let mut map = Map::new();
    map.insert(
        Field::LocalAddr.wire(mode).to_string(),
        Json::from(conn.local_addr.clone()),
    );
    map.insert(Field::LocalPort.wire(mode).to_string(), Json::from(conn.local_port));
    map.insert(
        Field::RemoteAddr.wire(mode).to_string(),
        Json::from(conn.remote_addr.clone()),
    );
    map.insert(Field::RemotePort.wire(mode).to_string(), Json::from(conn.remote_port));
    map.insert(
        Field::Protocol.wire(mode).to_string(),
        Json::from(conn.protocol.as_str()),
    );
    Json::Object(map)
}

fn json_counters(counters: &InterfaceCounters, mode: NamingMode) -> Json {
    let mut map = Map::new();
    map.insert(Field::BytesIn.wire(mode).to_string(), Json::from(counters.bytes_in));
    map.insert(Field::BytesOut.wire(mode).to_string(), Json::from(counters.bytes_out));
    map.insert(Field::PacketsIn.wire(mode).to_string(), Json::from(counters.packets_in));
    map.insert(
        Field::PacketsOut.wire(mode).to_string(),
        Json::from(counters.packets_out),
    );
    Json::Object(map)
}

fn json_metric_value(name: &str, value: &MetricValue) -> Result<Json, EncodingError> {
    match value {
        MetricValue::Integer(i) => Ok(Json::from(*i)),
        MetricValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| EncodingError::NonFinite {
                name: name.to_string(),
                value: *f,
            }),
        MetricValue::Text(s) => Ok(Json::from(s.clone())),
    }
}

// ---------------------------------------------------------------------------
// CBOR encoding
// ---------------------------------------------------------------------------

fn to_cbor_value(report: &Report, mode: NamingMode) -> Result<Cbor, EncodingError> {
    let key = |f: Field| Cbor::Text(f.wire(mode).to_string());

    let header = Cbor::Map(vec![
        (key(Field::ReportId), Cbor::Integer(report.header.report_id.into())),
        (key(Field::Version), Cbor::Text(report.header.version.clone())),
    ]);

    let ports: Vec<Cbor> = report
        .metrics
        .listening_ports
        .iter()
        .map(|p| {
            Cbor::Map(vec![
                (key(Field::Protocol), Cbor::Text(p.protocol.as_str().to_string())),
                (key(Field::Port), Cbor::Integer(p.port.into())),
                (key(Field::Interface), Cbor::Text(p.interface.clone())),
            ])
        })
        .collect();

    let connections: Vec<Cbor> = report
        .metrics
        .established_connections
        .iter()
        .map(|c| {
            Cbor::Map(vec![
                (key(Field::LocalAddr), Cbor::Text(c.local_addr.clone())),
                (key(Field::LocalPort), Cbor::Integer(c.local_port.into())),
                (key(Field::RemoteAddr), Cbor::Text(c.remote_addr.clone())),
                (key(Field::RemotePort), Cbor::Integer(c.remote_port.into())),
                (key(Field::Protocol), Cbor::Text(c.protocol.as_str().to_string())),
            ])
        })
        .collect();

    let stats: Vec<(Cbor, Cbor)> = report
        .metrics
        .network_stats
        .iter()
        .map(|(name, c)| {
            (
                Cbor::Text(name.clone()),
                Cbor::Map(vec![
                    (key(Field::BytesIn), Cbor::Integer(c.bytes_in.into())),
                    (key(Field::BytesOut), Cbor::Integer(c.bytes_out.into())),
                    (key(Field::PacketsIn), Cbor::Integer(c.packets_in.into())),
                    (key(Field::PacketsOut), Cbor::Integer(c.packets_out.into())),
                ]),
            )
        })
        .collect();

    let metrics = Cbor::Map(vec![
        (key(Field::ListeningPorts), Cbor::Array(ports)),
        (key(Field::EstablishedConnections), Cbor::Array(connections)),
        (key(Field::NetworkStats), Cbor::Map(stats)),
    ]);

    let mut root = vec![
        (key(Field::Header), header),
        (key(Field::Metrics), metrics),
    ];

    if let Some(custom) = &report.custom_metrics {
        let mut section = Vec::with_capacity(custom.len());
        for (name, value) in custom {
            section.push((Cbor::Text(name.clone()), cbor_metric_value(name, value)?));
        }
        root.push((key(Field::CustomMetrics), Cbor::Map(section)));
    }

    Ok(Cbor::Map(root))
}

fn cbor_metric_value(name: &str, value: &MetricValue) -> Result<Cbor, EncodingError> {
    match value {
        MetricValue::Integer(i) => Ok(Cbor::Integer((*i).into())),
        MetricValue::Float(f) => {
            if !f.is_finite() {
                return Err(EncodingError::NonFinite {
                    name: name.to_string(),
                    value: *f,
                });
            }
            Ok(Cbor::Float(*f))
        }
        MetricValue::Text(s) => Ok(Cbor::Text(s.clone())),
    }
}

// ---------------------------------------------------------------------------
// JSON decoding
// ---------------------------------------------------------------------------

const REPORT_KEYS: &[Field] = &[Field::Header, Field::Metrics, Field::CustomMetrics];
const HEADER_KEYS: &[Field] = &[Field::ReportId, Field::Version];
const METRICS_KEYS: &[Field] = &[
    Field::ListeningPorts,
    Field::EstablishedConnections,
    Field::NetworkStats,
];
const PORT_KEYS: &[Field] = &[Field::Protocol, Field::Port, Field::Interface];
const CONNECTION_KEYS: &[Field] = &[
    Field::LocalAddr,
    Field::LocalPort,
    Field::RemoteAddr,
    Field::RemotePort,
    Field::Protocol,
];
const COUNTER_KEYS: &[Field] = &[
    Field::BytesIn,
    Field::BytesOut,
    Field::PacketsIn,
    Field::PacketsOut,
];

fn decode_json_report(value: &Json, mode: NamingMode) -> Result<Report, EncodingError> {
    let root = as_json_object(value, "report")?;
    check_json_keys(root, REPORT_KEYS, mode, "report")?;

    let header = as_json_object(json_field(root, Field::Header, mode)?, "header")?;
    check_json_keys(header, HEADER_KEYS, mode, "header")?;
    let report_id = json_u64(json_field(header, Field::ReportId, mode)?, "report_id")?;
    let version = json_str(json_field(header, Field::Version, mode)?, "version")?;

    let metrics = as_json_object(json_field(root, Field::Metrics, mode)?, "metrics")?;
    check_json_keys(metrics, METRICS_KEYS, mode, "metrics")?;

    let ports_value = json_field(metrics, Field::ListeningPorts, mode)?;
    let listening_ports = ports_value
        .as_array()
        .ok_or_else(|| malformed("listening ports must be an array"))?
        .iter()
        .map(|v| decode_json_listening_port(v, mode))
        .collect::<Result<Vec<_>, _>>()?;

    let conns_value = json_field(metrics, Field::EstablishedConnections, mode)?;
    let established_connections = conns_value
        .as_array()
        .ok_or_else(|| malformed("established connections must be an array"))?
        .iter()
        .map(|v| decode_json_connection(v, mode))
        .collect::<Result<Vec<_>, _>>()?;

    let stats_value = as_json_object(json_field(metrics, Field::NetworkStats, mode)?, "network_stats")?;
    let mut network_stats = BTreeMap::new();
    for (name, counters) in stats_value {
        network_stats.insert(name.clone(), decode_json_counters(counters, mode)?);
    }

    let custom_metrics = match root.get(Field::CustomMetrics.wire(mode)) {
        None => None,
        Some(section) => {
            let section = as_json_object(section, "custom_metrics")?;
            let mut values = BTreeMap::new();
            for (name, value) in section {
                values.insert(name.clone(), decode_json_metric_value(value)?);
            }
            Some(values)
        }
    };

    Ok(Report {
        header: ReportHeader { report_id, version },
        metrics: ReportMetrics {
            listening_ports,
            established_connections,
            network_stats,
        },
        custom_metrics,
    })
}

fn decode_json_listening_port(value: &Json, mode: NamingMode) -> Result<ListeningPort, EncodingError> {
    let map = as_json_object(value, "listening port")?;
    check_json_keys(map, PORT_KEYS, mode, "listening port")?;
    Ok(ListeningPort {
        protocol: decode_protocol(&json_str(json_field(map, Field::Protocol, mode)?, "protocol")?)?,
        port: json_port(json_field(map, Field::Port, mode)?)?,
        interface: json_str(json_field(map, Field::Interface, mode)?, "interface")?,
    })
}

fn decode_json_connection(value: &Json, mode: NamingMode) -> Result<ConnectionEntry, EncodingError> {
    let map = as_json_object(value, "connection")?;
    check_json_keys(map, CONNECTION_KEYS, mode, "connection")?;
    Ok(ConnectionEntry {
        local_addr: json_str(json_field(map, Field::LocalAddr, mode)?, "local addr")?,
        local_port: json_port(json_field(map, Field::LocalPort, mode)?)?,
        remote_addr: json_str(json_field(map, Field::RemoteAddr, mode)?, "remote addr")?,
        remote_port: json_port(json_field(map, Field::RemotePort, mode)?)?,
        protocol: decode_protocol(&json_str(json_field(map, Field::Protocol, mode)?, "protocol")?)?,
    })
}

fn decode_json_counters(value: &Json, mode: NamingMode) -> Result<InterfaceCounters, EncodingError> {
    let map = as_json_object(value, "interface counters")?;
    check_json_keys(map, COUNTER_KEYS, mode, "interface counters")?;
    Ok(InterfaceCounters {
        bytes_in: json_u64(json_field(map, Field::BytesIn, mode)?, "bytes_in")?,
        bytes_out: json_u64(json_field(map, Field::BytesOut, mode)?, "bytes_out")?,
        packets_in: json_u64(json_field(map, Field::PacketsIn, mode)?, "packets_in")?,
        packets_out: json_u64(json_field(map, Field::PacketsOut, mode)?, "packets_out")?,
    })
}

fn decode_json_metric_value(value: &Json) -> Result<MetricValue, EncodingError> {
    match value {
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(MetricValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(MetricValue::Float(f))
            } else {
                Err(malformed("unsupported custom metric number"))
            }
        }
        Json::String(s) => Ok(MetricValue::Text(s.clone())),
        _ => Err(malformed("custom metric must be a number or string")),
    }
}

fn check_json_keys(
    map: &Map<String, Json>,
    allowed: &[Field],
    mode: NamingMode,
    ctx: &str,
) -> Result<(), EncodingError> {
    for key in map.keys() {
        if !allowed.iter().any(|f| f.wire(mode) == key.as_str()) {
            return Err(malformed(&format!("unknown {ctx} key: {key}")));
        }
    }
    Ok(())
}

fn json_field<'a>(map: &'a Map<String, Json>, field: Field, mode: NamingMode) -> Result<&'a Json, EncodingError> {
    map.get(field.wire(mode))
        .ok_or_else(|| malformed(&format!("missing key: {}", field.wire(mode))))
}

fn as_json_object<'a>(value: &'a Json, ctx: &str) -> Result<&'a Map<String, Json>, EncodingError> {
    value
        .as_object()
        .ok_or_else(|| malformed(&format!("{ctx} must be an object")))
}

fn json_u64(value: &Json, ctx: &str) -> Result<u64, EncodingError> {
    value
        .as_u64()
        .ok_or_else(|| malformed(&format!("{ctx} must be an unsigned integer")))
}

fn json_str(value: &Json, ctx: &str) -> Result<String, EncodingError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(&format!("{ctx} must be a string")))
}

fn json_port(value: &Json) -> Result<u16, EncodingError> {
    let raw = json_u64(value, "port")?;
    u16::try_from(raw).map_err(|_| malformed("port out of range"))
}

// ---------------------------------------------------------------------------
// CBOR decoding
// ---------------------------------------------------------------------------

fn decode_cbor_report(value: &Cbor, mode: NamingMode) -> Result<Report, EncodingError> {
    let root = as_cbor_map(value, "report")?;
    check_cbor_keys(root, REPORT_KEYS, mode, "report")?;

    let header = as_cbor_map(cbor_field(root, Field::Header, mode)?, "header")?;
    check_cbor_keys(header, HEADER_KEYS, mode, "header")?;
    let report_id = cbor_u64(cbor_field(header, Field::ReportId, mode)?, "report_id")?;
    let version = cbor_str(cbor_field(header, Field::Version, mode)?, "version")?;

    let metrics = as_cbor_map(cbor_field(root, Field::Metrics, mode)?, "metrics")?;
    check_cbor_keys(metrics, METRICS_KEYS, mode, "metrics")?;

    let listening_ports = cbor_array(cbor_field(metrics, Field::ListeningPorts, mode)?, "listening ports")?
        .iter()
        .map(|v| decode_cbor_listening_port(v, mode))
        .collect::<Result<Vec<_>, _>>()?;

    let established_connections =
        cbor_array(cbor_field(metrics, Field::EstablishedConnections, mode)?, "connections")?
            .iter()
            .map(|v| decode_cbor_connection(v, mode))
            .collect::<Result<Vec<_>, _>>()?;

    let stats = as_cbor_map(cbor_field(metrics, Field::NetworkStats, mode)?, "network_stats")?;
    let mut network_stats = BTreeMap::new();
    for (name, counters) in stats {
        let name = match name {
            Cbor::Text(s) => s.clone(),
            _ => return Err(malformed("interface name must be text")),
        };
        network_stats.insert(name, decode_cbor_counters(counters, mode)?);
    }

    let custom_metrics = match lookup_cbor(root, Field::CustomMetrics.wire(mode)) {
        None => None,
        Some(section) => {
            let section = as_cbor_map(section, "custom_metrics")?;
            let mut values = BTreeMap::new();
            for (name, value) in section {
                let name = match name {
                    Cbor::Text(s) => s.clone(),
                    _ => return Err(malformed("custom metric name must be text")),
                };
                values.insert(name, decode_cbor_metric_value(value)?);
            }
            Some(values)
        }
    };

    Ok(Report {
        header: ReportHeader { report_id, version },
        metrics: ReportMetrics {
            listening_ports,
            established_connections,
            network_stats,
        },
        custom_metrics,
    })
}

fn decode_cbor_listening_port(value: &Cbor, mode: NamingMode) -> Result<ListeningPort, EncodingError> {
    let map = as_cbor_map(value, "listening port")?;
    check_cbor_keys(map, PORT_KEYS, mode, "listening port")?;
    Ok(ListeningPort {
        protocol: decode_protocol(&cbor_str(cbor_field(map, Field::Protocol, mode)?, "protocol")?)?,
        port: cbor_port(cbor_field(map, Field::Port, mode)?)?,
        interface: cbor_str(cbor_field(map, Field::Interface, mode)?, "interface")?,
    })
}

fn decode_cbor_connection(value: &Cbor, mode: NamingMode) -> Result<ConnectionEntry, EncodingError> {
    let map = as_cbor_map(value, "connection")?;
    check_cbor_keys(map, CONNECTION_KEYS, mode, "connection")?;
    Ok(ConnectionEntry {
        local_addr: cbor_str(cbor_field(map, Field::LocalAddr, mode)?, "local addr")?,
        local_port: cbor_port(cbor_field(map, Field::LocalPort, mode)?)?,
        remote_addr: cbor_str(cbor_field(map, Field::RemoteAddr, mode)?, "remote addr")?,
        remote_port: cbor_port(cbor_field(map, Field::RemotePort, mode)?)?,
        protocol: decode_protocol(&cbor_str(cbor_field(map, Field::Protocol, mode)?, "protocol")?)?,
    })
}

fn decode_cbor_counters(value: &Cbor, mode: NamingMode) -> Result<InterfaceCounters, EncodingError> {
    let map = as_cbor_map(value, "interface counters")?;
    check_cbor_keys(map, COUNTER_KEYS, mode, "interface counters")?;
    Ok(InterfaceCounters {
        bytes_in: cbor_u64(cbor_field(map, Field::BytesIn, mode)?, "bytes_in")?,
        bytes_out: cbor_u64(cbor_field(map, Field::BytesOut, mode)?, "bytes_out")?,
        packets_in: cbor_u64(cbor_field(map, Field::PacketsIn, mode)?, "packets_in")?,
        packets_out: cbor_u64(cbor_field(map, Field::PacketsOut, mode)?, "packets_out")?,
    })
}

fn decode_cbor_metric_value(value: &Cbor) -> Result<MetricValue, EncodingError> {
    match value {
        Cbor::Integer(i) => {
            let i = i128::from(*i);
            i64::try_from(i)
                .map(MetricValue::Integer)
                .map_err(|_| malformed("custom metric integer out of range"))
        }
        Cbor::Float(f) => Ok(MetricValue::Float(*f)),
        Cbor::Text(s) => Ok(MetricValue::Text(s.clone())),
        _ => Err(malformed("custom metric must be a number or string")),
    }
}

fn check_cbor_keys(
    map: &[(Cbor, Cbor)],
    allowed: &[Field],
    mode: NamingMode,
    ctx: &str,
) -> Result<(), EncodingError> {
    for (key, _) in map {
        match key {
            Cbor::Text(s) if allowed.iter().any(|f| f.wire(mode) == s.as_str()) => {}
            Cbor::Text(s) => return Err(malformed(&format!("unknown {ctx} key: {s}"))),
            _ => return Err(malformed(&format!("{ctx} key must be text"))),
        }
    }
    Ok(())
}

fn lookup_cbor<'a>(map: &'a [(Cbor, Cbor)], key: &str) -> Option<&'a Cbor> {
    map.iter()
        .find(|(k, _)| matches!(k, Cbor::Text(s) if s == key))
        .map(|(_, v)| v)
}

fn cbor_field<'a>(map: &'a [(Cbor, Cbor)], field: Field, mode: NamingMode) -> Result<&'a Cbor, EncodingError> {
    lookup_cbor(map, field.wire(mode))
        .ok_or_else(|| malformed(&format!("missing key: {}", field.wire(mode))))
}

fn as_cbor_map<'a>(value: &'a Cbor, ctx: &str) -> Result<&'a Vec<(Cbor, Cbor)>, EncodingError> {
    match value {
        Cbor::Map(entries) => Ok(entries),
        _ => Err(malformed(&format!("{ctx} must be a map"))),
    }
}

fn cbor_array<'a>(value: &'a Cbor, ctx: &str) -> Result<&'a Vec<Cbor>, EncodingError> {
    match value {
        Cbor::Array(items) => Ok(items),
        _ => Err(malformed(&format!("{ctx} must be an array"))),
    }
}

fn cbor_u64(value: &Cbor, ctx: &str) -> Result<u64, EncodingError> {
    match value {
        Cbor::Integer(i) => u64::try_from(i128::from(*i))
            .map_err(|_| malformed(&format!("{ctx} must be an unsigned integer"))),
        _ => Err(malformed(&format!("{ctx} must be an integer"))),
    }
}

fn cbor_str(value: &Cbor, ctx: &str) -> Result<String, EncodingError> {
    match value {
        Cbor::Text(s) => Ok(s.clone()),
        _ => Err(malformed(&format!("{ctx} must be text"))),
    }
}

fn cbor_port(value: &Cbor) -> Result<u16, EncodingError> {
    let raw = cbor_u64(value, "port")?;
    u16::try_from(raw).map_err(|_| malformed("port out of range"))
}

fn decode_protocol(s: &str) -> Result<Protocol, EncodingError> {
    match s {
        "tcp" => Ok(Protocol::Tcp),
        "udp" => Ok(Protocol::Udp),
        other => Err(malformed(&format!("unknown protocol: {other}"))),
    }
}

fn malformed(msg: &str) -> EncodingError {
    EncodingError::Malformed(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::REPORT_VERSION;

    fn sample_report(custom: Option<BTreeMap<String, MetricValue>>) -> Report {
        let mut network_stats = BTreeMap::new();
        network_stats.insert(
            "eth0".to_string(),
            InterfaceCounters {
                bytes_in: 50,
                bytes_out: 20,
                packets_in: 5,
                packets_out: 2,
            },
        );

        Report {
            header: ReportHeader {
                report_id: 7,
                version: REPORT_VERSION.to_string(),
            },
            metrics: ReportMetrics {
                listening_ports: vec![ListeningPort {
                    protocol: Protocol::Tcp,
                    port: 22,
                    interface: "eth0".to_string(),
                }],
                established_connections: vec![ConnectionEntry {
                    local_addr: "192.168.1.2".to_string(),
                    local_port: 44312,
                    remote_addr: "203.0.113.9".to_string(),
                    remote_port: 443,
                    protocol: Protocol::Tcp,
                }],
                network_stats,
            },
            custom_metrics: custom,
        }
    }

    fn custom_map() -> BTreeMap<String, MetricValue> {
        let mut map = BTreeMap::new();
        map.insert("cpu_temp".to_string(), MetricValue::Integer(42));
        map
    }

    #[test]
    fn json_round_trip_long_mode() {
        let report = sample_report(Some(custom_map()));
        let text = to_json_string(&report, NamingMode::Long).unwrap();
        let decoded = from_json_str(&text, NamingMode::Long).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn json_round_trip_short_mode() {
        let report = sample_report(Some(custom_map()));
        let text = to_json_string(&report, NamingMode::Short).unwrap();
        let decoded = from_json_str(&text, NamingMode::Short).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn cbor_round_trip_both_modes() {
        let report = sample_report(Some(custom_map()));
        for mode in [NamingMode::Short, NamingMode::Long] {
            let bytes = to_cbor(&report, mode).unwrap();
            let decoded = from_cbor(&bytes, mode).unwrap();
            assert_eq!(decoded, report, "mode {mode}");
        }
    }

    #[test]
    fn naming_modes_yield_same_logical_report() {
        let report = sample_report(Some(custom_map()));
        let short = to_json_string(&report, NamingMode::Short).unwrap();
        let long = to_json_string(&report, NamingMode::Long).unwrap();
        assert_ne!(short, long);
        assert!(long.contains("bytes_in"));
        assert!(short.contains("\"bi\""));

        let from_short = from_json_str(&short, NamingMode::Short).unwrap();
        let from_long = from_json_str(&long, NamingMode::Long).unwrap();
        assert_eq!(from_short, from_long);
    }

    #[test]
    fn key_order_is_header_metrics_custom() {
        let report = sample_report(Some(custom_map()));
        let text = to_json_string(&report, NamingMode::Long).unwrap();
        let header_at = text.find("\"header\"").unwrap();
        let metrics_at = text.find("\"metrics\"").unwrap();
        let custom_at = text.find("\"custom_metrics\"").unwrap();
        assert!(header_at < metrics_at);
        assert!(metrics_at < custom_at);
    }

    #[test]
    fn encodings_are_deterministic() {
        let report = sample_report(Some(custom_map()));
        assert_eq!(
            to_json_string(&report, NamingMode::Short).unwrap(),
            to_json_string(&report, NamingMode::Short).unwrap()
        );
        assert_eq!(
            to_cbor(&report, NamingMode::Short).unwrap(),
            to_cbor(&report, NamingMode::Short).unwrap()
        );
    }

    #[test]
    fn disabled_custom_metrics_key_is_absent() {
        let report = sample_report(None);
        for mode in [NamingMode::Short, NamingMode::Long] {
            let text = to_json_string(&report, mode).unwrap();
            assert!(!text.contains(Field::CustomMetrics.wire(mode)));

            let bytes = to_cbor(&report, mode).unwrap();
            let decoded = from_cbor(&bytes, mode).unwrap();
            assert!(decoded.custom_metrics.is_none());
        }
    }

    #[test]
    fn enabled_custom_metrics_key_carries_value() {
        let report = sample_report(Some(custom_map()));
        let text = to_json_string(&report, NamingMode::Long).unwrap();
        assert!(text.contains("\"cpu_temp\":42"));

        let decoded = from_cbor(&to_cbor(&report, NamingMode::Short).unwrap(), NamingMode::Short).unwrap();
        assert_eq!(
            decoded.custom_metrics.unwrap()["cpu_temp"],
            MetricValue::Integer(42)
        );
    }

    #[test]
    fn non_finite_custom_metric_is_rejected_by_both_encodings() {
        let mut custom = BTreeMap::new();
        custom.insert("cpu_temp".to_string(), MetricValue::Float(f64::NAN));
        let report = sample_report(Some(custom));

        assert!(matches!(
            to_json_string(&report, NamingMode::Long),
            Err(EncodingError::NonFinite { .. })
        ));
        assert!(matches!(
            to_cbor(&report, NamingMode::Long),
            Err(EncodingError::NonFinite { .. })
        ));
    }

    #[test]
    fn float_and_text_custom_metrics_round_trip() {
        let mut custom = BTreeMap::new();
        custom.insert("cpu_percent".to_string(), MetricValue::Float(3.5));
        custom.insert("region".to_string(), MetricValue::Text("eu-west-1".to_string()));
        let report = sample_report(Some(custom));

        for mode in [NamingMode::Short, NamingMode::Long] {
            let decoded = from_json_str(&to_json_string(&report, mode).unwrap(), mode).unwrap();
            assert_eq!(decoded, report);
            let decoded = from_cbor(&to_cbor(&report, mode).unwrap(), mode).unwrap();
            assert_eq!(decoded, report);
        }
    }

    #[test]
    fn decoding_with_wrong_mode_fails() {
        let report = sample_report(None);
        let text = to_json_string(&report, NamingMode::Short).unwrap();
        assert!(from_json_str(&text, NamingMode::Long).is_err());

        let bytes = to_cbor(&report, NamingMode::Short).unwrap();
        assert!(matches!(
            from_cbor(&bytes, NamingMode::Long),
            Err(EncodingError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let text = r#"{"header":{"report_id":1,"version":"1.0"},"metrics":{"listening_ports":[],"established_connections":[],"network_stats":{}},"bogus":1}"#;
        assert!(matches!(
            from_json_str(text, NamingMode::Long),
            Err(EncodingError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_nested_json_key_is_rejected() {
        let text = r#"{"header":{"report_id":1,"version":"1.0","flavor":"x"},"metrics":{"listening_ports":[],"established_connections":[],"network_stats":{}}}"#;
        assert!(matches!(
            from_json_str(text, NamingMode::Long),
            Err(EncodingError::Malformed(_))
        ));

        let text = r#"{"header":{"report_id":1,"version":"1.0"},"metrics":{"listening_ports":[{"protocol":"tcp","port":22,"interface":"eth0","extra":1}],"established_connections":[],"network_stats":{}}}"#;
        assert!(matches!(
            from_json_str(text, NamingMode::Long),
            Err(EncodingError::Malformed(_))
        ));
    }

    #[test]
    fn tampered_cbor_keys_are_rejected() {
        let report = sample_report(None);
        let bytes = to_cbor(&report, NamingMode::Long).unwrap();
        let mut value: Cbor = ciborium::de::from_reader(bytes.as_slice()).unwrap();

        if let Cbor::Map(entries) = &mut value {
            entries.push((Cbor::Text("bogus".to_string()), Cbor::Integer(1.into())));
        } else {
            panic!("report must encode as a map");
        }

        let mut tampered = Vec::new();
        ciborium::ser::into_writer(&value, &mut tampered).unwrap();
        assert!(matches!(
            from_cbor(&tampered, NamingMode::Long),
            Err(EncodingError::Malformed(_))
        ));
    }
}
