//! Line Protocol Encoding
//!
//! Renders points in the InfluxDB line protocol:
//! `measurement[,tag=value...] field=value[,field=value...] timestamp`

use super::{BatchPoints, FieldValue, Point, Precision};
use std::fmt::Write;

/// Encode a whole batch, one line per point.
///
/// Points that end up without any encodable field are left out.
pub fn encode_batch(batch: &BatchPoints) -> String {
    let mut body = String::new();
    for point in &batch.points {
        if let Some(line) = encode_point(point, batch.precision) {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&line);
        }
    }
    body
}

/// Encode a single point.
///
/// Returns `None` when no field survives encoding. Non-finite floats are
/// not representable in the protocol and are dropped, tags with an empty
/// value are skipped.
pub fn encode_point(point: &Point, precision: Precision) -> Option<String> {
    let mut fields = String::new();
    for (key, value) in &point.fields {
        let Some(value) = encode_field_value(value) else {
            continue;
        };
        if !fields.is_empty() {
            fields.push(',');
        }
        escape_into(&mut fields, key, &[',', '=', ' ']);
        fields.push('=');
        fields.push_str(&value);
    }

    if fields.is_empty() {
        return None;
    }

    let mut line = String::with_capacity(point.measurement.len() + fields.len() + 32);
    escape_into(&mut line, &point.measurement, &[',', ' ']);
    for (key, value) in &point.tags {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        line.push(',');
        escape_into(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        escape_into(&mut line, value, &[',', '=', ' ']);
    }
    line.push(' ');
    line.push_str(&fields);
    let _ = write!(line, " {}", precision.timestamp(&point.time));

    Some(line)
}

/// Whether `point` has at least one field that survives encoding.
pub fn is_encodable(point: &Point) -> bool {
    point
        .fields
        .iter()
        .any(|(_, value)| !matches!(value, FieldValue::Float(v) if !v.is_finite()))
}

fn encode_field_value(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Integer(v) => Some(format!("{}i", v)),
        FieldValue::Float(v) if v.is_finite() => Some(format!("{}", v)),
        FieldValue::Float(_) => None,
        FieldValue::Boolean(v) => Some(v.to_string()),
        FieldValue::String(v) => {
            let mut quoted = String::with_capacity(v.len() + 2);
            quoted.push('"');
            escape_into(&mut quoted, v, &['"', '\\']);
            quoted.push('"');
            Some(quoted)
        }
    }
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        match c {
            // Line breaks end the line and have no escape outside string
            // fields, so names and tags carry them as an escaped space.
            '\n' | '\r' if special.contains(&' ') => out.push_str("\\ "),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}
