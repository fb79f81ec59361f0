//! Turning service JSON into snapshots.

use crate::error::RemoteError;
use crate::models::{FieldValue, ListPage, RecordSnapshot, ReferenceOption, ReferenceValue};
use crate::schema::{FieldDef, FieldKind, ResourceSchema, ScalarType};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decode the `data` object of a list query.
pub fn decode_list_page(schema: &ResourceSchema, data: &Value) -> Result<ListPage, RemoteError> {
    let rows = data
        .get(schema.list_query)
        .and_then(Value::as_array)
        .ok_or_else(|| RemoteError::Decode(format!("response is missing {}", schema.list_query)))?;

    let records = rows
        .iter()
        .map(|row| decode_record(schema, row))
        .collect::<Result<Vec<_>, _>>()?;

    let mut options = BTreeMap::new();
    for target in schema.referenced_resources() {
        let target_schema = target.schema();
        let entries = match data.get(target_schema.list_query).and_then(Value::as_array) {
            Some(entries) => entries.iter().filter_map(|e| decode_option(target_schema, e)).collect(),
            None => {
                tracing::warn!(
                    "{} response has no {}, reference choices will be empty",
                    schema.list_query,
                    target_schema.list_query
                );
                Vec::new()
            }
        };
        options.insert(target, entries);
    }

    Ok(ListPage { records, options })
}

/// Decode one record object.
pub fn decode_record(schema: &ResourceSchema, value: &Value) -> Result<RecordSnapshot, RemoteError> {
    let object = value
        .as_object()
        .ok_or_else(|| RemoteError::Decode(format!("{} record is not an object", schema.label)))?;

    let id = object.get("id").map(id_string).unwrap_or_default();
    let values = schema
        .fields
        .iter()
        .map(|field| {
            let raw = object.get(field.name).unwrap_or(&Value::Null);
            (field.name.to_string(), decode_field(field, raw))
        })
        .collect();

    Ok(RecordSnapshot { id, values })
}

fn decode_option(schema: &ResourceSchema, value: &Value) -> Option<ReferenceOption> {
    let id = value.get("id").map(id_string).filter(|id| !id.is_empty())?;
    let label = value
        .get(schema.label_field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(ReferenceOption { id, label })
}

fn decode_field(field: &FieldDef, raw: &Value) -> FieldValue {
    if raw.is_null() {
        return FieldValue::Empty;
    }

    match field.kind {
        FieldKind::Scalar(ScalarType::Float) => {
            match raw.as_f64().or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok())) {
                Some(n) => FieldValue::Number(n),
                None => {
                    tracing::warn!("{}: expected a number, got {}", field.name, raw);
                    FieldValue::Empty
                }
            }
        }
        FieldKind::Scalar(ScalarType::String) => match raw {
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        },
        FieldKind::Scalar(ScalarType::DateTime) => match parse_date(raw) {
            Some(date) => FieldValue::Date(date),
            None => {
                tracing::warn!("{}: unrecognised date {}", field.name, raw);
                FieldValue::Text(raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string()))
            }
        },
        FieldKind::Reference(target) => match raw {
            Value::Object(object) => FieldValue::Reference(ReferenceValue {
                id: object.get("id").map(id_string).filter(|id| !id.is_empty()),
                label: object
                    .get(target.schema().label_field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            Value::String(id) => FieldValue::Reference(ReferenceValue {
                id: Some(id.clone()),
                label: id.clone(),
            }),
            _ => FieldValue::Empty,
        },
    }
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Parse a date the service sent: RFC 3339, a bare `YYYY-MM-DD`, or epoch
/// milliseconds (as a number or a numeric string).
pub fn parse_date(raw: &Value) -> Option<NaiveDate> {
    match raw {
        Value::String(s) => parse_date_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    s.parse::<i64>()
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive())
}
