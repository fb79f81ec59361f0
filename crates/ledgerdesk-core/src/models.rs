//! Shared data types for records, drafts and reference options.

use crate::schema::{Resource, ResourceSchema};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Value of a single field in a snapshot or draft.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Reference(ReferenceValue),
}

/// A reference to another record. The label is for display only; only the
/// identifier is ever submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue {
    pub id: Option<String>,
    pub label: String,
}

impl FieldValue {
    /// Whether the value counts as "not filled in".
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Number(_) | FieldValue::Date(_) => false,
            FieldValue::Reference(r) => r.id.is_none() && r.label.trim().is_empty(),
        }
    }

    /// Text shown in tables and form inputs.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format!("{n:.2}"),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::Reference(r) => r.label.clone(),
        }
    }

    /// Identifier held by a reference value.
    pub fn reference_id(&self) -> Option<&str> {
        match self {
            FieldValue::Reference(r) => r.id.as_deref(),
            _ => None,
        }
    }
}

/// One record that can be chosen for a reference field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceOption {
    pub id: String,
    pub label: String,
}

/// A record as fetched from the service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSnapshot {
    pub id: String,
    pub values: BTreeMap<String, FieldValue>,
}

static EMPTY: FieldValue = FieldValue::Empty;

impl RecordSnapshot {
    /// Value of a field, `Empty` when absent.
    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&EMPTY)
    }
}

/// Result of a list query: the records plus everything their reference
/// fields can point at.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListPage {
    pub records: Vec<RecordSnapshot>,
    pub options: BTreeMap<Resource, Vec<ReferenceOption>>,
}

/// The record being created or edited inside the dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    id: Option<String>,
    values: BTreeMap<String, FieldValue>,
}

impl Draft {
    /// Blank draft with every editable field empty.
    pub fn empty(schema: &ResourceSchema) -> Self {
        Self {
            id: None,
            values: schema
                .editable_fields()
                .map(|f| (f.name.to_string(), FieldValue::Empty))
                .collect(),
        }
    }

    /// Copy of an existing record.
    pub fn from_snapshot(snapshot: &RecordSnapshot) -> Self {
        Self {
            id: Some(snapshot.id.clone()),
            values: snapshot.values.clone(),
        }
    }

    /// Identifier of the record being edited; `None` for a new record.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get(&self, field: &str) -> &FieldValue {
        self.values.get(field).unwrap_or(&EMPTY)
    }

    pub(crate) fn set(&mut self, field: &str, value: FieldValue) {
        self.values.insert(field.to_string(), value);
    }
}
