//! Error types shared across the core crate.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by the remote service or the transport in front of it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service refused the session credential.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),
    /// The service understood the request and rejected it. The message is
    /// the service's own wording.
    #[error("{0}")]
    Rejected(String),
    /// The service could not be reached, or the request timed out.
    #[error("could not reach the service: {0}")]
    Transport(String),
    /// The service answered with something that is not a usable response.
    #[error("unexpected response from the service: {0}")]
    Decode(String),
}

impl RemoteError {
    /// True for failures the operator can only fix by logging in again.
    pub fn is_authentication(&self) -> bool {
        matches!(self, RemoteError::Unauthenticated(_))
    }
}

/// Failure reading or writing the durable session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse session file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to write session file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize session: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A draft that cannot be submitted. Carries the labels of every failing
/// field so the operator gets one aggregated warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", summary(.fields, .unresolved))]
pub struct ValidationError {
    /// Fields that are missing or hold an unusable value.
    pub fields: Vec<&'static str>,
    /// Reference fields holding text that matches no option.
    pub unresolved: Vec<&'static str>,
}

fn summary(fields: &[&'static str], unresolved: &[&'static str]) -> String {
    let mut parts = Vec::new();
    if !fields.is_empty() {
        parts.push(format!("{} {} required.", join_labels(fields), verb(fields)));
    }
    if !unresolved.is_empty() {
        parts.push(format!("{} must be chosen from the list.", join_labels(unresolved)));
    }
    if parts.is_empty() {
        return "The form is incomplete.".to_string();
    }
    parts.join(" ")
}

fn join_labels(labels: &[&'static str]) -> String {
    match labels {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {last}", init.join(", ")),
    }
}

fn verb(labels: &[&'static str]) -> &'static str {
    if labels.len() == 1 {
        "is"
    } else {
        "are"
    }
}

/// Rejected edit to the draft held by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("no dialog is open")]
    NoDialog,
    #[error("a request is still in flight")]
    Busy,
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("{0} cannot be edited")]
    ReadOnly(&'static str),
    #[error("{field}: {input:?} is not a valid {expected}")]
    Parse {
        field: &'static str,
        input: String,
        expected: &'static str,
    },
    #[error("{0} is not a reference field")]
    NotAReference(&'static str),
    #[error("{field}: no option with id {id}")]
    UnknownOption { field: &'static str, id: String },
}
