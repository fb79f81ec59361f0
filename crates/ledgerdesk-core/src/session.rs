//! Durable session token storage.
//!
//! The session is the only state shared between controllers, the request
//! interceptor and the route guard. It is passed around explicitly as an
//! `Arc<dyn SessionStore>`.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key under which the token is persisted.
pub const SESSION_KEY: &str = "access_token";

/// Holds the current session token.
pub trait SessionStore: Send + Sync {
    /// The active token, if any.
    fn get(&self) -> Option<String>;

    /// Persist `token` and make it the active session.
    fn set(&self, token: &str) -> Result<(), SessionError>;

    /// Remove the active session.
    fn clear(&self) -> Result<(), SessionError>;

    /// Whether a session exists. Says nothing about whether the service
    /// still accepts it.
    fn is_active(&self) -> bool {
        self.get().is_some()
    }
}

/// On-disk layout of the session file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Session persisted to a TOML file. A missing file means logged out.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    token: RwLock<Option<String>>,
}

impl FileSessionStore {
    /// Open the store at `path`, loading any token already saved there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let token = Self::load(&path)?;
        tracing::info!(
            "Opened session store at {} ({})",
            path.display(),
            if token.is_some() { "signed in" } else { "signed out" }
        );
        Ok(Self {
            path,
            token: RwLock::new(token),
        })
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<Option<String>, SessionError> {
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(path).map_err(|source| SessionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: SessionFile = toml::from_str(&contents).map_err(|source| SessionError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(file.access_token.filter(|t| !t.trim().is_empty()))
    }

    fn persist(&self, token: &str) -> Result<(), SessionError> {
        let write_err = |source| SessionError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let contents = toml::to_string_pretty(&SessionFile {
            access_token: Some(token.to_string()),
        })?;

        // Write to a sibling temp file and rename so a crash never leaves a
        // half-written token behind.
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
        tmp.write_all(contents.as_bytes()).map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        self.persist(token)?;
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        tracing::info!("Session stored");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SessionError::Write {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        tracing::info!("Session cleared");
        Ok(())
    }
}

/// Session kept in memory only.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that starts out signed in with `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.token.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.toml");

        let store = FileSessionStore::open(&path).unwrap();
        assert_eq!(store.get(), None);
        assert!(!store.is_active());

        store.set("tok-123").unwrap();
        assert_eq!(store.get().as_deref(), Some("tok-123"));

        let reopened = FileSessionStore::open(&path).unwrap();
        assert_eq!(reopened.get().as_deref(), Some("tok-123"));

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains(SESSION_KEY));
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");

        let store = FileSessionStore::open(&path).unwrap();
        store.set("tok").unwrap();
        store.clear().unwrap();

        assert_eq!(store.get(), None);
        assert!(!path.exists());
        // Clearing twice is fine.
        store.clear().unwrap();
        assert_eq!(FileSessionStore::open(&path).unwrap().get(), None);
    }

    #[test]
    fn blank_token_on_disk_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "access_token = \"  \"\n").unwrap();

        assert_eq!(FileSessionStore::open(&path).unwrap().get(), None);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "access_token = [").unwrap();

        assert!(matches!(
            FileSessionStore::open(&path),
            Err(SessionError::Parse { .. })
        ));
    }

    #[test]
    fn memory_store_set_and_clear() {
        let store = MemorySessionStore::new();
        store.set("abc").unwrap();
        assert!(store.is_active());
        store.clear().unwrap();
        assert!(!store.is_active());
        assert_eq!(MemorySessionStore::with_token("t").get().as_deref(), Some("t"));
    }
}
