use model::Cursor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("failed to read cursor state at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cursor state at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode cursor state at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedCursor {
    cursor: Cursor,
}

/// The minimal on-disk high-water mark: one small JSON sidecar per
/// pipeline name, written after the pipeline drains. A run with no
/// sidecar present starts from [`Cursor::epoch`] — persisting a cursor
/// remains additive rather than required.
pub struct CursorStore {
    dir: PathBuf,
}

impl CursorStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, pipeline_name: &str) -> PathBuf {
        self.dir.join(format!("{pipeline_name}.cursor.json"))
    }

    /// Loads the last persisted cursor for `pipeline_name`, or
    /// [`Cursor::epoch`] if none was ever written.
    pub fn load(&self, pipeline_name: &str) -> Result<Cursor, StateStoreError> {
        let path = self.path_for(pipeline_name);
        match std::fs::read(&path) {
            Ok(bytes) => {
                let persisted: PersistedCursor = serde_json::from_slice(&bytes)
                    .map_err(|source| StateStoreError::Decode { path, source })?;
                debug!(pipeline = pipeline_name, cursor = ?persisted.cursor, "resumed from persisted cursor");
                Ok(persisted.cursor)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(pipeline = pipeline_name, "no persisted cursor, starting from epoch");
                Ok(Cursor::epoch())
            }
            Err(source) => Err(StateStoreError::Read { path, source }),
        }
    }

    /// Persists the high-water cursor reached by `pipeline_name`.
    pub fn save(&self, pipeline_name: &str, cursor: Cursor) -> Result<(), StateStoreError> {
        if let Err(source) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), %source, "could not create cursor state directory");
            return Err(StateStoreError::Write {
                path: self.dir.clone(),
                source,
            });
        }
        let path = self.path_for(pipeline_name);
        let bytes = serde_json::to_vec_pretty(&PersistedCursor { cursor })
            .expect("Cursor serialization is infallible");
        std::fs::write(&path, bytes).map_err(|source| StateStoreError::Write { path, source })
    }
}

pub fn default_state_dir() -> PathBuf {
    Path::new(".pg2es").to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sidecar_starts_from_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path());
        assert_eq!(store.load("direct").unwrap(), Cursor::epoch());
    }

    #[test]
    fn round_trips_a_persisted_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let store = CursorStore::new(dir.path());
        let id = uuid::Uuid::new_v4();
        let cursor = Cursor::new(chrono::Utc::now(), id);

        store.save("direct", cursor).unwrap();
        assert_eq!(store.load("direct").unwrap(), cursor);
    }
}
