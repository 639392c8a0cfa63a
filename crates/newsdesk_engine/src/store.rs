use std::sync::{Arc, Mutex};

use newsdesk_core::ProcessingMap;
use thiserror::Error;

use crate::persist::PersistError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode registry: {0}")]
    Encode(String),
    #[error("could not decode registry: {0}")]
    Decode(String),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Durable home of the processing registry.
pub trait RegistryStore: Send + Sync {
    /// An absent store reads as an empty map.
    fn load(&self) -> Result<ProcessingMap, StoreError>;
    fn save(&self, map: &ProcessingMap) -> Result<(), StoreError>;
}

/// Keeps the serialized registry in memory. Clones share the same slot, so a
/// clone handed to a fresh registry behaves like storage surviving a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved text, if any.
    pub fn contents(&self) -> Option<String> {
        self.saved.lock().ok().and_then(|saved| saved.clone())
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<ProcessingMap, StoreError> {
        let saved = self.saved.lock().map_err(|_| StoreError::Poisoned)?;
        match saved.as_deref() {
            None => Ok(ProcessingMap::default()),
            Some(text) => {
                serde_json::from_str(text).map_err(|err| StoreError::Decode(err.to_string()))
            }
        }
    }

    fn save(&self, map: &ProcessingMap) -> Result<(), StoreError> {
        let text =
            serde_json::to_string(map).map_err(|err| StoreError::Encode(err.to_string()))?;
        let mut saved = self.saved.lock().map_err(|_| StoreError::Poisoned)?;
        *saved = Some(text);
        Ok(())
    }
}
