use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use newsdesk_core::ProcessingMap;
use newsdesk_engine::{AtomicFileWriter, RegistryStore, StoreError};
use newsdesk_logging::desk_debug;

pub(crate) const REGISTRY_FILENAME: &str = ".newsdesk_processing.ron";

/// Processing registry kept as RON next to the other state files.
pub(crate) struct RonFileStore {
    writer: AtomicFileWriter,
}

impl RonFileStore {
    pub(crate) fn new(state_dir: &Path) -> Self {
        Self {
            writer: AtomicFileWriter::new(PathBuf::from(state_dir)),
        }
    }

    fn path(&self) -> PathBuf {
        self.writer.path_of(REGISTRY_FILENAME)
    }
}

impl RegistryStore for RonFileStore {
    fn load(&self) -> Result<ProcessingMap, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                desk_debug!("No processing registry at {:?}", path);
                return Ok(ProcessingMap::default());
            }
            Err(err) => return Err(err.into()),
        };
        ron::from_str(&content).map_err(|err| StoreError::Decode(err.to_string()))
    }

    fn save(&self, map: &ProcessingMap) -> Result<(), StoreError> {
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(map, pretty)
            .map_err(|err| StoreError::Encode(err.to_string()))?;
        self.writer.write(REGISTRY_FILENAME, &content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_core::{PipelineStep, ProcessingStatus, ProcessingUpdate};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_empty_registry() {
        let temp = TempDir::new().unwrap();
        let store = RonFileStore::new(temp.path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn registry_round_trips_through_ron() {
        let temp = TempDir::new().unwrap();
        let store = RonFileStore::new(temp.path());

        let mut map = ProcessingMap::default();
        map.start(42, 1_700_000_000_000, 3);
        map.update(42, ProcessingUpdate::step(PipelineStep::ArticleText));
        map.start(7, 1_700_000_000_500, 4);
        map.update(7, ProcessingUpdate::failed("No article payload was received"));
        store.save(&map).unwrap();

        assert!(temp.path().join(REGISTRY_FILENAME).is_file());
        let loaded = RonFileStore::new(temp.path()).load().unwrap();
        assert_eq!(loaded, map);
        assert_eq!(loaded.get(7).map(|e| e.status), Some(ProcessingStatus::Error));
    }

    #[test]
    fn corrupt_file_is_a_decode_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(REGISTRY_FILENAME), "not ron {").unwrap();
        let err = RonFileStore::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }
}
