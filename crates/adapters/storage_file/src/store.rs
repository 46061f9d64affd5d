//! [`ConfigStore`] backed by TOML files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use propbus_app::ports::{ConfigSlot, ConfigStore};
use propbus_domain::config::ConfigDocument;
use propbus_domain::error::PropBusError;

use crate::error::StorageError;

const DEFAULT_DIRECTORY: &str = ".propbus";
const DEFAULT_SUFFIX: &str = ".default";
const TMP_SUFFIX: &str = ".tmp";

/// Where primary documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// One fixed file, whatever the device.
    File(PathBuf),
    /// `<dir>/<device>_config.toml`.
    Directory(PathBuf),
}

/// Stores one TOML document per device and slot.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    location: ConfigLocation,
}

impl FileConfigStore {
    #[must_use]
    pub fn new(location: ConfigLocation) -> Self {
        Self { location }
    }

    /// Store documents in `~/.propbus`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoHomeDirectory`] when the home directory
    /// cannot be determined.
    pub fn in_home() -> Result<Self, StorageError> {
        let home = dirs::home_dir().ok_or(StorageError::NoHomeDirectory)?;
        Ok(Self::new(ConfigLocation::Directory(
            home.join(DEFAULT_DIRECTORY),
        )))
    }

    #[must_use]
    pub fn location(&self) -> &ConfigLocation {
        &self.location
    }

    /// Path of the document for `device` in `slot`.
    #[must_use]
    pub fn path(&self, device: &str, slot: ConfigSlot) -> PathBuf {
        let primary = match &self.location {
            ConfigLocation::File(path) => path.clone(),
            ConfigLocation::Directory(dir) => dir.join(format!("{device}_config.toml")),
        };
        match slot {
            ConfigSlot::Primary => primary,
            ConfigSlot::Default => with_suffix(&primary, DEFAULT_SUFFIX),
        }
    }

    async fn read_document(
        &self,
        device: &str,
        slot: ConfigSlot,
    ) -> Result<Option<ConfigDocument>, StorageError> {
        let path = self.path(device, slot);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(path, err)),
        };
        let document: ConfigDocument =
            toml::from_str(&text).map_err(|source| StorageError::Parse {
                path: path.clone(),
                source,
            })?;
        if document.device != device {
            tracing::debug!(path = %path.display(), stored = %document.device, device, "document belongs to another device");
            return Ok(None);
        }
        Ok(Some(document))
    }

    async fn write_document(
        &self,
        slot: ConfigSlot,
        document: &ConfigDocument,
    ) -> Result<(), StorageError> {
        let path = self.path(&document.device, slot);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| StorageError::io(parent, err))?;
        }
        let text = toml::to_string_pretty(document)?;
        let tmp = with_suffix(&path, TMP_SUFFIX);
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|err| StorageError::io(&tmp, err))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| StorageError::io(&path, err))?;
        tracing::debug!(path = %path.display(), %slot, "configuration written");
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl ConfigStore for FileConfigStore {
    async fn read(
        &self,
        device: &str,
        slot: ConfigSlot,
    ) -> Result<Option<ConfigDocument>, PropBusError> {
        self.read_document(device, slot)
            .await
            .map_err(StorageError::into_read)
    }

    async fn write(&self, slot: ConfigSlot, document: &ConfigDocument) -> Result<(), PropBusError> {
        self.write_document(slot, document)
            .await
            .map_err(StorageError::into_write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propbus_domain::config::{StoredNumber, StoredSwitch, StoredVector};
    use propbus_domain::property::SwitchState;

    fn document(device: &str, seeing: f64) -> ConfigDocument {
        let mut document = ConfigDocument::new(device);
        document.upsert(StoredVector::Switch {
            name: "Mode".to_string(),
            members: vec![
                StoredSwitch {
                    name: "All".to_string(),
                    state: SwitchState::Off,
                },
                StoredSwitch {
                    name: "Timer".to_string(),
                    state: SwitchState::On,
                },
            ],
        });
        document.upsert(StoredVector::Number {
            name: "SEEING_SETTINGS".to_string(),
            members: vec![StoredNumber {
                name: "SIM_SEEING".to_string(),
                value: seeing,
            }],
        });
        document
    }

    #[test]
    fn should_name_document_after_device() {
        let store = FileConfigStore::new(ConfigLocation::Directory(PathBuf::from("/cfg")));
        assert_eq!(
            store.path("Focuser Simulator", ConfigSlot::Primary),
            PathBuf::from("/cfg/Focuser Simulator_config.toml")
        );
        assert_eq!(
            store.path("Focuser Simulator", ConfigSlot::Default),
            PathBuf::from("/cfg/Focuser Simulator_config.toml.default")
        );
    }

    #[test]
    fn should_use_fixed_file_when_configured() {
        let store = FileConfigStore::new(ConfigLocation::File(PathBuf::from("/tmp/focuser.toml")));
        assert_eq!(
            store.path("anything", ConfigSlot::Default),
            PathBuf::from("/tmp/focuser.toml.default")
        );
    }

    #[tokio::test]
    async fn should_roundtrip_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(ConfigLocation::Directory(dir.path().to_path_buf()));
        let doc = document("Focuser", 0.1 + 0.2);

        store.write(ConfigSlot::Primary, &doc).await.unwrap();
        let read = store.read("Focuser", ConfigSlot::Primary).await.unwrap();

        assert_eq!(read, Some(doc));
    }

    #[tokio::test]
    async fn should_return_none_when_nothing_stored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(ConfigLocation::Directory(dir.path().to_path_buf()));
        let read = store.read("Focuser", ConfigSlot::Primary).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn should_fail_to_read_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(ConfigLocation::Directory(dir.path().to_path_buf()));
        std::fs::write(store.path("Focuser", ConfigSlot::Primary), "device = [").unwrap();

        let result = store.read("Focuser", ConfigSlot::Primary).await;

        assert!(matches!(result, Err(PropBusError::ConfigRead(_))));
    }

    #[tokio::test]
    async fn should_keep_slots_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(ConfigLocation::Directory(dir.path().to_path_buf()));
        store
            .write(ConfigSlot::Default, &document("Focuser", 3.5))
            .await
            .unwrap();
        store
            .write(ConfigSlot::Primary, &document("Focuser", 4.0))
            .await
            .unwrap();

        let default = store.read("Focuser", ConfigSlot::Default).await.unwrap();
        assert_eq!(default, Some(document("Focuser", 3.5)));
    }

    #[tokio::test]
    async fn should_create_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = FileConfigStore::new(ConfigLocation::Directory(nested.clone()));

        store
            .write(ConfigSlot::Primary, &document("Focuser", 3.5))
            .await
            .unwrap();

        assert!(nested.join("Focuser_config.toml").exists());
        assert!(!nested.join("Focuser_config.toml.tmp").exists());
    }

    #[tokio::test]
    async fn should_ignore_document_of_another_device() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("shared.toml");
        let store = FileConfigStore::new(ConfigLocation::File(file));
        store
            .write(ConfigSlot::Primary, &document("Mount", 3.5))
            .await
            .unwrap();

        let read = store.read("Focuser", ConfigSlot::Primary).await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn should_store_human_readable_toml() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileConfigStore::new(ConfigLocation::Directory(dir.path().to_path_buf()));
        store
            .write(ConfigSlot::Primary, &document("Focuser", 3.5))
            .await
            .unwrap();

        let text = std::fs::read_to_string(store.path("Focuser", ConfigSlot::Primary)).unwrap();
        assert!(text.contains("device = \"Focuser\""));
        assert!(text.contains("SIM_SEEING"));
    }
}
