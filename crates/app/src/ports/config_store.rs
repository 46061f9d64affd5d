//! Config store port: per-device persisted property values.

use std::future::Future;

use propbus_domain::config::ConfigDocument;
use propbus_domain::error::PropBusError;

/// Which copy of a device configuration to access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSlot {
    /// The working configuration.
    Primary,
    /// The "last known good" fallback used for factory resets.
    Default,
}

impl std::fmt::Display for ConfigSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Default => f.write_str("default"),
        }
    }
}

/// Reads and writes [`ConfigDocument`]s keyed by device name.
pub trait ConfigStore {
    /// Read a stored document.
    ///
    /// Returns `Ok(None)` when nothing is stored for `device` in `slot`, and
    /// [`PropBusError::ConfigRead`] when the document exists but cannot be
    /// read or parsed.
    fn read(
        &self,
        device: &str,
        slot: ConfigSlot,
    ) -> impl Future<Output = Result<Option<ConfigDocument>, PropBusError>> + Send;

    /// Replace the document stored for `document.device` in `slot`.
    fn write(
        &self,
        slot: ConfigSlot,
        document: &ConfigDocument,
    ) -> impl Future<Output = Result<(), PropBusError>> + Send;
}

impl<T: ConfigStore + Send + Sync> ConfigStore for std::sync::Arc<T> {
    fn read(
        &self,
        device: &str,
        slot: ConfigSlot,
    ) -> impl Future<Output = Result<Option<ConfigDocument>, PropBusError>> + Send {
        (**self).read(device, slot)
    }

    fn write(
        &self,
        slot: ConfigSlot,
        document: &ConfigDocument,
    ) -> impl Future<Output = Result<(), PropBusError>> + Send {
        (**self).write(slot, document)
    }
}
