//! # propbus-adapter-storage-file
//!
//! Filesystem persistence for device configuration.
//!
//! ## Responsibilities
//! - Implement the [`ConfigStore`](propbus_app::ports::ConfigStore) port
//! - Locate per-device documents: an explicit file, or
//!   `<dir>/<device>_config.toml` with `~/.propbus` as the default directory
//! - Keep the fallback copy next to the primary one, with a `.default` suffix
//! - Replace documents atomically (write a temporary file, then rename)
//!
//! ## Dependency rule
//! Depends on `propbus-app` (for port traits) and `propbus-domain` (for the
//! document type). The `app` and `domain` crates must never reference this
//! adapter.

mod error;
mod store;

pub use error::StorageError;
pub use store::{ConfigLocation, FileConfigStore};
