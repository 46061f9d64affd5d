//! Storage-specific error type wrapping IO and TOML errors.

use std::path::PathBuf;

use propbus_domain::error::PropBusError;

/// Errors originating from the filesystem config store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Reading, writing or renaming a file failed.
    #[error("io error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored document is not valid TOML or has the wrong shape.
    #[error("malformed configuration in {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A document could not be rendered as TOML.
    #[error("failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// No home directory to derive the default location from.
    #[error("cannot locate the home directory")]
    NoHomeDirectory,
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap as a read failure.
    #[must_use]
    pub fn into_read(self) -> PropBusError {
        PropBusError::ConfigRead(Box::new(self))
    }

    /// Wrap as a write failure.
    #[must_use]
    pub fn into_write(self) -> PropBusError {
        PropBusError::ConfigWrite(Box::new(self))
    }
}
