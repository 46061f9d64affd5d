//! Config service: the persistence engine.
//!
//! Saves and loads property values through a [`ConfigStore`]. Full saves
//! write a fresh document in registration order; single-vector saves merge
//! into the stored document so unrelated vectors survive.

use propbus_domain::config::{ConfigDocument, StoredVector};
use propbus_domain::error::{PropBusError, ValidationError};
use propbus_domain::property::PropertyVector;
use serde::Deserialize;

use crate::ports::{ConfigSlot, ConfigStore};
use crate::registry::PropertyRegistry;

/// When the "last known good" copy is rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotPolicy {
    /// After every successful save and load.
    #[default]
    Refresh,
    /// Only when no copy exists yet.
    SeedOnce,
}

/// Nothing is stored for the requested device and slot.
#[derive(Debug, thiserror::Error)]
#[error("no {slot} configuration stored for device {device:?}")]
pub struct MissingConfigError {
    pub device: String,
    pub slot: ConfigSlot,
}

/// Application service persisting property values.
pub struct ConfigService<S> {
    store: S,
    policy: SnapshotPolicy,
}

impl<S: ConfigStore> ConfigService<S> {
    /// Create a service backed by the given store, refreshing the fallback
    /// copy on every save.
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: SnapshotPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SnapshotPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write every persistable vector of `registry` as a fresh document.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::ConfigWrite`] when the store refuses the
    /// primary document. Failing to refresh the fallback copy is only logged.
    #[tracing::instrument(skip(self, registry), fields(device = registry.device()))]
    pub async fn save_all(&self, registry: &PropertyRegistry) -> Result<ConfigDocument, PropBusError> {
        let document = ConfigDocument::capture(registry.device(), registry.enumerate());
        self.store.write(ConfigSlot::Primary, &document).await?;
        tracing::debug!(vectors = document.vectors.len(), "configuration saved");
        self.snapshot(&document).await;
        Ok(document)
    }

    /// Merge one vector into the stored document.
    ///
    /// # Errors
    ///
    /// - [`PropBusError::Validation`] when the vector is never persisted
    ///   (`CONNECTION`, lights, one-of-many switches with nothing selected)
    /// - [`PropBusError::ConfigRead`] when the stored document is unreadable;
    ///   it is left untouched
    /// - [`PropBusError::ConfigWrite`] when the store refuses the document
    #[tracing::instrument(skip(self, vector), fields(vector = vector.name()))]
    pub async fn save_one(&self, device: &str, vector: &PropertyVector) -> Result<(), PropBusError> {
        let stored = StoredVector::capture(vector)
            .ok_or_else(|| ValidationError::NotPersistable(vector.name().to_string()))?;
        let mut document = self
            .store
            .read(device, ConfigSlot::Primary)
            .await?
            .unwrap_or_else(|| ConfigDocument::new(device));
        document.upsert(stored);
        self.store.write(ConfigSlot::Primary, &document).await?;
        tracing::debug!("vector saved");
        self.snapshot(&document).await;
        Ok(())
    }

    /// Read the document stored for `device` in `slot`.
    ///
    /// Loading the primary document also maintains the fallback copy.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::ConfigRead`] when nothing is stored or the
    /// document is malformed.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, device: &str, slot: ConfigSlot) -> Result<ConfigDocument, PropBusError> {
        let document = self.store.read(device, slot).await?.ok_or_else(|| {
            PropBusError::ConfigRead(Box::new(MissingConfigError {
                device: device.to_string(),
                slot,
            }))
        })?;
        if slot == ConfigSlot::Primary {
            self.snapshot(&document).await;
        }
        Ok(document)
    }

    async fn snapshot(&self, document: &ConfigDocument) {
        if self.policy == SnapshotPolicy::SeedOnce
            && matches!(
                self.store.read(&document.device, ConfigSlot::Default).await,
                Ok(Some(_))
            )
        {
            return;
        }
        if let Err(err) = self.store.write(ConfigSlot::Default, document).await {
            tracing::warn!(%err, device = %document.device, "failed to refresh default configuration");
        }
    }
}
