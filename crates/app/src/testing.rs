//! Test doubles shared by the unit tests of this crate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use propbus_domain::config::ConfigDocument;
use propbus_domain::error::PropBusError;

use crate::ports::{ConfigSlot, ConfigStore};

#[derive(Debug, thiserror::Error)]
#[error("store is read-only")]
struct ReadOnlyStore;

#[derive(Default)]
pub(crate) struct MemoryConfigStore {
    documents: Mutex<HashMap<(String, bool), ConfigDocument>>,
    fail_writes: AtomicBool,
}

fn key(device: &str, slot: ConfigSlot) -> (String, bool) {
    (device.to_string(), slot == ConfigSlot::Default)
}

impl MemoryConfigStore {
    pub(crate) fn get(&self, device: &str, slot: ConfigSlot) -> Option<ConfigDocument> {
        self.documents
            .lock()
            .unwrap()
            .get(&key(device, slot))
            .cloned()
    }

    pub(crate) fn put(&self, slot: ConfigSlot, document: ConfigDocument) {
        self.documents
            .lock()
            .unwrap()
            .insert(key(&document.device, slot), document);
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read(
        &self,
        device: &str,
        slot: ConfigSlot,
    ) -> impl Future<Output = Result<Option<ConfigDocument>, PropBusError>> + Send {
        let document = self.get(device, slot);
        async { Ok(document) }
    }

    fn write(
        &self,
        slot: ConfigSlot,
        document: &ConfigDocument,
    ) -> impl Future<Output = Result<(), PropBusError>> + Send {
        let result = if self.fail_writes.load(Ordering::SeqCst) {
            Err(PropBusError::ConfigWrite(Box::new(ReadOnlyStore)))
        } else {
            self.put(slot, document.clone());
            Ok(())
        };
        async { result }
    }
}
