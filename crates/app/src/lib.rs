//! # propbus-app
//!
//! Application layer: the device driver core and **port definitions**.
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `Transport`: deliver driver events to clients
//!   - `ConfigStore`: read and write per-device config documents
//! - Own the **property registry** of a device
//! - Dispatch client updates (`DeviceDriver::apply_update`), enforce
//!   permissions and switch rules, broadcast results
//! - Persist and restore values (`ConfigService`)
//! - Provide the standard auxiliary and connection controls
//! - Provide an **in-process event bus** that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `propbus-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controls;
pub mod event_bus;
pub mod ports;
pub mod registry;
pub mod services;

#[cfg(test)]
mod testing;
