//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the driver core and the outside world.
//! They live here (in `app`) so that both the core and the adapter crates can
//! depend on them without creating circular dependencies.

pub mod config_store;
pub mod transport;

pub use config_store::{ConfigSlot, ConfigStore};
pub use transport::Transport;
