//! Standard vectors every device can carry.
//!
//! - [`aux`]: `DEBUG`, `SIMULATION` and `CONFIG_PROCESS`
//! - [`connection`]: the reserved `CONNECTION` vector and its status

pub mod aux;
pub mod connection;
