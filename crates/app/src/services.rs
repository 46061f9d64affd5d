//! Application services.
//!
//! Each service accepts port implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from adapters.

pub mod config_service;
pub mod driver;
