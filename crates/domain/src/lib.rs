//! # propbus-domain
//!
//! Pure property model for device drivers.
//!
//! ## Responsibilities
//! - Typed members (number, switch, text, light, blob) grouped into
//!   [`PropertyVector`](property::PropertyVector)s with shared metadata
//! - Per-kind merge rules, including switch rule enforcement
//! - Inbound [`UpdateRequest`](update::UpdateRequest)s and outbound
//!   [`DriverEvent`](event::DriverEvent)s
//! - The persisted [`ConfigDocument`](config::ConfigDocument) shape
//! - The error taxonomy shared by every layer
//!
//! ## Dependency rule
//! This crate has **no internal dependencies** and performs no IO.
//! IO boundaries are traits in `propbus-app` (ports).

mod encoding;

pub mod config;
pub mod error;
pub mod event;
pub mod id;
pub mod property;
pub mod time;
pub mod update;
