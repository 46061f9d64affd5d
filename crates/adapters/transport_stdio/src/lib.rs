//! # propbus-adapter-transport-stdio
//!
//! Line-delimited JSON transport between a driver and its client.
//!
//! ## Responsibilities
//! - Implement the [`Transport`](propbus_app::ports::Transport) port by
//!   writing one JSON [`DriverEvent`](propbus_domain::event::DriverEvent) per line
//! - Parse client requests (`get_properties`, `update`) from an async reader
//!   and hand them to the driver through a channel
//!
//! ## Dependency rule
//! Depends on `propbus-app` (for port traits) and `propbus-domain`. The `app`
//! and `domain` crates must never reference this adapter.

mod error;
mod reader;
mod writer;

pub use error::TransportError;
pub use reader::{ClientMessage, Inbound, forward_lines, parse_line};
pub use writer::LineTransport;
