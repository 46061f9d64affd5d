//! # propbus-adapter-focuser-sim
//!
//! A simulated focuser, built on the shared
//! [`DeviceDriver`](propbus_app::services::driver::DeviceDriver) core.
//!
//! ## Responsibilities
//! - Declare the focuser vectors and show the connected-only ones while the
//!   device is connected
//! - Simulate absolute, relative and timed motion with a cancellable delay
//! - Model the star FWHM as a function of focuser position and seeing
//! - Switch the focuser capabilities through the `Mode` selector
//!
//! ## Dependency rule
//! Depends on `propbus-app` and `propbus-domain` only. Transports and
//! config stores are injected through the port traits.

mod mode;
mod physics;
mod properties;
mod simulator;

pub use mode::{Capabilities, Mode};
pub use physics::Optics;
pub use properties::*;
pub use simulator::{Command, FocuserSimulator};
