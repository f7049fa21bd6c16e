#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! TCP command/telemetry link for hexapod/rotator motion controllers.
//!
//! The controller listens; the link connects out and multiplexes command,
//! command-status, configuration and telemetry frames over one socket.
//! [`CommandTelemetryClient`] owns the connection and provides single-flight
//! command execution with counter-correlated acknowledgements;
//! [`OneClientServer`] is the hardware-side acceptor that serves exactly one
//! peer at a time.

mod client;
/// Frame-level read/write helpers shared by the client and the emulator.
pub mod io;
mod one_client_server;

pub use client::{Callbacks, CommandTelemetryClient, LinkOptions};
pub use one_client_server::OneClientServer;
