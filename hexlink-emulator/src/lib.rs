#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Mock hexapod/rotator controller for testing without real hardware.
//!
//! [`MockController`] implements the hardware side of the command/telemetry
//! protocol: it listens for one client, validates each incoming command
//! against the device state machine, replies with an acknowledgement, and
//! emits periodic telemetry and one-shot configuration frames.
//! [`SimpleDevice`] is a single-axis reference device used by the tests.

mod controller;
/// Device abstraction and the typed command table.
pub mod device;
/// The single-axis reference device.
pub mod simple;
mod state_machine;

pub use controller::{MockController, MockControllerOptions};
pub use device::{CommandKey, CommandRejection, CommandReply, DeviceHandler, DeviceModel};
pub use simple::{SimpleCommandCode, SimpleConfig, SimpleDevice, SimpleTelemetry};
pub use state_machine::StateMachine;
