#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Wire frame model and shared types for hexapod/rotator controller links.
//!
//! Low-level motion controllers speak a fixed-format binary protocol over
//! TCP: every message is a fixed-size [`frame::Header`] followed by a
//! fixed-size payload selected by the header's frame ID. This crate defines
//! the byte-exact records, the controller state enums reported in telemetry,
//! and the error taxonomy shared by the link and the controller emulator.

/// Errors produced by the command/telemetry link.
pub mod error;
/// Byte-exact wire records and the frame ID discriminator.
pub mod frame;
/// Controller state and substate enums.
pub mod state;
/// TAI timestamps for frame headers.
pub mod time;
