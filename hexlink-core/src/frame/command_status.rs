use derive_more::Display;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use super::Frame;

/// Capacity of the NO_ACK reason buffer in bytes.
pub const REASON_LEN: usize = 50;

/// Positive or negative acknowledgement code.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum CommandStatusCode {
    /// The command was accepted.
    Ack = 1,
    /// The command was rejected; the reason buffer says why.
    NoAck = 2,
}

/// Acknowledgement of a [`Command`](super::Command).
///
/// Correlated to its command by the counter in the surrounding
/// [`Header`](super::Header).
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct CommandStatus {
    /// Raw [`CommandStatusCode`] value.
    pub status: u32,
    /// Estimated seconds until the commanded action completes;
    /// 0 if already complete.
    pub duration: f64,
    /// NUL-padded failure text, non-empty only on NO_ACK. Truncated to
    /// [`REASON_LEN`] bytes on overflow.
    pub reason: [u8; REASON_LEN],
}

impl Frame for CommandStatus {
    const FRAME_ID: u32 = 2;
}

impl CommandStatus {
    /// Creates a positive acknowledgement.
    pub fn ack(duration: f64) -> Self {
        let mut status = Self::new_zeroed();
        status.status = CommandStatusCode::Ack as u32;
        status.duration = duration;
        status
    }

    /// Creates a negative acknowledgement, truncating the reason to the
    /// buffer capacity.
    pub fn no_ack(reason: &str) -> Self {
        let mut status = Self::new_zeroed();
        status.status = CommandStatusCode::NoAck as u32;
        let bytes = reason.as_bytes();
        let len = bytes.len().min(REASON_LEN);
        status.reason[..len].copy_from_slice(&bytes[..len]);
        status
    }

    /// Returns true if this is a positive acknowledgement.
    pub fn is_ack(&self) -> bool {
        self.status == CommandStatusCode::Ack as u32
    }

    /// Returns the reason text with the NUL padding stripped.
    pub fn reason(&self) -> String {
        let end = self
            .reason
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(REASON_LEN);
        String::from_utf8_lossy(&self.reason[..end]).into_owned()
    }
}
