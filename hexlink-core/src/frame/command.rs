use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

use super::Frame;

/// `commander` tag identifying the CSC-side client.
pub const COMMANDER_CSC: u32 = 1;

/// A command sent to the low-level controller.
///
/// `counter` values are strictly increasing (with wraparound) per
/// connection; the controller echoes the counter in the header of the
/// [`CommandStatus`](super::CommandStatus) reply. Exactly one command may
/// be awaiting acknowledgement at a time on a given link.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct Command {
    /// Tag identifying the sender class; see [`COMMANDER_CSC`].
    pub commander: u32,
    /// Connection-scoped correlation counter, assigned by the link.
    pub counter: u32,
    /// Operation selector; codes are device specific.
    pub code: u32,
    /// First operation-specific parameter.
    pub param1: f64,
    /// Second operation-specific parameter.
    pub param2: f64,
    /// Third operation-specific parameter.
    pub param3: f64,
    /// Fourth operation-specific parameter.
    pub param4: f64,
    /// Fifth operation-specific parameter.
    pub param5: f64,
    /// Sixth operation-specific parameter.
    pub param6: f64,
}

impl Frame for Command {
    const FRAME_ID: u32 = 1;
}

impl Command {
    /// Creates a command with the given code and all parameters zero.
    pub fn new(code: u32) -> Self {
        let mut command = Self::new_zeroed();
        command.commander = COMMANDER_CSC;
        command.code = code;
        command
    }

    /// Sets `param1`.
    pub fn with_param1(mut self, param1: f64) -> Self {
        self.param1 = param1;
        self
    }
}
