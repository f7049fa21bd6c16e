use hexlink_core::frame::{Command, Frame};
use thiserror::Error;

use crate::state_machine::StateMachine;

/// Key into the command table.
///
/// Multi-purpose codes (such as SET_STATE) are refined by `param1` so each
/// sub-operation gets its own entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKey {
    /// The command code alone selects the operation.
    Code(u32),
    /// The command code together with `param1` selects the operation.
    CodeAndParam1(u32, u32),
}

/// A rejected command; the text is sent back as the NO_ACK reason.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CommandRejection(pub String);

impl CommandRejection {
    /// Creates a rejection with the given reason text.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Reply for an accepted command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommandReply {
    /// Estimated seconds until the commanded action completes.
    pub duration: f64,
    /// True if the command changed the configuration; the controller then
    /// writes a fresh configuration frame.
    pub config_changed: bool,
}

impl CommandReply {
    /// An instantaneous command.
    pub const fn done() -> Self {
        Self {
            duration: 0.0,
            config_changed: false,
        }
    }

    /// An accepted command that completes after `duration` seconds.
    pub const fn pending(duration: f64) -> Self {
        Self {
            duration,
            config_changed: false,
        }
    }

    /// An instantaneous command that changed the configuration.
    pub const fn config_update() -> Self {
        Self {
            duration: 0.0,
            config_changed: true,
        }
    }
}

/// Handler for a device-specific command.
///
/// Plain function references, resolved once at controller construction;
/// rejecting handlers must not mutate telemetry state.
pub type DeviceHandler<D> =
    fn(&mut D, &mut StateMachine, &Command) -> Result<CommandReply, CommandRejection>;

/// A device emulated by [`MockController`](crate::MockController).
///
/// Fixes the configuration and telemetry frame layouts at compile time and
/// contributes device-specific commands beyond the standard state
/// transitions.
pub trait DeviceModel: Send + 'static {
    /// Configuration frame layout.
    type Config: Frame;
    /// Telemetry frame layout.
    type Telemetry: Frame;

    /// Command code carrying a [`SetStateParam`](hexlink_core::state::SetStateParam)
    /// in `param1`.
    const SET_STATE_CODE: u32;

    /// Table key for a command. By default only the SET_STATE code is
    /// refined by `param1`.
    fn command_key(command: &Command) -> CommandKey {
        let code = command.code;
        if code == Self::SET_STATE_CODE {
            CommandKey::CodeAndParam1(code, command.param1 as u32)
        } else {
            CommandKey::Code(code)
        }
    }

    /// Device-specific commands beyond the standard state transitions.
    fn extra_commands() -> Vec<(CommandKey, DeviceHandler<Self>)>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Current configuration snapshot.
    fn config(&self) -> Self::Config;

    /// Advances the device by one telemetry tick and produces the telemetry
    /// snapshot for the given state.
    fn update_telemetry(&mut self, state: &StateMachine) -> Self::Telemetry;
}
