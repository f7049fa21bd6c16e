use derive_more::Display;

/// Primary controller state, reported in telemetry.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum ControllerState {
    /// Powered up but not under CSC control.
    Offline = 0,
    /// Under CSC control, actuators off.
    Standby = 1,
    /// Configured, actuators off.
    Disabled = 2,
    /// Actuators on, accepting motion commands.
    Enabled = 3,
    /// A fault condition is latched; cleared with CLEAR_ERROR.
    Fault = 4,
}

/// Substate nested under [`ControllerState::Offline`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum OfflineSubstate {
    /// Not in the OFFLINE state.
    Cleared = 0,
    /// Telemetry only; an engineering interface must release control.
    PublishOnly = 1,
    /// Ready to accept ENTER_CONTROL.
    Available = 2,
}

/// Substate nested under [`ControllerState::Enabled`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum EnabledSubstate {
    /// Not in the ENABLED state.
    Cleared = 0,
    /// No motion in progress.
    Stationary = 1,
    /// A point-to-point move is in progress.
    MovingPointToPoint = 2,
}

/// Values of `Command.param1` when the command code is the device's
/// SET_STATE code.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum SetStateParam {
    /// Not a valid transition request.
    Invalid = 0,
    /// STANDBY to DISABLED.
    Start = 1,
    /// DISABLED to ENABLED.
    Enable = 2,
    /// DISABLED to STANDBY.
    Standby = 3,
    /// ENABLED to DISABLED.
    Disable = 4,
    /// STANDBY to OFFLINE.
    Exit = 5,
    /// FAULT or STANDBY to STANDBY.
    ClearError = 6,
    /// OFFLINE (substate AVAILABLE) to STANDBY.
    EnterControl = 7,
}

impl SetStateParam {
    /// Parses a raw `param1` value; unknown values map to `Invalid`.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Start,
            2 => Self::Enable,
            3 => Self::Standby,
            4 => Self::Disable,
            5 => Self::Exit,
            6 => Self::ClearError,
            7 => Self::EnterControl,
            _ => Self::Invalid,
        }
    }
}
