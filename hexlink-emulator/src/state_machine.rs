use hexlink_core::state::{ControllerState, EnabledSubstate, OfflineSubstate, SetStateParam};

use crate::device::CommandRejection;

/// The controller's authoritative state and substates.
///
/// Telemetry mirrors this; the client's copy lags by one frame interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateMachine {
    state: ControllerState,
    offline_substate: OfflineSubstate,
    enabled_substate: EnabledSubstate,
}

impl StateMachine {
    /// Creates a state machine in the given initial state, with the
    /// substate rules applied.
    pub fn new(initial_state: ControllerState) -> Self {
        let mut machine = Self {
            state: initial_state,
            offline_substate: OfflineSubstate::Cleared,
            enabled_substate: EnabledSubstate::Cleared,
        };
        machine.set_state(initial_state);
        machine
    }

    /// Current primary state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Current OFFLINE substate.
    pub fn offline_substate(&self) -> OfflineSubstate {
        self.offline_substate
    }

    /// Current ENABLED substate.
    pub fn enabled_substate(&self) -> EnabledSubstate {
        self.enabled_substate
    }

    /// Sets the state and applies the substate rules: entering OFFLINE
    /// selects AVAILABLE, entering ENABLED selects STATIONARY, every other
    /// state clears both substates.
    pub fn set_state(&mut self, state: ControllerState) {
        self.state = state;
        self.offline_substate = if state == ControllerState::Offline {
            OfflineSubstate::Available
        } else {
            OfflineSubstate::Cleared
        };
        self.enabled_substate = if state == ControllerState::Enabled {
            EnabledSubstate::Stationary
        } else {
            EnabledSubstate::Cleared
        };
        tracing::debug!(state = %self.state, "state changed");
    }

    /// Latches a fault, as simulated by an external condition.
    ///
    /// Reachable from any state; cleared only by CLEAR_ERROR.
    pub fn fault(&mut self) {
        self.set_state(ControllerState::Fault);
    }

    /// Rejects the command unless the controller is in `required`.
    pub fn assert_state(&self, required: ControllerState) -> Result<(), CommandRejection> {
        if self.state != required {
            return Err(CommandRejection::new(format!(
                "state={}; must be {required} for this command",
                self.state
            )));
        }
        Ok(())
    }

    /// Applies a standard state-transition command.
    pub fn handle_set_state(&mut self, param: SetStateParam) -> Result<(), CommandRejection> {
        match param {
            SetStateParam::EnterControl => {
                self.assert_state(ControllerState::Offline)?;
                if self.offline_substate != OfflineSubstate::Available {
                    return Err(CommandRejection::new(format!(
                        "offline_substate={}; must be {} for this command",
                        self.offline_substate,
                        OfflineSubstate::Available
                    )));
                }
                self.set_state(ControllerState::Standby);
            }
            SetStateParam::Start => {
                self.assert_state(ControllerState::Standby)?;
                self.set_state(ControllerState::Disabled);
            }
            SetStateParam::Enable => {
                self.assert_state(ControllerState::Disabled)?;
                self.set_state(ControllerState::Enabled);
            }
            SetStateParam::Disable => {
                self.assert_state(ControllerState::Enabled)?;
                self.set_state(ControllerState::Disabled);
            }
            SetStateParam::Standby => {
                self.assert_state(ControllerState::Disabled)?;
                self.set_state(ControllerState::Standby);
            }
            SetStateParam::Exit => {
                self.assert_state(ControllerState::Standby)?;
                self.set_state(ControllerState::Offline);
            }
            SetStateParam::ClearError => {
                if !matches!(
                    self.state,
                    ControllerState::Fault | ControllerState::Standby
                ) {
                    return Err(CommandRejection::new(format!(
                        "state={}; must be {} or {} for this command",
                        self.state,
                        ControllerState::Fault,
                        ControllerState::Standby
                    )));
                }
                self.set_state(ControllerState::Standby);
            }
            SetStateParam::Invalid => {
                return Err(CommandRejection::new("invalid SET_STATE parameter"));
            }
        }
        Ok(())
    }
}
