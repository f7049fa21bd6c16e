use hexlink_core::{
    frame::{Command, Frame},
    state::{ControllerState, EnabledSubstate},
};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::device::{CommandKey, CommandRejection, CommandReply, DeviceHandler, DeviceModel};
use crate::state_machine::StateMachine;

/// Command codes understood by [`SimpleDevice`].
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimpleCommandCode {
    /// Standard state transition; `param1` is a `SetStateParam`.
    SetState = 1,
    /// Enabled-substate trigger; `param1` selects the sub-operation.
    SetEnabledSubstate = 2,
    /// Move to the position in `param1`.
    Move = 3,
    /// Set the velocity limit in `param1` and rewrite the configuration.
    ConfigVelocity = 4,
}

/// `application_status` flag: commands are accepted from the CSC.
pub const APPLICATION_STATUS_CSC_COMMAND_SOURCE: u32 = 1;

/// Configuration of [`SimpleDevice`].
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SimpleConfig {
    /// Lowest commandable position.
    pub min_position: f64,
    /// Highest commandable position.
    pub max_position: f64,
    /// Velocity limit used for move-duration estimates.
    pub max_velocity: f64,
}

impl Frame for SimpleConfig {
    const FRAME_ID: u32 = 0x19;
}

/// Telemetry from [`SimpleDevice`].
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct SimpleTelemetry {
    /// Application status bit mask.
    pub application_status: u32,
    /// Raw [`ControllerState`] value.
    pub state: u32,
    /// Raw [`EnabledSubstate`](hexlink_core::state::EnabledSubstate) value.
    pub enabled_substate: u32,
    /// Raw [`OfflineSubstate`](hexlink_core::state::OfflineSubstate) value.
    pub offline_substate: u32,
    /// Measured axis position.
    pub curr_position: f64,
    /// Most recently commanded axis position.
    pub cmd_position: f64,
}

impl Frame for SimpleTelemetry {
    const FRAME_ID: u32 = 0x5;
}

/// A single-axis positioner: the simplest device that exercises the whole
/// protocol, used to test the controller emulator and the link.
///
/// MOVE is rejected if the target is outside the configured position range;
/// an accepted MOVE reports a completion estimate of distance over the
/// velocity limit.
pub struct SimpleDevice {
    config: SimpleConfig,
    curr_position: f64,
    cmd_position: f64,
}

impl Default for SimpleDevice {
    fn default() -> Self {
        Self {
            config: SimpleConfig {
                min_position: -25.0,
                max_position: 25.0,
                max_velocity: 47.0,
            },
            curr_position: 0.0,
            cmd_position: 0.0,
        }
    }
}

impl SimpleDevice {
    fn move_to(&mut self, target: f64) -> Result<CommandReply, CommandRejection> {
        let min = self.config.min_position;
        let max = self.config.max_position;
        if !(min..=max).contains(&target) {
            return Err(CommandRejection::new(format!(
                "commanded position {target} out of range [{min}, {max}]"
            )));
        }
        let duration = (target - self.curr_position).abs() / self.config.max_velocity;
        self.cmd_position = target;
        self.curr_position = target;
        Ok(CommandReply::pending(duration))
    }

    fn do_move(
        &mut self,
        state: &mut StateMachine,
        command: &Command,
    ) -> Result<CommandReply, CommandRejection> {
        state.assert_state(ControllerState::Enabled)?;
        self.move_to(command.param1)
    }

    // SET_ENABLED_SUBSTATE(MOVE_POINT_TO_POINT) carries the target in param2.
    fn do_move_point_to_point(
        &mut self,
        state: &mut StateMachine,
        command: &Command,
    ) -> Result<CommandReply, CommandRejection> {
        state.assert_state(ControllerState::Enabled)?;
        self.move_to(command.param2)
    }

    fn do_config_velocity(
        &mut self,
        state: &mut StateMachine,
        command: &Command,
    ) -> Result<CommandReply, CommandRejection> {
        state.assert_state(ControllerState::Enabled)?;
        let max_velocity = command.param1;
        if max_velocity.is_nan() || max_velocity <= 0.0 {
            return Err(CommandRejection::new(format!(
                "commanded max velocity {max_velocity} must be positive"
            )));
        }
        self.config.max_velocity = max_velocity;
        Ok(CommandReply::config_update())
    }
}

impl DeviceModel for SimpleDevice {
    type Config = SimpleConfig;
    type Telemetry = SimpleTelemetry;

    const SET_STATE_CODE: u32 = SimpleCommandCode::SetState as u32;

    fn command_key(command: &Command) -> CommandKey {
        let code = command.code;
        if code == SimpleCommandCode::SetState as u32
            || code == SimpleCommandCode::SetEnabledSubstate as u32
        {
            CommandKey::CodeAndParam1(code, command.param1 as u32)
        } else {
            CommandKey::Code(code)
        }
    }

    fn extra_commands() -> Vec<(CommandKey, DeviceHandler<Self>)> {
        vec![
            (
                CommandKey::Code(SimpleCommandCode::Move as u32),
                Self::do_move as DeviceHandler<Self>,
            ),
            (
                CommandKey::CodeAndParam1(
                    SimpleCommandCode::SetEnabledSubstate as u32,
                    EnabledSubstate::MovingPointToPoint as u32,
                ),
                Self::do_move_point_to_point as DeviceHandler<Self>,
            ),
            (
                CommandKey::Code(SimpleCommandCode::ConfigVelocity as u32),
                Self::do_config_velocity as DeviceHandler<Self>,
            ),
        ]
    }

    fn config(&self) -> SimpleConfig {
        self.config
    }

    fn update_telemetry(&mut self, state: &StateMachine) -> SimpleTelemetry {
        SimpleTelemetry {
            application_status: APPLICATION_STATUS_CSC_COMMAND_SOURCE,
            state: state.state() as u32,
            enabled_substate: state.enabled_substate() as u32,
            offline_substate: state.offline_substate() as u32,
            curr_position: self.curr_position,
            cmd_position: self.cmd_position,
        }
    }
}

#[cfg(test)]
mod tests {
    use core::mem::size_of;

    use approx::assert_abs_diff_eq;
    use hexlink_core::state::{EnabledSubstate, OfflineSubstate};

    use super::*;

    #[test]
    fn frame_layouts() {
        assert_eq!(24, size_of::<SimpleConfig>());
        assert_eq!(32, size_of::<SimpleTelemetry>());
        assert_ne!(SimpleConfig::FRAME_ID, SimpleTelemetry::FRAME_ID);
    }

    #[test]
    fn config_round_trip() {
        let device = SimpleDevice::default();
        let config = device.config();
        let bytes = <SimpleConfig as IntoBytes>::as_bytes(&config).to_vec();
        assert_eq!(config, SimpleConfig::read_from_bytes(&bytes).unwrap());
    }

    #[test]
    fn telemetry_mirrors_state_machine() {
        let mut device = SimpleDevice::default();
        let state = StateMachine::new(ControllerState::Enabled);
        let telemetry = device.update_telemetry(&state);
        assert_eq!(ControllerState::Enabled as u32, { telemetry.state });
        assert_eq!(EnabledSubstate::Stationary as u32, {
            telemetry.enabled_substate
        });
        assert_eq!(OfflineSubstate::Cleared as u32, {
            telemetry.offline_substate
        });
    }

    #[test]
    fn move_estimates_duration() {
        let mut device = SimpleDevice::default();
        let mut state = StateMachine::new(ControllerState::Enabled);
        let command = Command::new(SimpleCommandCode::Move as u32).with_param1(23.5);
        let reply = device.do_move(&mut state, &command).unwrap();
        assert_abs_diff_eq!(0.5, reply.duration, epsilon = 1e-12);
        assert_eq!(23.5, device.cmd_position);
        assert_eq!(23.5, device.curr_position);
    }

    #[test]
    fn move_out_of_range_is_rejected_without_motion() {
        let mut device = SimpleDevice::default();
        let mut state = StateMachine::new(ControllerState::Enabled);
        let command = Command::new(SimpleCommandCode::Move as u32).with_param1(26.0);
        let rejection = device.do_move(&mut state, &command).unwrap_err();
        assert!(rejection.0.contains("out of range"));
        assert_eq!(0.0, device.cmd_position);
        assert_eq!(0.0, device.curr_position);
    }

    #[test]
    fn move_point_to_point_takes_target_from_param2() {
        let mut device = SimpleDevice::default();
        let mut state = StateMachine::new(ControllerState::Enabled);
        let mut command = Command::new(SimpleCommandCode::SetEnabledSubstate as u32)
            .with_param1(EnabledSubstate::MovingPointToPoint as u32 as f64);
        command.param2 = -9.4;
        let reply = device.do_move_point_to_point(&mut state, &command).unwrap();
        assert_abs_diff_eq!(0.2, reply.duration, epsilon = 1e-12);
        assert_eq!(-9.4, device.curr_position);
    }

    #[test]
    fn move_requires_enabled_state() {
        let mut device = SimpleDevice::default();
        let mut state = StateMachine::new(ControllerState::Disabled);
        let command = Command::new(SimpleCommandCode::Move as u32).with_param1(1.0);
        assert!(device.do_move(&mut state, &command).is_err());
    }

    #[test]
    fn config_velocity_flags_config_change() {
        let mut device = SimpleDevice::default();
        let mut state = StateMachine::new(ControllerState::Enabled);
        let command = Command::new(SimpleCommandCode::ConfigVelocity as u32).with_param1(12.0);
        let reply = device.do_config_velocity(&mut state, &command).unwrap();
        assert!(reply.config_changed);
        assert_eq!(12.0, { device.config().max_velocity });

        for bad in [0.0, -1.0, f64::NAN] {
            let command = Command::new(SimpleCommandCode::ConfigVelocity as u32).with_param1(bad);
            assert!(device.do_config_velocity(&mut state, &command).is_err());
        }
        assert_eq!(12.0, { device.config().max_velocity });
    }

    #[test]
    fn telemetry_round_trip() {
        let mut device = SimpleDevice::default();
        let state = StateMachine::new(ControllerState::Enabled);
        let telemetry = device.update_telemetry(&state);
        let bytes = <SimpleTelemetry as IntoBytes>::as_bytes(&telemetry).to_vec();
        assert_eq!(telemetry, SimpleTelemetry::read_from_bytes(&bytes).unwrap());
    }
}
