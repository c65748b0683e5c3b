// Crab steering: one steering channel drives four wheel servos.
//
// Front wheels follow the stick directly, rear wheels mirror the deflection
// around neutral, so the pairs turn in opposite senses.

use tracing::debug;

use crate::actuation::{Actuation, ActuatorId, Wheel};
use crate::config::PULSE_NEUTRAL;
use crate::mode::OperatingMode;
use crate::signal::{ConditionedSignal, Deflection};

/// Pulse widths for the four steering servos
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelCommands {
    pub front_left: u16,
    pub front_right: u16,
    pub back_left: u16,
    pub back_right: u16,
}

impl WheelCommands {
    pub fn neutral() -> Self {
        Self::pairs(PULSE_NEUTRAL, PULSE_NEUTRAL)
    }

    fn pairs(front: u16, back: u16) -> Self {
        Self {
            front_left: front,
            front_right: front,
            back_left: back,
            back_right: back,
        }
    }

    pub fn get(&self, wheel: Wheel) -> u16 {
        match wheel {
            Wheel::FrontLeft => self.front_left,
            Wheel::FrontRight => self.front_right,
            Wheel::BackLeft => self.back_left,
            Wheel::BackRight => self.back_right,
        }
    }
}

impl Default for WheelCommands {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Compute wheel commands for a steering signal.
///
/// Returns `None` for modes without a steering geometry (`DriveSpin`, `Arm`).
pub fn steer(signal: ConditionedSignal, mode: OperatingMode) -> Option<WheelCommands> {
    if mode != OperatingMode::DriveNormal {
        return None;
    }

    let commands = match signal.deflection() {
        Deflection::Neutral => WheelCommands::neutral(),
        Deflection::Low(s) => WheelCommands::pairs(s, PULSE_NEUTRAL + (PULSE_NEUTRAL - s)),
        Deflection::High(s) => WheelCommands::pairs(s, PULSE_NEUTRAL - (s - PULSE_NEUTRAL)),
    };
    Some(commands)
}

/// Apply [`steer`] to the wheel servos
pub fn apply_steering(
    signal: ConditionedSignal,
    mode: OperatingMode,
    actuation: &mut impl Actuation,
) -> Option<WheelCommands> {
    let commands = steer(signal, mode)?;
    debug!("Wheel commands: {:?}", commands);
    for wheel in Wheel::ALL {
        actuation.set_immediate(ActuatorId::Wheel(wheel), commands.get(wheel));
    }
    Some(commands)
}
