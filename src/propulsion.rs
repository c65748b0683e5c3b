// Propulsion controller: forwards the motor channel to the ESC and performs the
// reverse unlock ("guarded reversal") when reverse is requested from standstill.
//
// Many ESCs ignore a reverse command straight from neutral; they need a short
// full-reverse tap followed by neutral before reverse engages. The tap blocks
// the whole control cycle while it runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actuation::{Actuation, ActuatorId};
use crate::clock::Clock;
use crate::config::{NEUTRAL_HOLD, PULSE_MIN, PULSE_NEUTRAL, REVERSAL_HOLD};
use crate::mode::OperatingMode;
use crate::signal::{ConditionedSignal, Deflection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropulsionState {
    #[default]
    Idle,
    Forward,
    Backward,
}

pub struct PropulsionController {
    state: PropulsionState,
    reversal_hold: Duration,
    neutral_hold: Duration,
}

impl Default for PropulsionController {
    fn default() -> Self {
        Self::new(REVERSAL_HOLD, NEUTRAL_HOLD)
    }
}

impl PropulsionController {
    pub fn new(reversal_hold: Duration, neutral_hold: Duration) -> Self {
        Self {
            state: PropulsionState::Idle,
            reversal_hold,
            neutral_hold,
        }
    }

    pub fn state(&self) -> PropulsionState {
        self.state
    }

    /// Resolve the direction state and issue the motor command for this cycle.
    ///
    /// Does nothing outside `DriveNormal`.
    pub fn update(
        &mut self,
        signal: ConditionedSignal,
        mode: OperatingMode,
        actuation: &mut impl Actuation,
        clock: &mut impl Clock,
    ) {
        if mode != OperatingMode::DriveNormal {
            return;
        }

        self.state = match (signal.deflection(), self.state) {
            (Deflection::Low(_), PropulsionState::Idle) => {
                self.unlock_reverse(actuation, clock);
                PropulsionState::Backward
            }
            (Deflection::Low(_), _) => PropulsionState::Backward,
            (Deflection::High(_), _) => PropulsionState::Forward,
            (Deflection::Neutral, _) => PropulsionState::Idle,
        };

        // Lost signal goes out as neutral, never as a 0us pulse
        let command = if signal.is_none() {
            PULSE_NEUTRAL
        } else {
            signal.get()
        };
        debug!("Motor command {}us ({:?})", command, self.state);
        actuation.set_immediate(ActuatorId::Motor, command);
    }

    fn unlock_reverse(&self, actuation: &mut impl Actuation, clock: &mut impl Clock) {
        debug!("Reverse requested from idle, unlocking ESC reverse");
        actuation.set_immediate(ActuatorId::Motor, PULSE_MIN);
        clock.hold(self.reversal_hold);
        actuation.set_immediate(ActuatorId::Motor, PULSE_NEUTRAL);
        clock.hold(self.neutral_hold);
    }
}
