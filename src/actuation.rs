// Actuator addressing and the actuation primitive the core drives
use std::fmt;

use serde::{Deserialize, Serialize};

/// Steering servo positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wheel {
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::FrontRight,
        Wheel::BackLeft,
        Wheel::BackRight,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorId {
    /// Propulsion ESC
    Motor,
    /// Steering servo
    Wheel(Wheel),
    /// Arm joint servo, by index into the configured joints
    Joint(usize),
}

impl fmt::Display for ActuatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorId::Motor => write!(f, "motor"),
            ActuatorId::Wheel(w) => write!(f, "wheel {:?}", w),
            ActuatorId::Joint(i) => write!(f, "joint {}", i),
        }
    }
}

/// Servo/ESC primitive with smooth motion support.
///
/// Commands take effect immediately; nothing is queued.
pub trait Actuation {
    /// Write a pulse width (microseconds) straight to the actuator
    fn set_immediate(&mut self, id: ActuatorId, pulse_us: u16);

    /// Start easing toward `target_deg` at `speed_dps` degrees per second
    fn ramp_to(&mut self, id: ActuatorId, target_deg: u16, speed_dps: u16);

    fn is_ramping(&self, id: ActuatorId) -> bool;

    /// Mark one actuator as no longer moving
    fn halt(&mut self, id: ActuatorId);

    /// Stop every easing actuator
    fn stop_all(&mut self);
}
