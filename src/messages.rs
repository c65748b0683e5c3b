// Records emitted by the bench/simulator for inspection and JSON output

use serde::{Deserialize, Serialize};

use crate::actuation::ActuatorId;
use crate::mode::OperatingMode;
use crate::propulsion::PropulsionState;

/// One observable effect of a control cycle, in issue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActuationEvent {
    Set { id: ActuatorId, pulse_us: u16 },
    Ramp { id: ActuatorId, target_deg: u16, speed_dps: u16 },
    Halt { id: ActuatorId },
    StopAll,
    /// Blocking hold requested from the clock
    Hold { ms: u64 },
}

/// Receiver link status as seen by the last cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    #[default]
    Ok,
    /// Every channel read this cycle timed out
    NoSignal,
}

/// Summary of one simulated cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub mode: OperatingMode,
    pub health: LinkHealth,
    pub propulsion: PropulsionState,
    pub events: Vec<ActuationEvent>,
}
