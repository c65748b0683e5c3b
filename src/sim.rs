// Bench doubles and the scenario runner
//
// Nothing here blocks or touches hardware. Actuation and clock share one event
// log so holds show up between the commands that surround them.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actuation::{Actuation, ActuatorId};
use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::messages::{ActuationEvent, CycleReport};
use crate::mode::{OperatingMode, WatchModeSelector};
use crate::pulse::{Channel, PulseSource};
use crate::runtime::Runtime;
use crate::signal::PulseSignal;

type EventLog = Rc<RefCell<Vec<ActuationEvent>>>;

/// Actuation primitive that records every command and tracks ramp state
#[derive(Default)]
pub struct RecordingActuation {
    log: EventLog,
    pulses: BTreeMap<ActuatorId, u16>,
    ramping: BTreeSet<ActuatorId>,
}

impl RecordingActuation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock whose holds land in this recorder's event log
    pub fn clock(&self) -> RecordingClock {
        RecordingClock {
            log: Rc::clone(&self.log),
        }
    }

    pub fn events(&self) -> Vec<ActuationEvent> {
        self.log.borrow().clone()
    }

    pub fn take_events(&mut self) -> Vec<ActuationEvent> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    /// Last pulse written to `id`, if any
    pub fn last_pulse(&self, id: ActuatorId) -> Option<u16> {
        self.pulses.get(&id).copied()
    }

    fn record(&self, event: ActuationEvent) {
        debug!("{:?}", event);
        self.log.borrow_mut().push(event);
    }
}

impl Actuation for RecordingActuation {
    fn set_immediate(&mut self, id: ActuatorId, pulse_us: u16) {
        self.pulses.insert(id, pulse_us);
        self.record(ActuationEvent::Set { id, pulse_us });
    }

    fn ramp_to(&mut self, id: ActuatorId, target_deg: u16, speed_dps: u16) {
        self.ramping.insert(id);
        self.record(ActuationEvent::Ramp {
            id,
            target_deg,
            speed_dps,
        });
    }

    fn is_ramping(&self, id: ActuatorId) -> bool {
        self.ramping.contains(&id)
    }

    fn halt(&mut self, id: ActuatorId) {
        self.ramping.remove(&id);
        self.record(ActuationEvent::Halt { id });
    }

    fn stop_all(&mut self) {
        self.ramping.clear();
        self.record(ActuationEvent::StopAll);
    }
}

/// Clock that records holds instead of sleeping
pub struct RecordingClock {
    log: EventLog,
}

impl Clock for RecordingClock {
    fn hold(&mut self, duration: Duration) {
        self.log.borrow_mut().push(ActuationEvent::Hold {
            ms: duration.as_millis() as u64,
        });
    }
}

/// Pulse source returning fixed per-channel values; unset channels time out (0)
#[derive(Debug, Default, Clone)]
pub struct ScriptedPulses {
    values: BTreeMap<Channel, PulseSignal>,
    measured: Vec<Channel>,
}

impl ScriptedPulses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, channel: Channel, pulse: PulseSignal) {
        self.values.insert(channel, pulse);
    }

    /// Replace every channel value at once
    pub fn load(&mut self, values: &BTreeMap<u8, PulseSignal>) {
        self.values = values.iter().map(|(&ch, &v)| (Channel(ch), v)).collect();
    }

    /// Channels measured so far, in order
    pub fn measured(&self) -> Vec<Channel> {
        self.measured.clone()
    }
}

impl PulseSource for ScriptedPulses {
    fn measure(&mut self, channel: Channel) -> PulseSignal {
        self.measured.push(channel);
        self.values.get(&channel).copied().unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Scenario has no frames")]
    EmptyScenario,
}

/// Receiver state held for one or more cycles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Mode switch position published before this frame's first cycle
    #[serde(default)]
    pub mode: Option<OperatingMode>,
    /// Pulse per receiver channel; missing channels read as timeouts
    #[serde(default)]
    pub channels: BTreeMap<u8, PulseSignal>,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub initial_mode: OperatingMode,
    pub frames: Vec<Frame>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(text)?;
        if scenario.frames.is_empty() {
            return Err(ScenarioError::EmptyScenario);
        }
        Ok(scenario)
    }
}

/// Play a scenario through a fresh runtime and report every cycle
pub fn run_scenario(scenario: &Scenario, config: &RuntimeConfig) -> Vec<CycleReport> {
    let (mode_tx, selector) = WatchModeSelector::channel(scenario.initial_mode);
    let mut runtime = Runtime::new(config, selector);
    let mut pulses = ScriptedPulses::new();
    let mut actuation = RecordingActuation::new();
    let mut clock = actuation.clock();
    let mut reports = Vec::new();

    for frame in &scenario.frames {
        if let Some(mode) = frame.mode {
            mode_tx.send_replace(mode);
        }
        pulses.load(&frame.channels);
        for _ in 0..frame.repeat {
            let mode = runtime.run_cycle(&mut pulses, &mut actuation, &mut clock);
            reports.push(CycleReport {
                cycle: runtime.cycles(),
                mode,
                health: runtime.health(),
                propulsion: runtime.propulsion_state(),
                events: actuation.take_events(),
            });
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::LinkHealth;
    use crate::propulsion::PropulsionState;

    const SCENARIO: &str = r#"{
        "frames": [
            { "channels": { "1": 1300, "2": 1700 } },
            { "channels": { "2": 1200 }, "repeat": 2 },
            { "mode": "arm", "channels": { "1": 1000 } },
            { "channels": { "1": 1500 } },
            { "channels": {} }
        ]
    }"#;

    #[test]
    fn test_scenario_parses_with_defaults() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        assert_eq!(scenario.initial_mode, OperatingMode::DriveNormal);
        assert_eq!(scenario.frames.len(), 5);
        assert_eq!(scenario.frames[1].repeat, 2);
        assert_eq!(scenario.frames[0].channels.get(&1), Some(&1300));
    }

    #[test]
    fn test_empty_scenario_rejected() {
        assert!(matches!(
            Scenario::from_json(r#"{ "frames": [] }"#),
            Err(ScenarioError::EmptyScenario)
        ));
    }

    #[test]
    fn test_run_scenario() {
        let scenario = Scenario::from_json(SCENARIO).unwrap();
        let reports = run_scenario(&scenario, &RuntimeConfig::default());
        assert_eq!(reports.len(), 6);

        assert_eq!(reports[0].propulsion, PropulsionState::Forward);
        // Forward -> reverse needs no unlock
        assert!(
            !reports[1]
                .events
                .iter()
                .any(|e| matches!(e, ActuationEvent::Hold { .. }))
        );
        assert_eq!(reports[2].propulsion, PropulsionState::Backward);

        assert_eq!(reports[3].mode, OperatingMode::Arm);
        assert_eq!(
            reports[3].events,
            vec![ActuationEvent::Ramp {
                id: ActuatorId::Joint(0),
                target_deg: 20,
                speed_dps: 160
            }]
        );
        assert_eq!(
            reports[4].events,
            vec![
                ActuationEvent::Halt {
                    id: ActuatorId::Joint(0)
                },
                ActuationEvent::StopAll
            ]
        );
        assert_eq!(reports[5].health, LinkHealth::NoSignal);
        assert_eq!(reports[5].cycle, 6);
    }
}
