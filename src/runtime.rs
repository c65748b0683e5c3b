// Control cycle dispatcher
//
// Each cycle: pick up a pending mode change, measure the channels the mode
// needs, then run exactly one branch (drive or arm). Actuators of the other
// branch keep whatever they were last told; switching modes resets nothing.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

// local imports
use crate::actuation::Actuation;
use crate::arm::ArmController;
use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::messages::LinkHealth;
use crate::mode::{ModeSelector, OperatingMode};
use crate::propulsion::{PropulsionController, PropulsionState};
use crate::pulse::{Channel, PulseSource};
use crate::signal::{ConditionedSignal, PulseSignal};
use crate::steering::apply_steering;

pub struct Runtime<M: ModeSelector> {
    mode_selector: M,
    mode: OperatingMode,
    steer_channel: Channel,
    motor_channel: Channel,
    propulsion: PropulsionController,
    arm: ArmController,
    health: LinkHealth,
    cycles: u64,
}

impl<M: ModeSelector> Runtime<M> {
    pub fn new(config: &RuntimeConfig, mode_selector: M) -> Self {
        let mode = mode_selector.current();
        Self {
            mode_selector,
            mode,
            steer_channel: Channel(config.steer_channel),
            motor_channel: Channel(config.motor_channel),
            propulsion: PropulsionController::new(config.reversal_hold(), config.neutral_hold()),
            arm: ArmController::new(config.joints.clone(), config.joint_limits),
            health: LinkHealth::Ok,
            cycles: 0,
        }
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn health(&self) -> LinkHealth {
        self.health
    }

    pub fn propulsion_state(&self) -> PropulsionState {
        self.propulsion.state()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one control cycle and return the mode it ran in
    pub fn run_cycle(
        &mut self,
        pulses: &mut impl PulseSource,
        actuation: &mut impl Actuation,
        clock: &mut impl Clock,
    ) -> OperatingMode {
        if let Some(mode) = self.mode_selector.poll_change() {
            if mode != self.mode {
                info!("Mode changed: {:?} -> {:?}", self.mode, mode);
                self.mode = mode;
            }
        }

        let mode = self.mode;
        let raw = if mode.is_drive() {
            let steer = pulses.measure(self.steer_channel);
            let motor = pulses.measure(self.motor_channel);
            debug!("{}={} {}={}", self.steer_channel, steer, self.motor_channel, motor);

            // Propulsion first: a reverse unlock delays steering this cycle
            self.propulsion
                .update(ConditionedSignal::from_raw(motor), mode, actuation, clock);
            apply_steering(ConditionedSignal::from_raw(steer), mode, actuation);
            vec![steer, motor]
        } else {
            let raw: Vec<PulseSignal> = self
                .arm
                .joints()
                .iter()
                .map(|joint| pulses.measure(Channel(joint.channel)))
                .collect();
            let signals: Vec<ConditionedSignal> =
                raw.iter().map(|&r| ConditionedSignal::from_raw(r)).collect();
            self.arm.update(&signals, actuation);
            raw
        };

        self.update_health(&raw);
        self.cycles += 1;
        mode
    }

    /// Run cycles back to back until `shutdown` is set.
    ///
    /// The flag is only checked between cycles, so a started reverse unlock always completes.
    pub fn run_blocking(
        &mut self,
        pulses: &mut impl PulseSource,
        actuation: &mut impl Actuation,
        clock: &mut impl Clock,
        shutdown: &AtomicBool,
    ) {
        info!("Control loop started in {:?}", self.mode);
        while !shutdown.load(Ordering::Relaxed) {
            self.run_cycle(pulses, actuation, clock);
        }
        info!("Control loop stopped after {} cycles", self.cycles);
    }

    fn update_health(&mut self, raw: &[PulseSignal]) {
        let lost = raw.iter().all(|&r| r == 0);
        match (lost, self.health) {
            (true, LinkHealth::Ok) => {
                warn!("No receiver signal on {:?} channels", self.mode);
                self.health = LinkHealth::NoSignal;
            }
            (false, LinkHealth::NoSignal) => {
                info!("Receiver signal regained");
                self.health = LinkHealth::Ok;
            }
            _ => {}
        }
    }
}
