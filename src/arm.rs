// Arm joint controller
//
// Stick deflection sets how fast a joint eases toward one of its travel
// limits, not where it goes. Centring the stick stops the joint where it is.

use tracing::debug;

use crate::actuation::{Actuation, ActuatorId};
use crate::config::{JointConfig, JointLimits, PULSE_MAX, PULSE_MIN, PULSE_NEUTRAL};
use crate::signal::{ConditionedSignal, Deflection, map_range};

/// Slowest commanded ramp, degrees per second
pub const MIN_RAMP_SPEED: u16 = 1;

/// Ramp target and speed for one joint, valid for the current cycle only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointCommand {
    pub target_angle: u16,
    pub ramp_speed: u16,
}

/// Translate a conditioned signal into a ramp command, or `None` when centred.
///
/// Both halves of the stick map onto `[0, max_angle]`. Below neutral the
/// result is inverted before use as a speed.
pub fn joint_command(signal: ConditionedSignal, limits: JointLimits) -> Option<JointCommand> {
    let max = limits.max_angle as i32;
    match signal.deflection() {
        Deflection::Neutral => None,
        Deflection::Low(s) => {
            let mapped = map_range(s as i32, PULSE_MIN as i32, PULSE_NEUTRAL as i32, 0, max);
            Some(JointCommand {
                target_angle: limits.min_angle,
                ramp_speed: clamp_speed(max - mapped),
            })
        }
        Deflection::High(s) => {
            let mapped = map_range(s as i32, PULSE_NEUTRAL as i32, PULSE_MAX as i32, 0, max);
            Some(JointCommand {
                target_angle: limits.max_angle,
                ramp_speed: clamp_speed(mapped),
            })
        }
    }
}

fn clamp_speed(speed: i32) -> u16 {
    speed.clamp(MIN_RAMP_SPEED as i32, u16::MAX as i32) as u16
}

pub struct ArmController {
    joints: Vec<JointConfig>,
    limits: JointLimits,
}

impl ArmController {
    pub fn new(joints: Vec<JointConfig>, limits: JointLimits) -> Self {
        Self { joints, limits }
    }

    pub fn joints(&self) -> &[JointConfig] {
        &self.joints
    }

    /// Drive every enabled joint from its signal; `signals` is indexed like the joints
    pub fn update(&self, signals: &[ConditionedSignal], actuation: &mut impl Actuation) {
        for (index, (joint, &signal)) in self.joints.iter().zip(signals).enumerate() {
            if joint.enabled {
                self.update_joint(index, signal, actuation);
            }
        }
    }

    /// Ramp one joint, or mark it stopped and stop everything once no joint is moving
    pub fn update_joint(
        &self,
        index: usize,
        signal: ConditionedSignal,
        actuation: &mut impl Actuation,
    ) -> Option<JointCommand> {
        let id = ActuatorId::Joint(index);
        match joint_command(signal, self.limits) {
            Some(cmd) => {
                debug!(
                    "Joint {} -> {} deg at {} deg/s",
                    index, cmd.target_angle, cmd.ramp_speed
                );
                actuation.ramp_to(id, cmd.target_angle, cmd.ramp_speed);
                Some(cmd)
            }
            None => {
                actuation.halt(id);
                if !self.any_moving(&*actuation) {
                    actuation.stop_all();
                }
                None
            }
        }
    }

    fn any_moving(&self, actuation: &impl Actuation) -> bool {
        (0..self.joints.len()).any(|i| actuation.is_ramping(ActuatorId::Joint(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ActuationEvent;
    use crate::sim::RecordingActuation;

    fn cmd(raw: u16) -> Option<JointCommand> {
        joint_command(ConditionedSignal::from_raw(raw), JointLimits::default())
    }

    fn all_enabled() -> ArmController {
        let joints = [1, 2, 4]
            .into_iter()
            .map(|channel| JointConfig {
                channel,
                enabled: true,
            })
            .collect();
        ArmController::new(joints, JointLimits::default())
    }

    #[test]
    fn test_full_deflection() {
        assert_eq!(
            cmd(1000),
            Some(JointCommand {
                target_angle: 20,
                ramp_speed: 160
            })
        );
        assert_eq!(
            cmd(2000),
            Some(JointCommand {
                target_angle: 160,
                ramp_speed: 160
            })
        );
    }

    #[test]
    fn test_near_centre_speeds() {
        // Just outside the deadband on either side
        assert_eq!(cmd(1450).unwrap().ramp_speed, 16);
        assert_eq!(cmd(1449).unwrap().ramp_speed, 17);
        assert_eq!(cmd(1550).unwrap().ramp_speed, 16);
        assert_eq!(cmd(1775).unwrap().ramp_speed, 88);
    }

    #[test]
    fn test_speed_floor() {
        let limits = JointLimits {
            min_angle: 0,
            max_angle: 2,
        };
        // 1550 maps to 0 with such a short travel
        let c = joint_command(ConditionedSignal::from_raw(1550), limits).unwrap();
        assert_eq!(c.ramp_speed, MIN_RAMP_SPEED);
    }

    #[test]
    fn test_centred_is_none() {
        assert_eq!(cmd(1500), None);
        assert_eq!(cmd(1510), None);
        assert_eq!(cmd(0), None);
    }

    #[test]
    fn test_update_joint_ramps() {
        let arm = all_enabled();
        let mut bench = RecordingActuation::new();
        arm.update_joint(0, ConditionedSignal::from_raw(2000), &mut bench);
        assert!(bench.is_ramping(ActuatorId::Joint(0)));
        assert_eq!(
            bench.events(),
            vec![ActuationEvent::Ramp {
                id: ActuatorId::Joint(0),
                target_deg: 160,
                speed_dps: 160
            }]
        );
    }

    #[test]
    fn test_centre_stops_all_when_nothing_moves() {
        let arm = all_enabled();
        let mut bench = RecordingActuation::new();
        arm.update_joint(0, ConditionedSignal::from_raw(1800), &mut bench);
        bench.take_events();

        arm.update_joint(0, ConditionedSignal::NEUTRAL, &mut bench);
        assert_eq!(
            bench.take_events(),
            vec![
                ActuationEvent::Halt {
                    id: ActuatorId::Joint(0)
                },
                ActuationEvent::StopAll
            ]
        );
        assert!(!bench.is_ramping(ActuatorId::Joint(0)));
    }

    #[test]
    fn test_centre_does_not_stop_other_moving_joint() {
        let arm = all_enabled();
        let mut bench = RecordingActuation::new();
        arm.update_joint(1, ConditionedSignal::from_raw(1200), &mut bench);
        bench.take_events();

        arm.update_joint(0, ConditionedSignal::NEUTRAL, &mut bench);
        assert_eq!(
            bench.take_events(),
            vec![ActuationEvent::Halt {
                id: ActuatorId::Joint(0)
            }]
        );
        assert!(bench.is_ramping(ActuatorId::Joint(1)));
    }

    #[test]
    fn test_update_skips_disabled_joints() {
        let arm = ArmController::new(
            vec![
                JointConfig {
                    channel: 1,
                    enabled: true,
                },
                JointConfig {
                    channel: 2,
                    enabled: false,
                },
            ],
            JointLimits::default(),
        );
        let mut bench = RecordingActuation::new();
        let signals = [
            ConditionedSignal::from_raw(1700),
            ConditionedSignal::from_raw(1200),
        ];
        arm.update(&signals, &mut bench);
        assert!(bench.is_ramping(ActuatorId::Joint(0)));
        assert!(!bench.is_ramping(ActuatorId::Joint(1)));
        assert_eq!(bench.events().len(), 1);
    }
}
