// Pulse domain constants, timing, channel wiring and the loadable runtime config
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// Bench loop frequency (hardware loop is paced by pulse measurement)
pub const LOOP_HZ: u64 = 50;

// Receiver pulse domain, microseconds
pub const PULSE_NONE: u16 = 0; // no signal this cycle
pub const PULSE_MIN: u16 = 1000;
pub const PULSE_NEUTRAL: u16 = 1500;
pub const PULSE_MAX: u16 = 2000;

// Open interval collapsed to PULSE_NEUTRAL
pub const DEADBAND_LOW: u16 = 1450;
pub const DEADBAND_HIGH: u16 = 1550;

// Guarded reversal holds (ESC reverse unlock)
pub const REVERSAL_HOLD: Duration = Duration::from_millis(200);
pub const NEUTRAL_HOLD: Duration = Duration::from_millis(200);

// Arm joint travel, degrees
pub const MIN_ANGLE: u16 = 20;
pub const MAX_ANGLE: u16 = 160;

// Receiver channel wiring
pub const STEER_CHANNEL: u8 = 1;
pub const MOTOR_CHANNEL: u8 = 2;
pub const JOINT_CHANNELS: [u8; 3] = [1, 2, 4];

/// Errors raised while loading or validating a [`RuntimeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Travel limits shared by all arm joints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointLimits {
    pub min_angle: u16,
    pub max_angle: u16,
}

impl Default for JointLimits {
    fn default() -> Self {
        Self {
            min_angle: MIN_ANGLE,
            max_angle: MAX_ANGLE,
        }
    }
}

/// One arm joint and the receiver channel that commands it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointConfig {
    pub channel: u8,
    /// Disabled joints are still measured but never driven
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Runtime configuration. Every field has a default, so a partial JSON file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub loop_hz: u64,
    pub steer_channel: u8,
    pub motor_channel: u8,
    pub reversal_hold_ms: u64,
    pub neutral_hold_ms: u64,
    pub joint_limits: JointLimits,
    pub joints: Vec<JointConfig>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        // Only the first joint is wired by default
        let joints = JOINT_CHANNELS
            .iter()
            .enumerate()
            .map(|(i, &channel)| JointConfig {
                channel,
                enabled: i == 0,
            })
            .collect();

        Self {
            loop_hz: LOOP_HZ,
            steer_channel: STEER_CHANNEL,
            motor_channel: MOTOR_CHANNEL,
            reversal_hold_ms: REVERSAL_HOLD.as_millis() as u64,
            neutral_hold_ms: NEUTRAL_HOLD.as_millis() as u64,
            joint_limits: JointLimits::default(),
            joints,
        }
    }
}

impl RuntimeConfig {
    /// Load a JSON config file and validate it
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loop_hz == 0 {
            return Err(ConfigError::Invalid("loop_hz must be non-zero".into()));
        }
        if self.steer_channel == 0 || self.motor_channel == 0 {
            return Err(ConfigError::Invalid(
                "drive channels are numbered from 1".into(),
            ));
        }
        if self.joints.is_empty() {
            return Err(ConfigError::Invalid("at least one joint is required".into()));
        }
        if let Some(joint) = self.joints.iter().find(|j| j.channel == 0) {
            return Err(ConfigError::Invalid(format!(
                "joint channel {} is out of range",
                joint.channel
            )));
        }
        let limits = self.joint_limits;
        if limits.min_angle >= limits.max_angle {
            return Err(ConfigError::Invalid(format!(
                "min_angle {} must be below max_angle {}",
                limits.min_angle, limits.max_angle
            )));
        }
        Ok(())
    }

    pub fn reversal_hold(&self) -> Duration {
        Duration::from_millis(self.reversal_hold_ms)
    }

    pub fn neutral_hold(&self) -> Duration {
        Duration::from_millis(self.neutral_hold_ms)
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(1000 / self.loop_hz.max(1))
    }
}
