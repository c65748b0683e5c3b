//! Control core for an RC rover with a robotic arm.
//!
//! Raw receiver pulses are conditioned, then either drive the rover (ESC plus
//! four-wheel crab steering) or ease arm joints, depending on the mode switch.
//! Measurement, the mode switch detector and the servo/ESC primitive are
//! traits so the core can run against hardware or the doubles in [`sim`].

pub mod actuation;
pub mod arm;
pub mod clock;
pub mod config;
pub mod messages;
pub mod mode;
pub mod propulsion;
pub mod pulse;
pub mod runtime;
pub mod signal;
pub mod sim;
pub mod steering;

pub use actuation::{Actuation, ActuatorId, Wheel};
pub use config::RuntimeConfig;
pub use mode::{ModeSelector, OperatingMode, WatchModeSelector};
pub use pulse::{Channel, PulseSource};
pub use runtime::Runtime;
pub use signal::{ConditionedSignal, condition};
