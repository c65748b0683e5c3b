// Pulse-width measurement interface
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::signal::PulseSignal;

/// Longest a single measurement may block before reporting 0
pub const MEASURE_TIMEOUT: Duration = Duration::from_millis(100);

/// Receiver channel, numbered from 1 like the transmitter labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Channel(pub u8);

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.0)
    }
}

/// Measures the high time of one receiver channel.
///
/// Implementations block for at most [`MEASURE_TIMEOUT`] and return 0 when no
/// pulse arrived in that window.
pub trait PulseSource {
    fn measure(&mut self, channel: Channel) -> PulseSignal;
}
