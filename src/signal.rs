// Signal conditioning for raw receiver pulses
//
// Raw pulse widths are noisy: receivers jitter around neutral and glitch outside
// the nominal range. Everything downstream works on a ConditionedSignal, which
// can only hold 0, exactly 1500, or a value in [1000,1450]∪[1550,2000].

use crate::config::{DEADBAND_HIGH, DEADBAND_LOW, PULSE_MAX, PULSE_MIN, PULSE_NEUTRAL, PULSE_NONE};

/// Raw pulse width in microseconds, 0 when nothing was measured
pub type PulseSignal = u16;

/// Filter a raw pulse into its canonical value
pub fn condition(raw: PulseSignal) -> PulseSignal {
    match raw {
        PULSE_NONE => PULSE_NONE,
        r if r < PULSE_MIN => PULSE_MIN,
        r if r > PULSE_MAX => PULSE_MAX,
        r if r > DEADBAND_LOW && r < DEADBAND_HIGH => PULSE_NEUTRAL,
        r => r,
    }
}

/// Which side of neutral a conditioned signal sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deflection {
    /// No signal or exactly neutral
    Neutral,
    /// Below neutral (reverse / left / toward min)
    Low(u16),
    /// Above neutral (forward / right / toward max)
    High(u16),
}

/// A pulse that has been through [`condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionedSignal(PulseSignal);

impl ConditionedSignal {
    pub const NEUTRAL: Self = Self(PULSE_NEUTRAL);

    pub fn from_raw(raw: PulseSignal) -> Self {
        Self(condition(raw))
    }

    pub fn get(self) -> PulseSignal {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == PULSE_NONE
    }

    pub fn deflection(self) -> Deflection {
        match self.0 {
            PULSE_NONE | PULSE_NEUTRAL => Deflection::Neutral,
            s if s < PULSE_NEUTRAL => Deflection::Low(s),
            s => Deflection::High(s),
        }
    }
}

/// Integer linear re-map with truncation toward zero (same as the Arduino `map`)
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}
