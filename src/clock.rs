// Blocking holds used by timed actuation sequences
use std::time::Duration;

/// Something that can block the control cycle for a fixed time
pub trait Clock {
    fn hold(&mut self, duration: Duration);
}

/// Wall clock: really sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn hold(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
