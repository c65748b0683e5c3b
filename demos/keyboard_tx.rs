// Keyboard transmitter: drive the control core in real time without a receiver.
//
// A/D steer, W/S throttle, 1/2/3 select drive/spin/arm, Space centres the
// sticks, Q, Esc or Ctrl+C quits. Actuator commands are logged (RUST_LOG=debug
// for all of them).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::info;

use rover_rc_runtime::clock::SystemClock;
use rover_rc_runtime::config::{PULSE_MAX, PULSE_MIN, PULSE_NEUTRAL};
use rover_rc_runtime::signal::PulseSignal;
use rover_rc_runtime::{
    Actuation, ActuatorId, Channel, OperatingMode, PulseSource, Runtime, RuntimeConfig,
    WatchModeSelector,
};

const STICK_STEP: u16 = 100; // us per key press
const CHANNELS: usize = 6;

type Sticks = Arc<Mutex<[PulseSignal; CHANNELS]>>;

/// Reads the shared stick state, waiting one receiver frame per measurement
struct KeyboardPulses {
    sticks: Sticks,
    frame: Duration,
}

impl PulseSource for KeyboardPulses {
    fn measure(&mut self, channel: Channel) -> PulseSignal {
        std::thread::sleep(self.frame);
        let idx = channel.0 as usize;
        match self.sticks.lock() {
            Ok(sticks) if (1..=CHANNELS).contains(&idx) => sticks[idx - 1],
            _ => 0,
        }
    }
}

/// Logs commands instead of driving servos
#[derive(Default)]
struct LoggingActuation {
    ramping: Vec<ActuatorId>,
}

impl Actuation for LoggingActuation {
    fn set_immediate(&mut self, id: ActuatorId, pulse_us: u16) {
        tracing::debug!("{} <- {}us", id, pulse_us);
    }

    fn ramp_to(&mut self, id: ActuatorId, target_deg: u16, speed_dps: u16) {
        if !self.ramping.contains(&id) {
            info!("{} easing to {} deg at {} deg/s", id, target_deg, speed_dps);
            self.ramping.push(id);
        }
    }

    fn is_ramping(&self, id: ActuatorId) -> bool {
        self.ramping.contains(&id)
    }

    fn halt(&mut self, id: ActuatorId) {
        self.ramping.retain(|r| *r != id);
    }

    fn stop_all(&mut self) {
        self.ramping.clear();
    }
}

fn nudge(sticks: &Sticks, channel: u8, delta: i32) {
    if let Ok(mut sticks) = sticks.lock() {
        let slot = &mut sticks[channel as usize - 1];
        let next = (*slot as i32 + delta).clamp(PULSE_MIN as i32, PULSE_MAX as i32);
        *slot = next as u16;
        info!("CH{} = {}us", channel, slot);
    }
}

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Nudge { channel: u8, delta: i32 },
    Centre,
    Mode(OperatingMode),
    Quit,
}

/// Map a key to an action. Modified keys are ignored apart from Ctrl+C, which
/// quits: raw mode swallows SIGINT, so it only ever arrives as a key.
fn key_action(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyAction> {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Some(KeyAction::Quit);
    }
    if !modifiers.is_empty() {
        return None;
    }

    let step = STICK_STEP as i32;
    let action = match code {
        KeyCode::Char('a') => KeyAction::Nudge { channel: 1, delta: -step },
        KeyCode::Char('d') => KeyAction::Nudge { channel: 1, delta: step },
        KeyCode::Char('w') => KeyAction::Nudge { channel: 2, delta: step },
        KeyCode::Char('s') => KeyAction::Nudge { channel: 2, delta: -step },
        KeyCode::Char(' ') => KeyAction::Centre,
        KeyCode::Char('1') => KeyAction::Mode(OperatingMode::DriveNormal),
        KeyCode::Char('2') => KeyAction::Mode(OperatingMode::DriveSpin),
        KeyCode::Char('3') => KeyAction::Mode(OperatingMode::Arm),
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Sets the shutdown flag when dropped, so every exit path stops the control loop
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = RuntimeConfig::default();
    let sticks: Sticks = Arc::new(Mutex::new([PULSE_NEUTRAL; CHANNELS]));
    let shutdown = Arc::new(AtomicBool::new(false));
    let (mode_tx, selector) = WatchModeSelector::channel(OperatingMode::DriveNormal);

    // Fails without a terminal; nothing is running yet
    enable_raw_mode()?;
    let stop = StopOnDrop(Arc::clone(&shutdown));

    // Control loop blocks (measurement, reverse unlock), so it gets its own thread
    let control = {
        let sticks = Arc::clone(&sticks);
        let shutdown = Arc::clone(&shutdown);
        let frame = config.loop_period();
        tokio::task::spawn_blocking(move || {
            let mut runtime = Runtime::new(&config, selector);
            let mut pulses = KeyboardPulses { sticks, frame };
            let mut actuation = LoggingActuation::default();
            runtime.run_blocking(&mut pulses, &mut actuation, &mut SystemClock, &shutdown);
        })
    };

    info!("Controls: A/D steer, W/S throttle, 1/2/3 mode, Space centre, Q/Ctrl+C quit");

    let result = read_keys(&sticks, &mode_tx, &shutdown);
    let restored = disable_raw_mode();

    drop(stop);
    control.await?;
    restored?;
    result
}

fn read_keys(
    sticks: &Sticks,
    mode_tx: &tokio::sync::watch::Sender<OperatingMode>,
    shutdown: &AtomicBool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    while !shutdown.load(Ordering::Relaxed) {
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
            continue;
        }

        match key_action(code, modifiers) {
            Some(KeyAction::Nudge { channel, delta }) => nudge(sticks, channel, delta),
            Some(KeyAction::Centre) => {
                if let Ok(mut sticks) = sticks.lock() {
                    *sticks = [PULSE_NEUTRAL; CHANNELS];
                }
                info!("Sticks centred");
            }
            Some(KeyAction::Mode(mode)) => {
                mode_tx.send_replace(mode);
            }
            Some(KeyAction::Quit) => break,
            None => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctrl_c_quits() {
        assert_eq!(
            key_action(KeyCode::Char('c'), KeyModifiers::CONTROL),
            Some(KeyAction::Quit)
        );
        assert_eq!(key_action(KeyCode::Char('q'), KeyModifiers::NONE), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::Esc, KeyModifiers::NONE), Some(KeyAction::Quit));
        // Plain 'c' is not bound
        assert_eq!(key_action(KeyCode::Char('c'), KeyModifiers::NONE), None);
    }

    #[test]
    fn test_modified_stick_keys_ignored() {
        for key in ['a', 'd', 'w', 's', '1', '3', ' '] {
            assert_eq!(key_action(KeyCode::Char(key), KeyModifiers::CONTROL), None);
            assert_eq!(key_action(KeyCode::Char(key), KeyModifiers::ALT), None);
        }
        assert_eq!(
            key_action(KeyCode::Char('d'), KeyModifiers::NONE),
            Some(KeyAction::Nudge {
                channel: 1,
                delta: 100
            })
        );
        assert_eq!(
            key_action(KeyCode::Char('3'), KeyModifiers::NONE),
            Some(KeyAction::Mode(OperatingMode::Arm))
        );
    }

    #[test]
    fn test_stop_guard_sets_flag_on_early_return() {
        fn bail(flag: &Arc<AtomicBool>) -> Result<(), std::io::Error> {
            let _stop = StopOnDrop(Arc::clone(flag));
            Err(std::io::Error::other("no terminal"))
        }

        let flag = Arc::new(AtomicBool::new(false));
        assert!(bail(&flag).is_err());
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_control_loop_exits_once_guard_drops() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = StopOnDrop(Arc::clone(&shutdown));
        let sticks: Sticks = Arc::new(Mutex::new([PULSE_NEUTRAL; CHANNELS]));

        let control = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || {
                let (_tx, selector) = WatchModeSelector::channel(OperatingMode::DriveNormal);
                let mut runtime = Runtime::new(&RuntimeConfig::default(), selector);
                let mut pulses = KeyboardPulses {
                    sticks,
                    frame: Duration::from_millis(1),
                };
                let mut actuation = LoggingActuation::default();
                runtime.run_blocking(&mut pulses, &mut actuation, &mut SystemClock, &shutdown);
                runtime.cycles()
            })
        };

        std::thread::sleep(Duration::from_millis(20));
        drop(stop);
        let cycles = control.join().unwrap();
        assert!(cycles > 0);
    }
}
