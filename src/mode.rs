// Operating mode and how the runtime learns about mode changes
//
// The mode switch detector lives outside the control core. Instead of calling
// back into the core, it publishes the current mode; the runtime polls once at
// the top of every cycle so a cycle never straddles two modes.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Propulsion plus crab steering
    #[default]
    DriveNormal,
    /// Recognised but inert: drive actuators are left untouched
    DriveSpin,
    /// Robotic arm joints
    Arm,
}

impl OperatingMode {
    pub fn is_drive(self) -> bool {
        matches!(self, Self::DriveNormal | Self::DriveSpin)
    }
}

/// Source of the current operating mode
pub trait ModeSelector {
    /// Return the new mode if it changed since the last poll
    fn poll_change(&mut self) -> Option<OperatingMode>;

    fn current(&self) -> OperatingMode;
}

/// Mode selector fed by a `watch` channel from the switch detector task
pub struct WatchModeSelector {
    rx: watch::Receiver<OperatingMode>,
}

impl WatchModeSelector {
    pub fn new(rx: watch::Receiver<OperatingMode>) -> Self {
        Self { rx }
    }

    /// Create a sender/selector pair starting in `initial`
    pub fn channel(initial: OperatingMode) -> (watch::Sender<OperatingMode>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self::new(rx))
    }
}

impl ModeSelector for WatchModeSelector {
    fn poll_change(&mut self) -> Option<OperatingMode> {
        // A closed sender keeps the last published mode
        match self.rx.has_changed() {
            Ok(true) => Some(*self.rx.borrow_and_update()),
            _ => None,
        }
    }

    fn current(&self) -> OperatingMode {
        *self.rx.borrow()
    }
}

/// A mode that never changes
#[derive(Debug, Clone, Copy)]
pub struct FixedMode(pub OperatingMode);

impl ModeSelector for FixedMode {
    fn poll_change(&mut self) -> Option<OperatingMode> {
        None
    }

    fn current(&self) -> OperatingMode {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_selector_reports_each_change_once() {
        let (tx, mut selector) = WatchModeSelector::channel(OperatingMode::DriveNormal);
        assert_eq!(selector.poll_change(), None);
        assert_eq!(selector.current(), OperatingMode::DriveNormal);

        tx.send(OperatingMode::Arm).unwrap();
        assert_eq!(selector.poll_change(), Some(OperatingMode::Arm));
        assert_eq!(selector.poll_change(), None);
        assert_eq!(selector.current(), OperatingMode::Arm);
    }

    #[test]
    fn test_watch_selector_keeps_latest_of_several_changes() {
        let (tx, mut selector) = WatchModeSelector::channel(OperatingMode::DriveNormal);
        tx.send(OperatingMode::Arm).unwrap();
        tx.send(OperatingMode::DriveSpin).unwrap();
        assert_eq!(selector.poll_change(), Some(OperatingMode::DriveSpin));
    }

    #[test]
    fn test_dropped_sender_keeps_last_mode() {
        let (tx, mut selector) = WatchModeSelector::channel(OperatingMode::Arm);
        drop(tx);
        assert_eq!(selector.poll_change(), None);
        assert_eq!(selector.current(), OperatingMode::Arm);
    }

    #[test]
    fn test_mode_serde_names() {
        let json = serde_json::to_string(&OperatingMode::DriveSpin).unwrap();
        assert_eq!(json, "\"drive_spin\"");
        let mode: OperatingMode = serde_json::from_str("\"arm\"").unwrap();
        assert_eq!(mode, OperatingMode::Arm);
        assert!(OperatingMode::DriveSpin.is_drive());
        assert!(!OperatingMode::Arm.is_drive());
    }
}
