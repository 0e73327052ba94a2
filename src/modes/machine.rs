//! Button-driven mode transitions.

use super::{Mode, ModeState, SettingsItem};
use crate::processing::{Palette, PALETTE_COUNT};
use std::str::FromStr;
use thiserror::Error;

/// A debounced button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Mode,
    Up,
    Down,
}

#[derive(Debug, Clone, Error)]
#[error("unknown button: {0}")]
pub struct UnknownButton(String);

impl FromStr for Button {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" | "mode" => Ok(Self::Mode),
            "u" | "up" => Ok(Self::Up),
            "d" | "down" => Ok(Self::Down),
            other => Err(UnknownButton(other.to_string())),
        }
    }
}

/// Side effect the orchestrator must carry out after a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartCalibration,
}

/// Result of handling one button press.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    /// Banner text to enqueue.
    pub notification: Option<String>,
    /// Persisted settings changed and the config should be saved.
    pub persist: bool,
    pub command: Option<Command>,
    /// The active mode changed.
    pub mode_changed: bool,
}

impl Outcome {
    fn ignored() -> Self {
        Self::default()
    }

    fn changed(message: impl Into<String>) -> Self {
        Self {
            notification: Some(message.into()),
            persist: true,
            ..Self::default()
        }
    }
}

/// Owns the mode state and applies button presses to it.
#[derive(Debug, Clone)]
pub struct ModeMachine {
    state: ModeState,
    /// Mode to return to when a flat-field capture ends.
    before_ffc: Mode,
}

impl ModeMachine {
    pub fn new(state: ModeState) -> Self {
        Self {
            before_ffc: state.mode,
            state,
        }
    }

    pub fn state(&self) -> &ModeState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Applies one press. `calibrating` is true while a flat-field
    /// capture is running; every button is ignored in FFC mode then.
    pub fn handle(&mut self, button: Button, calibrating: bool) -> Outcome {
        let outcome = match (self.state.mode, button) {
            (Mode::Ffc, _) if calibrating => Outcome::ignored(),

            (Mode::Live, Button::Mode)
            | (Mode::Palette, Button::Mode)
            | (Mode::Ffc, Button::Mode)
            | (Mode::HotCold, Button::Mode) => self.advance(),

            (Mode::Live, Button::Up) => self.nudge_threshold(1.0),
            (Mode::Live, Button::Down) => self.nudge_threshold(-1.0),

            (Mode::Palette, Button::Up) => self.step_palette(1),
            (Mode::Palette, Button::Down) => self.step_palette(PALETTE_COUNT - 1),

            (Mode::Ffc, Button::Up) => Outcome {
                notification: Some("Capturing flat field...".to_string()),
                command: Some(Command::StartCalibration),
                ..Outcome::default()
            },
            (Mode::Ffc, Button::Down) => Outcome::ignored(),

            (Mode::HotCold, Button::Up) | (Mode::HotCold, Button::Down) => Outcome::ignored(),

            (Mode::Settings, Button::Up) => {
                self.state.cursor = SettingsItem::cursor_up(self.state.cursor);
                Outcome::ignored()
            }
            (Mode::Settings, Button::Down) => {
                self.state.cursor = SettingsItem::cursor_down(self.state.cursor);
                Outcome::ignored()
            }
            (Mode::Settings, Button::Mode) => match self.state.cursor {
                None => self.advance(),
                Some(item) => self.activate(item),
            },
        };

        tracing::debug!(
            ?button,
            mode = self.state.mode.name(),
            persist = outcome.persist,
            "Button handled"
        );
        outcome
    }

    /// Jumps straight to FFC mode, as for a capture requested at startup.
    pub fn enter_calibration(&mut self) {
        if self.state.mode != Mode::Ffc {
            self.enter(Mode::Ffc);
        }
    }

    /// Leaves FFC mode after a capture reaches a terminal state.
    pub fn finish_calibration(&mut self) {
        if self.state.mode == Mode::Ffc {
            self.enter(self.before_ffc);
        }
    }

    fn advance(&mut self) -> Outcome {
        let next = self.state.mode.next();
        self.enter(next);
        Outcome {
            notification: Some(format!("{} Mode", next.name())),
            mode_changed: true,
            ..Outcome::default()
        }
    }

    fn enter(&mut self, mode: Mode) {
        if mode == Mode::Ffc {
            self.before_ffc = self.state.mode;
        }
        if mode == Mode::Settings {
            self.state.cursor = None;
        }
        tracing::info!(from = self.state.mode.name(), to = mode.name(), "Mode changed");
        self.state.mode = mode;
    }

    fn nudge_threshold(&mut self, steps: f32) -> Outcome {
        self.state.adjust_threshold(steps);
        Outcome::changed(format!(
            "Threshold {} ({})",
            self.state.format_temp(self.state.threshold_c),
            self.state.comparator.symbol()
        ))
    }

    fn step_palette(&mut self, offset: usize) -> Outcome {
        self.state.palette = Palette::wrapping(self.state.palette.index() + offset);
        Outcome::changed(format!("Palette {}", self.state.palette.name()))
    }

    fn activate(&mut self, item: SettingsItem) -> Outcome {
        let state = &mut self.state;
        match item {
            SettingsItem::ToggleAel => {
                state.exposure_lock = !state.exposure_lock;
                Outcome::changed(if state.exposure_lock { "AEL ON" } else { "AEL OFF" })
            }
            SettingsItem::Units => {
                state.unit = state.unit.toggled();
                Outcome::changed(format!("Units °{}", state.unit.symbol()))
            }
            SettingsItem::CycleHighlight => {
                state.comparator = state.comparator.next();
                Outcome::changed(format!("Highlight {}", state.comparator.symbol()))
            }
            SettingsItem::ResetThreshold => {
                state.reset_threshold();
                Outcome::changed(format!("Threshold {}", state.format_temp(state.threshold_c)))
            }
        }
    }
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new(ModeState::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{Comparator, TemperatureUnit};

    fn press(machine: &mut ModeMachine, button: Button, times: usize) {
        for _ in 0..times {
            machine.handle(button, false);
        }
    }

    #[test]
    fn test_mode_presses_land_on_expected_mode() {
        let cases = [
            (0, Mode::Live),
            (1, Mode::Palette),
            (2, Mode::Ffc),
            (4, Mode::Settings),
            (5, Mode::Live),
            (7, Mode::Ffc),
            (10, Mode::Live),
        ];
        for (presses, expected) in cases {
            let mut machine = ModeMachine::default();
            press(&mut machine, Button::Mode, presses);
            assert_eq!(machine.mode(), expected, "after {presses} presses");
        }
    }

    #[test]
    fn test_mode_change_announced() {
        let mut machine = ModeMachine::default();
        let outcome = machine.handle(Button::Mode, false);
        assert_eq!(outcome.notification.as_deref(), Some("Palette Mode"));
        assert!(outcome.mode_changed);
        assert!(!outcome.persist);
    }

    #[test]
    fn test_live_threshold_steps() {
        let mut machine = ModeMachine::default();
        let outcome = machine.handle(Button::Up, false);
        assert_eq!(machine.state().threshold_c, 30.5);
        assert!(outcome.persist);
        assert_eq!(outcome.notification.as_deref(), Some("Threshold 30.5°C (>)"));

        press(&mut machine, Button::Down, 3);
        assert_eq!(machine.state().threshold_c, 29.0);
    }

    #[test]
    fn test_palette_wraps_both_ways() {
        let mut machine = ModeMachine::default();
        press(&mut machine, Button::Mode, 1);
        assert_eq!(machine.state().palette, Palette::Bone);

        press(&mut machine, Button::Down, 3);
        assert_eq!(machine.state().palette, Palette::Turbo);

        let outcome = machine.handle(Button::Up, false);
        assert_eq!(machine.state().palette, Palette::Gray);
        assert_eq!(outcome.notification.as_deref(), Some("Palette GRAY"));
    }

    #[test]
    fn test_ffc_up_requests_capture_and_busy_ignores_everything() {
        let mut machine = ModeMachine::default();
        press(&mut machine, Button::Mode, 2);

        let outcome = machine.handle(Button::Up, false);
        assert_eq!(outcome.command, Some(Command::StartCalibration));

        for button in [Button::Mode, Button::Up, Button::Down] {
            assert_eq!(machine.handle(button, true), Outcome::default());
        }
        assert_eq!(machine.mode(), Mode::Ffc);
    }

    #[test]
    fn test_finish_calibration_returns_to_previous_mode() {
        let mut machine = ModeMachine::default();
        press(&mut machine, Button::Mode, 2);
        machine.finish_calibration();
        assert_eq!(machine.mode(), Mode::Palette);
    }

    #[test]
    fn test_hot_cold_ignores_up_down() {
        let mut machine = ModeMachine::default();
        press(&mut machine, Button::Mode, 3);
        let before = machine.state().clone();
        assert_eq!(machine.handle(Button::Up, false), Outcome::default());
        assert_eq!(machine.handle(Button::Down, false), Outcome::default());
        assert_eq!(machine.state(), &before);
    }

    #[test]
    fn test_settings_unit_toggle_keeps_celsius_threshold() {
        let mut machine = ModeMachine::new(ModeState {
            threshold_c: 20.0,
            ..ModeState::default()
        });
        press(&mut machine, Button::Mode, 4);
        // Rest -> Toggle AEL -> Units
        press(&mut machine, Button::Up, 2);

        let outcome = machine.handle(Button::Mode, false);
        assert_eq!(machine.state().unit, TemperatureUnit::Fahrenheit);
        assert_eq!(outcome.notification.as_deref(), Some("Units °F"));

        machine.handle(Button::Mode, false);
        assert_eq!(machine.state().unit, TemperatureUnit::Celsius);
        assert_eq!(machine.state().threshold_c, 20.0);
        assert_eq!(machine.mode(), Mode::Settings);
    }

    #[test]
    fn test_settings_items_activate_in_place() {
        let mut machine = ModeMachine::default();
        press(&mut machine, Button::Mode, 4);

        press(&mut machine, Button::Up, 1);
        let outcome = machine.handle(Button::Mode, false);
        assert!(machine.state().exposure_lock);
        assert_eq!(outcome.notification.as_deref(), Some("AEL ON"));

        press(&mut machine, Button::Up, 2);
        machine.handle(Button::Mode, false);
        assert_eq!(machine.state().comparator, Comparator::Less);

        press(&mut machine, Button::Up, 1);
        machine.handle(Button::Mode, false);
        assert_eq!(machine.state().threshold_c, 30.0);
        assert_eq!(machine.mode(), Mode::Settings);
    }

    #[test]
    fn test_settings_cursor_resets_on_entry() {
        let mut machine = ModeMachine::default();
        press(&mut machine, Button::Mode, 4);
        press(&mut machine, Button::Up, 2);
        // Walk the cursor back to rest, then leave.
        press(&mut machine, Button::Down, 2);
        press(&mut machine, Button::Mode, 1);
        assert_eq!(machine.mode(), Mode::Live);

        press(&mut machine, Button::Mode, 4);
        assert_eq!(machine.state().cursor, None);
    }

    #[test]
    fn test_button_parse() {
        assert_eq!("m".parse::<Button>().unwrap(), Button::Mode);
        assert_eq!(" UP ".parse::<Button>().unwrap(), Button::Up);
        assert!("x".parse::<Button>().is_err());
    }
}
