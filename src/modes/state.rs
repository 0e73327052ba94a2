//! Operating-mode state shared with the processing stages.

use crate::config::Config;
use crate::processing::{Comparator, Palette, TemperatureUnit};

/// Lowest threshold the buttons can reach, in Celsius.
pub const THRESHOLD_MIN_C: f32 = -20.0;
/// Highest threshold the buttons can reach, in Celsius.
pub const THRESHOLD_MAX_C: f32 = 120.0;

/// Operating modes in MODE-button order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Live,
    Palette,
    Ffc,
    HotCold,
    Settings,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Self::Live,
        Self::Palette,
        Self::Ffc,
        Self::HotCold,
        Self::Settings,
    ];

    /// Next mode in the cycle, wrapping from Settings to Live.
    pub fn next(&self) -> Self {
        match self {
            Self::Live => Self::Palette,
            Self::Palette => Self::Ffc,
            Self::Ffc => Self::HotCold,
            Self::HotCold => Self::Settings,
            Self::Settings => Self::Live,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Live => "Live",
            Self::Palette => "Palette",
            Self::Ffc => "FFC",
            Self::HotCold => "Hot/Cold",
            Self::Settings => "Settings",
        }
    }
}

/// Entries of the Settings menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsItem {
    ToggleAel,
    Units,
    CycleHighlight,
    ResetThreshold,
}

impl SettingsItem {
    pub const ALL: [SettingsItem; 4] = [
        Self::ToggleAel,
        Self::Units,
        Self::CycleHighlight,
        Self::ResetThreshold,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ToggleAel => "Toggle AEL",
            Self::Units => "Units",
            Self::CycleHighlight => "Cycle Highlight",
            Self::ResetThreshold => "Reset Threshold",
        }
    }

    fn position(&self) -> usize {
        *self as usize
    }

    /// Cursor after pressing UP. `None` is the resting slot above the list.
    pub fn cursor_up(cursor: Option<Self>) -> Option<Self> {
        match cursor {
            None => Some(Self::ALL[0]),
            Some(item) => Self::ALL.get(item.position() + 1).copied(),
        }
    }

    /// Cursor after pressing DOWN.
    pub fn cursor_down(cursor: Option<Self>) -> Option<Self> {
        match cursor {
            None => Self::ALL.last().copied(),
            Some(item) => item.position().checked_sub(1).map(|i| Self::ALL[i]),
        }
    }
}

/// Everything the buttons can change.
///
/// The threshold is held in Celsius; the unit only affects how it is
/// shown and how far one button press moves it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeState {
    pub mode: Mode,
    pub threshold_c: f32,
    pub comparator: Comparator,
    pub palette: Palette,
    pub unit: TemperatureUnit,
    pub exposure_lock: bool,
    /// Highlighted Settings entry; `None` rests above the list.
    pub cursor: Option<SettingsItem>,
    pub default_threshold_c: f32,
    pub default_threshold_f: f32,
}

impl Default for ModeState {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ModeState {
    /// Restores persisted settings. The mode always starts at Live.
    pub fn from_config(config: &Config) -> Self {
        Self {
            mode: Mode::Live,
            threshold_c: config
                .threshold_c
                .clamp(THRESHOLD_MIN_C, THRESHOLD_MAX_C),
            comparator: config.threshold_mode,
            palette: Palette::wrapping(config.palette_index),
            unit: config.temperature_unit,
            exposure_lock: config.auto_exposure_lock,
            cursor: None,
            default_threshold_c: config.default_threshold_c,
            default_threshold_f: config.default_threshold_f,
        }
    }

    /// Copies the persisted fields back into `config`.
    pub fn store_into(&self, config: &mut Config) {
        config.palette_index = self.palette.index();
        config.threshold_c = self.threshold_c;
        config.threshold_mode = self.comparator;
        config.auto_exposure_lock = self.exposure_lock;
        config.temperature_unit = self.unit;
        config.default_threshold_c = self.default_threshold_c;
        config.default_threshold_f = self.default_threshold_f;
    }

    /// Threshold in the display unit.
    pub fn threshold_display(&self) -> f32 {
        self.unit.from_celsius(self.threshold_c)
    }

    /// Moves the threshold by `steps` display-unit steps, clamped.
    pub fn adjust_threshold(&mut self, steps: f32) {
        let display = self.threshold_display() + steps * self.unit.step();
        self.threshold_c = self
            .unit
            .to_celsius(display)
            .clamp(THRESHOLD_MIN_C, THRESHOLD_MAX_C);
    }

    /// Resets the threshold to the default for the current unit.
    pub fn reset_threshold(&mut self) {
        self.threshold_c = match self.unit {
            TemperatureUnit::Celsius => self.default_threshold_c,
            TemperatureUnit::Fahrenheit => self.unit.to_celsius(self.default_threshold_f),
        };
    }

    /// Formats a Celsius value in the display unit, e.g. `30.5°C`.
    pub fn format_temp(&self, celsius: f32) -> String {
        format!("{:.1}°{}", self.unit.from_celsius(celsius), self.unit.symbol())
    }

    /// Formats a Celsius difference in the display unit.
    pub fn format_delta(&self, delta_c: f32) -> String {
        format!("{:.1}°{}", self.unit.delta_from_celsius(delta_c), self.unit.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        let mut mode = Mode::Live;
        for _ in 0..5 {
            mode = mode.next();
        }
        assert_eq!(mode, Mode::Live);
    }

    #[test]
    fn test_cursor_walks_through_rest_slot() {
        let mut cursor = None;
        let mut seen = Vec::new();
        for _ in 0..5 {
            cursor = SettingsItem::cursor_up(cursor);
            seen.push(cursor);
        }
        assert_eq!(
            seen,
            vec![
                Some(SettingsItem::ToggleAel),
                Some(SettingsItem::Units),
                Some(SettingsItem::CycleHighlight),
                Some(SettingsItem::ResetThreshold),
                None,
            ]
        );
        assert_eq!(SettingsItem::cursor_down(None), Some(SettingsItem::ResetThreshold));
        assert_eq!(SettingsItem::cursor_down(Some(SettingsItem::ToggleAel)), None);
    }

    #[test]
    fn test_threshold_clamped() {
        let mut state = ModeState {
            threshold_c: 119.8,
            ..Default::default()
        };
        state.adjust_threshold(1.0);
        assert_eq!(state.threshold_c, THRESHOLD_MAX_C);
    }

    #[test]
    fn test_fahrenheit_step_converts_internally() {
        let mut state = ModeState {
            unit: TemperatureUnit::Fahrenheit,
            ..Default::default()
        };
        let before = state.threshold_c;
        state.adjust_threshold(1.0);
        assert!((state.threshold_c - (before + 5.0 / 9.0)).abs() < 1e-4);
    }

    #[test]
    fn test_reset_threshold_respects_unit() {
        let mut state = ModeState {
            unit: TemperatureUnit::Fahrenheit,
            default_threshold_f: 95.0,
            threshold_c: 10.0,
            ..Default::default()
        };
        state.reset_threshold();
        assert!((state.threshold_display() - 95.0).abs() < 1e-4);
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config {
            palette_index: 21,
            threshold_c: 42.5,
            threshold_mode: Comparator::Less,
            auto_exposure_lock: true,
            temperature_unit: TemperatureUnit::Fahrenheit,
            ..Default::default()
        };
        let state = ModeState::from_config(&config);
        assert_eq!(state.palette, Palette::Turbo);

        let mut out = Config::default();
        state.store_into(&mut out);
        assert_eq!(out.palette_index, 21);
        assert_eq!(out.threshold_c, 42.5);
        assert_eq!(out.threshold_mode, Comparator::Less);
        assert!(out.auto_exposure_lock);
    }
}
