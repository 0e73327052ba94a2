//! Operating modes and the button state machine.

mod machine;
mod state;

pub use machine::{Button, Command, ModeMachine, Outcome, UnknownButton};
pub use state::{Mode, ModeState, SettingsItem, THRESHOLD_MAX_C, THRESHOLD_MIN_C};
