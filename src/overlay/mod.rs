//! On-screen text: banners and the per-mode HUD.

pub mod font;
mod notifications;
mod renderer;

pub use notifications::{Notification, NotificationQueue, DEFAULT_TIMEOUT, QUEUE_CAPACITY};
pub use renderer::{hud_lines, OverlayRenderer, Readout};
