//! HUD and banner compositing.

use super::font;
use crate::calibration::FfcState;
use crate::modes::{Mode, ModeState, SettingsItem};
use crate::processing::{
    Comparator, HotColdReport, Spot, ThresholdMatch, COLD_SPOT_COLOR, HOT_SPOT_COLOR,
};
use image::{Rgb, RgbImage};

const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const MARGIN: u32 = 2;
const PADDING: u32 = 2;
/// Fraction of the underlying color kept behind text.
const BACKING_KEEP: f32 = 0.3;

/// Mode-specific data the HUD reports on.
#[derive(Debug, Clone, Copy)]
pub enum Readout<'a> {
    None,
    /// Scene minimum and maximum, labelled where they sit.
    Extrema { min: Spot, max: Spot },
    Threshold {
        matched: &'a ThresholdMatch,
        extrema: Option<(Spot, Spot)>,
    },
    HotCold(&'a HotColdReport),
    Calibration { state: &'a FfcState, total: usize },
}

/// Draws the per-mode HUD and the current banner onto processed frames.
#[derive(Debug, Clone, Copy)]
pub struct OverlayRenderer {
    scale: u32,
}

impl OverlayRenderer {
    pub fn new() -> Self {
        Self::with_scale(2)
    }

    pub fn with_scale(scale: u32) -> Self {
        Self {
            scale: scale.max(1),
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Composites the HUD for `state` and an optional banner in place.
    pub fn render(
        &self,
        image: &mut RgbImage,
        state: &ModeState,
        readout: Readout<'_>,
        banner: Option<&str>,
    ) {
        match readout {
            Readout::HotCold(report) => {
                self.mark(image, &report.max, "H", HOT_SPOT_COLOR);
                self.mark(image, &report.min, "C", COLD_SPOT_COLOR);
            }
            Readout::Extrema { min, max }
            | Readout::Threshold {
                extrema: Some((min, max)),
                ..
            } => {
                self.label(image, &max, &format!("MAX {}", state.format_temp(max.celsius)));
                self.label(image, &min, &format!("MIN {}", state.format_temp(min.celsius)));
            }
            _ => {}
        }

        let lines = hud_lines(state, readout);
        if !lines.is_empty() {
            self.draw_block(image, &lines, Anchor::BottomRight);
        }
        if let Some(text) = banner {
            self.draw_block(image, &[text.to_string()], Anchor::TopLeft);
        }
    }

    fn draw_block(&self, image: &mut RgbImage, lines: &[String], anchor: Anchor) {
        let (width, height) = image.dimensions();
        let line_step = font::line_height(self.scale) + self.scale;
        let block_w = lines
            .iter()
            .map(|l| font::text_width(l, self.scale))
            .max()
            .unwrap_or(0)
            + 2 * PADDING;
        let block_h = lines.len() as u32 * line_step - self.scale + 2 * PADDING;

        let (x0, y0) = match anchor {
            Anchor::TopLeft => (MARGIN, MARGIN),
            Anchor::BottomRight => (
                width.saturating_sub(block_w + MARGIN),
                height.saturating_sub(block_h + MARGIN),
            ),
        };

        darken(image, x0, y0, block_w, block_h);
        for (i, line) in lines.iter().enumerate() {
            let y = y0 + PADDING + i as u32 * line_step;
            font::draw_text(image, x0 + PADDING, y, line, TEXT_COLOR, self.scale);
        }
    }

    fn mark(&self, image: &mut RgbImage, spot: &Spot, label: &str, color: [u8; 3]) {
        let (width, height) = image.dimensions();
        let (cx, cy) = (spot.x as i64, spot.y as i64);
        for d in -2i64..=2 {
            for (px, py) in [(cx + d, cy), (cx, cy + d)] {
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    image.put_pixel(px as u32, py as u32, Rgb(color));
                }
            }
        }
        // Label to the right of the cross, flipped left near the edge.
        let label_w = font::text_width(label, self.scale);
        let lx = if spot.x + 4 + label_w < width {
            spot.x + 4
        } else {
            spot.x.saturating_sub(4 + label_w)
        };
        let ly = spot.y.saturating_sub(font::line_height(self.scale) / 2);
        font::draw_text(image, lx, ly, label, color, self.scale);
    }

    /// Writes `text` at the pixel, pulled back inside the frame.
    fn label(&self, image: &mut RgbImage, spot: &Spot, text: &str) {
        let (width, height) = image.dimensions();
        let text_w = font::text_width(text, self.scale);
        let text_h = font::line_height(self.scale);
        let x = spot.x.min(width.saturating_sub(text_w));
        let y = spot.y.min(height.saturating_sub(text_h));
        font::draw_text(image, x, y, text, TEXT_COLOR, self.scale);
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum Anchor {
    TopLeft,
    BottomRight,
}

fn darken(image: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32) {
    let (width, height) = image.dimensions();
    for y in y0..(y0 + h).min(height) {
        for x in x0..(x0 + w).min(width) {
            let px = image.get_pixel_mut(x, y);
            for c in px.0.iter_mut() {
                *c = (*c as f32 * BACKING_KEEP) as u8;
            }
        }
    }
}

/// HUD text for the active mode, top line first.
///
/// The first two lines always name the mode and the palette.
pub fn hud_lines(state: &ModeState, readout: Readout<'_>) -> Vec<String> {
    let mut lines = vec![
        format!("{} Mode", state.mode.name()),
        format!("Palette {}", state.palette.name()),
    ];
    match state.mode {
        Mode::Live => {
            lines.push(format!(
                "Target {} {}",
                state.format_temp(state.threshold_c),
                state.comparator.symbol()
            ));
            if let Readout::Threshold { matched, .. } = readout {
                let peak = match state.comparator {
                    Comparator::Less => matched.coldest,
                    _ => matched.hottest,
                };
                if let Some(spot) = peak {
                    lines.push(format!("Peak {}", state.format_temp(spot.celsius)));
                }
            }
            if state.exposure_lock {
                lines.push("AEL".to_string());
            }
        }
        Mode::Palette => lines.push("UP/DOWN palette".to_string()),
        Mode::Ffc => match readout {
            Readout::Calibration { state: ffc, total } => match ffc {
                FfcState::Idle => {
                    lines.push("Cover lens".to_string());
                    lines.push("UP to capture".to_string());
                }
                FfcState::Capturing { captured } => {
                    lines.push(format!("Capturing frame {}/{}", captured, total))
                }
                FfcState::Averaging => lines.push("Averaging".to_string()),
                FfcState::Saved { .. } => lines.push("FFC saved".to_string()),
                FfcState::Failed { .. } => lines.push("FFC failed".to_string()),
            },
            _ => {}
        },
        Mode::HotCold => {
            if let Readout::HotCold(report) = readout {
                lines.push(format!("Max {}", state.format_temp(report.max.celsius)));
                lines.push(format!("Min {}", state.format_temp(report.min.celsius)));
                lines.push(format!("Delta {}", state.format_delta(report.delta_celsius())));
            }
        }
        Mode::Settings => {
            let marker = |selected: bool| if selected { ">" } else { " " };
            lines.push(format!("{}Next mode", marker(state.cursor.is_none())));
            for item in SettingsItem::ALL {
                let value = match item {
                    SettingsItem::ToggleAel => {
                        (if state.exposure_lock { "ON" } else { "OFF" }).to_string()
                    }
                    SettingsItem::Units => state.unit.symbol().to_string(),
                    SettingsItem::CycleHighlight => state.comparator.symbol().to_string(),
                    SettingsItem::ResetThreshold => String::new(),
                };
                let label = if value.is_empty() {
                    item.label().to_string()
                } else {
                    format!("{} {}", item.label(), value)
                };
                lines.push(format!("{}{}", marker(state.cursor == Some(item)), label));
            }
        }
    }
    lines
}
