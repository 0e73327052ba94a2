//! Per-frame processing stages.
//!
//! Temperature conversion feeds three pure stages: palette mapping,
//! threshold highlighting, and hot/cold spot detection. The mode machine
//! decides which of them run for a given frame.

mod hotspots;
mod palette;
mod temperature;
mod threshold;

pub use hotspots::{
    extrema, HotColdDetector, HotColdReport, Spot, COLD_SPOT_COLOR, HOT_SPOT_COLOR,
};
pub use palette::{Palette, PALETTE_COUNT};
pub use temperature::{
    CalibratedFrame, Conversion, LinearModel, TempRange, TemperatureConverter, TemperatureUnit,
};
pub use threshold::{
    highlight, mask_from_indices, tint, Comparator, ThresholdMatch, EQUALITY_EPSILON_C,
};
