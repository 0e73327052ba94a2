//! Frame presentation: orientation and display sinks.

mod orientation;
mod sink;

pub use orientation::{InvalidRotation, Orientation, Rotation};
pub use sink::{rgb565, FrameSink, FramebufferSink, NullSink, SinkError};
