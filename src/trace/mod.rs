//! Bounded-window event recording.

mod error;
mod recorder;
pub(crate) mod summary;

pub use error::TraceError;
pub use recorder::{RecordingHandle, StoppedTrace, TraceRecorder};
