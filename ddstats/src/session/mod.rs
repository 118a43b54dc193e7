//! Session tracking
//!
//! - [`status`]: coarse status derivation and its mappings
//! - [`recording`]: the accumulated per-second recording
//! - [`machine`]: edge detection and the recording lifecycle

pub mod machine;
pub mod recording;
pub mod status;

pub use machine::{RecordingState, SessionEvent, SessionMachine, SessionSnapshot};
pub use recording::SessionRecording;
pub use status::{derive_status, CoarseStatus, ReplaySource};
