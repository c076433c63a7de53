//! Detector adapter.
//!
//! Wraps the black-box detection model behind [`DetectorBackend`]. The model
//! is loaded exactly once at process startup; inference runs on a dedicated
//! worker thread ([`DetectorHandle`]) so concurrent requests are serialized
//! and each carries its own deadline.

mod backend;
mod backends;
mod result;
mod worker;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::RawDetection;
pub use worker::DetectorHandle;

/// Minimum confidence for a detection to be reported.
pub const CONFIDENCE_THRESHOLD: f32 = 0.4;

/// IoU above which overlapping same-class detections are suppressed.
pub const OVERLAP_THRESHOLD: f32 = 0.5;
