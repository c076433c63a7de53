//! E-waste detection service.
//!
//! A pretrained object-detection model behind a minimal HTTP API: clients
//! submit a Base64-encoded image, the service runs inference and returns
//! bounding boxes, class labels, confidences, and a static hazard-information
//! lookup keyed by the top detected class.
//!
//! # Module Structure
//!
//! - `catalog`: immutable class-name → hazard-metadata table (with sentinel)
//! - `decode`: Base64 payload → RGB8 raster
//! - `detect`: detector backends and the single-slot inference worker
//! - `aggregate`: normalization + primary-class selection + catalog join
//! - `api`: HTTP surface and error-to-status mapping
//! - `config`: file + environment configuration for the bins
//!
//! The model is loaded once at startup and kept resident; a load failure
//! leaves the service degraded (prediction rejected, liveness and hazard
//! lookup unaffected) instead of terminating the process.

pub mod aggregate;
pub mod api;
pub mod catalog;
pub mod config;
pub mod decode;
pub mod detect;
pub mod error;

pub use aggregate::{aggregate, normalize_class_name, Detection, PredictionResult};
pub use catalog::{HazardCatalog, HazardEntry, SENTINEL_CLASS};
pub use config::{ModelSettings, ServiceConfig};
pub use decode::decode_base64_image;
pub use detect::{
    DetectorBackend, DetectorHandle, RawDetection, StubBackend, CONFIDENCE_THRESHOLD,
    OVERLAP_THRESHOLD,
};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use error::ServiceError;
