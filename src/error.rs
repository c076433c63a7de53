use thiserror::Error;

/// Request-path failures, mapped to HTTP statuses at the API boundary.
///
/// Startup and configuration code keeps using `anyhow`; this taxonomy only
/// covers conditions a client can trigger or observe.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The detection model failed to load at startup (or was never loaded).
    /// Fatal for prediction requests, harmless for liveness and lookup.
    #[error("detection model is not loaded; check server logs")]
    ModelUnavailable,

    /// Malformed or absent image payload. Fully recoverable.
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Unexpected failure inside the detector call, including a request
    /// deadline expiring before the worker replied.
    #[error("inference failed: {0}")]
    Inference(String),

    /// Hazard-lookup miss.
    #[error("{0}")]
    NotFound(String),
}
