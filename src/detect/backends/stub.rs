use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;

/// Stub backend for testing. Replays a scripted detection list, or fails
/// with a scripted error, regardless of image content.
pub struct StubBackend {
    script: Vec<RawDetection>,
    failure: Option<String>,
}

impl StubBackend {
    /// A stub that detects nothing.
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            failure: None,
        }
    }

    /// A stub that reports the given detections on every call.
    pub fn with_detections(script: Vec<RawDetection>) -> Self {
        Self {
            script,
            failure: None,
        }
    }

    /// A stub whose `detect` fails with the given message on every call.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        if let Some(message) = &self.failure {
            return Err(anyhow!("{}", message));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected,
                pixels.len()
            ));
        }
        Ok(self.script.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_replays_script() {
        let det = RawDetection {
            class_id: 3,
            class_name: "battery".to_string(),
            confidence: 0.9,
            x1: 0.0,
            y1: 0.0,
            x2: 5.0,
            y2: 5.0,
        };
        let mut backend = StubBackend::with_detections(vec![det.clone()]);
        let out = backend.detect(&[0u8; 12], 2, 2).unwrap();
        assert_eq!(out, vec![det]);
    }

    #[test]
    fn stub_rejects_mismatched_buffer() {
        let mut backend = StubBackend::new();
        assert!(backend.detect(&[0u8; 5], 2, 2).is_err());
    }

    #[test]
    fn failing_stub_fails() {
        let mut backend = StubBackend::failing("model exploded");
        let err = backend.detect(&[0u8; 12], 2, 2).unwrap_err();
        assert!(err.to_string().contains("model exploded"));
    }
}
