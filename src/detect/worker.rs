use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::error::ServiceError;

/// Handle to the single-slot inference worker.
///
/// One dedicated thread owns the backend; requests queue as jobs and are
/// served strictly one at a time, so concurrent HTTP handlers never invoke
/// the model concurrently. Each caller waits with its own deadline; a
/// timed-out job still finishes on the worker, its reply is simply dropped.
///
/// The worker thread exits when the last handle is dropped.
pub struct DetectorHandle {
    jobs: mpsc::Sender<DetectJob>,
    backend_name: &'static str,
}

struct DetectJob {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    reply: mpsc::Sender<Result<Vec<RawDetection>>>,
}

impl DetectorHandle {
    /// Warm the backend up and move it onto a worker thread.
    pub fn spawn(mut backend: Box<dyn DetectorBackend>) -> Result<Self> {
        let backend_name = backend.name();
        backend.warm_up()?;

        let (jobs, job_rx) = mpsc::channel::<DetectJob>();
        std::thread::spawn(move || {
            for job in job_rx {
                let result = backend.detect(&job.pixels, job.width, job.height);
                // Receiver may have timed out and gone away.
                let _ = job.reply.send(result);
            }
            log::debug!("detection worker for '{}' exiting", backend.name());
        });

        Ok(Self { jobs, backend_name })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    /// Run detection on one RGB8 frame, waiting at most `timeout`.
    pub fn detect(
        &self,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> Result<Vec<RawDetection>, ServiceError> {
        let (reply, reply_rx) = mpsc::channel();
        let job = DetectJob {
            pixels,
            width,
            height,
            reply,
        };
        self.jobs
            .send(job)
            .map_err(|_| ServiceError::Inference("detection worker has exited".to_string()))?;

        match reply_rx.recv_timeout(timeout) {
            Ok(Ok(detections)) => Ok(detections),
            Ok(Err(err)) => Err(ServiceError::Inference(format!("{err:#}"))),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(ServiceError::Inference(format!(
                "detection timed out after {}s",
                timeout.as_secs_f32()
            ))),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ServiceError::Inference(
                "detection worker has exited".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::StubBackend;

    fn sample() -> RawDetection {
        RawDetection {
            class_id: 0,
            class_name: "battery".to_string(),
            confidence: 0.9,
            x1: 1.0,
            y1: 2.0,
            x2: 3.0,
            y2: 4.0,
        }
    }

    #[test]
    fn worker_round_trip() {
        let backend = StubBackend::with_detections(vec![sample()]);
        let handle = DetectorHandle::spawn(Box::new(backend)).unwrap();
        let out = handle
            .detect(vec![0u8; 12], 2, 2, Duration::from_secs(5))
            .unwrap();
        assert_eq!(out, vec![sample()]);
        assert_eq!(handle.backend_name(), "stub");
    }

    #[test]
    fn worker_surfaces_backend_failure_as_inference_error() {
        let backend = StubBackend::failing("boom");
        let handle = DetectorHandle::spawn(Box::new(backend)).unwrap();
        let err = handle
            .detect(vec![0u8; 12], 2, 2, Duration::from_secs(5))
            .unwrap_err();
        match err {
            ServiceError::Inference(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn worker_serves_sequential_callers() {
        let backend = StubBackend::new();
        let handle = DetectorHandle::spawn(Box::new(backend)).unwrap();
        for _ in 0..3 {
            let out = handle
                .detect(vec![0u8; 27], 3, 3, Duration::from_secs(5))
                .unwrap();
            assert!(out.is_empty());
        }
    }
}
