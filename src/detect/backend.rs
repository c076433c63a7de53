use anyhow::Result;

use crate::detect::result::RawDetection;

/// Detector backend trait.
///
/// Implementations wrap a resident model artifact. Loading happens in the
/// constructor; `detect` must not touch the filesystem or network.
pub trait DetectorBackend: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Run detection on one RGB8 image.
    ///
    /// `pixels` is tightly packed row-major RGB, 3 bytes per pixel, so its
    /// length must be `width * height * 3`. Returned boxes are in absolute
    /// pixel coordinates of this image.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook, run once on the worker thread before serving.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
