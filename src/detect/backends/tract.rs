#![cfg(feature = "backend-tract")]

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::detect::{CONFIDENCE_THRESHOLD, OVERLAP_THRESHOLD};

/// Tract-based backend for ONNX object detection.
///
/// Loads a local model artifact once and performs inference on RGB frames.
/// Expects a YOLO-style export: NCHW f32 input of a fixed square edge, output
/// `[1, 4 + num_classes, boxes]` with xywh center boxes in input coordinates.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    class_names: Vec<String>,
    confidence_threshold: f32,
    overlap_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    ///
    /// `class_names` must match the model's training order; it resolves the
    /// class index of each detection to a label.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: u32,
        class_names: Vec<String>,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();
        if class_names.is_empty() {
            return Err(anyhow!("class name table must not be empty"));
        }
        if input_size == 0 {
            return Err(anyhow!("model input size must be > 0"));
        }
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, input_size as usize, input_size as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            class_names,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            overlap_threshold: OVERLAP_THRESHOLD,
        })
    }

    /// Override the default acceptance/suppression thresholds.
    pub fn with_thresholds(mut self, confidence: f32, overlap: f32) -> Self {
        self.confidence_threshold = confidence;
        self.overlap_threshold = overlap;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let frame = RgbImage::from_raw(width, height, pixels.to_vec())
            .ok_or_else(|| anyhow!("pixel buffer does not match {}x{}", width, height))?;
        let edge = self.input_size;
        let resized = image::imageops::resize(&frame, edge, edge, FilterType::Triangle);

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, edge as usize, edge as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        Ok(input.into_tensor())
    }

    fn decode_output(
        &self,
        outputs: TVec<TValue>,
        width: u32,
        height: u32,
    ) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(anyhow!(
                "unexpected model output shape {:?}, expected [1, 4 + classes, boxes]",
                shape
            ));
        }
        let num_classes = shape[1]
            .checked_sub(4)
            .filter(|n| *n > 0)
            .ok_or_else(|| anyhow!("model output carries no class scores"))?;
        let num_boxes = shape[2];

        let scale_x = width as f32 / self.input_size as f32;
        let scale_y = height as f32 / self.input_size as f32;

        let mut detections = Vec::new();
        for i in 0..num_boxes {
            let mut best_score = 0.0f32;
            let mut best_class = 0usize;
            for class_idx in 0..num_classes {
                let score = view[[0, 4 + class_idx, i]];
                if score > best_score {
                    best_score = score;
                    best_class = class_idx;
                }
            }
            if best_score <= self.confidence_threshold {
                continue;
            }

            let x_center = view[[0, 0, i]];
            let y_center = view[[0, 1, i]];
            let box_w = view[[0, 2, i]];
            let box_h = view[[0, 3, i]];

            let x1 = ((x_center - box_w / 2.0) * scale_x).clamp(0.0, width as f32);
            let y1 = ((y_center - box_h / 2.0) * scale_y).clamp(0.0, height as f32);
            let x2 = ((x_center + box_w / 2.0) * scale_x).clamp(0.0, width as f32);
            let y2 = ((y_center + box_h / 2.0) * scale_y).clamp(0.0, height as f32);

            let class_name = self
                .class_names
                .get(best_class)
                .cloned()
                .unwrap_or_else(|| format!("class_{best_class}"));

            detections.push(RawDetection {
                class_id: best_class as u32,
                class_name,
                confidence: best_score,
                x1,
                y1,
                x2,
                y2,
            });
        }

        Ok(non_max_suppression(detections, self.overlap_threshold))
    }
}

/// Per-class non-max suppression: keep the highest-confidence box of each
/// overlapping cluster.
fn non_max_suppression(detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    if detections.is_empty() {
        return detections;
    }

    let mut class_groups: HashMap<u32, Vec<RawDetection>> = HashMap::new();
    for detection in detections {
        class_groups
            .entry(detection.class_id)
            .or_default()
            .push(detection);
    }

    let mut kept = Vec::new();
    let mut class_ids: Vec<u32> = class_groups.keys().copied().collect();
    class_ids.sort_unstable();
    for class_id in class_ids {
        let mut group = class_groups.remove(&class_id).unwrap_or_default();
        group.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..group.len() {
                if !suppressed[j] && group[i].iou(&group[j]) > iou_threshold {
                    suppressed[j] = true;
                }
            }
            kept.push(group[i].clone());
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<RawDetection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        // One pass over a black frame pages the weights in before the first
        // request hits the worker.
        let edge = self.input_size;
        let pixels = vec![0u8; (edge as usize) * (edge as usize) * 3];
        self.detect(&pixels, edge, edge).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class_id: u32, confidence: f32, x1: f32) -> RawDetection {
        RawDetection {
            class_id,
            class_name: format!("class_{class_id}"),
            confidence,
            x1,
            y1: 0.0,
            x2: x1 + 10.0,
            y2: 10.0,
        }
    }

    #[test]
    fn nms_suppresses_overlapping_same_class() {
        let kept = non_max_suppression(vec![det(0, 0.9, 0.0), det(0, 0.8, 1.0)], 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn nms_keeps_overlapping_distinct_classes() {
        let kept = non_max_suppression(vec![det(0, 0.9, 0.0), det(1, 0.8, 1.0)], 0.5);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn nms_keeps_distant_same_class() {
        let kept = non_max_suppression(vec![det(0, 0.9, 0.0), det(0, 0.8, 100.0)], 0.5);
        assert_eq!(kept.len(), 2);
    }
}
