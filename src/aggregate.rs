//! Detection-result aggregation.
//!
//! Transforms raw detector output into the normalized response shape and
//! selects the single primary class: the highest-confidence detection whose
//! class is present in the hazard catalog. Classes the catalog does not know
//! are reported in `detections` but never become primary.

use serde::Serialize;

use crate::catalog::{HazardCatalog, HazardEntry, SENTINEL_CLASS};
use crate::detect::RawDetection;

/// Normalize a class name for catalog lookup: trimmed, lower-case.
///
/// The single normalization point shared by the aggregator and the hazard
/// lookup endpoint.
pub fn normalize_class_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One normalized detection as reported to clients.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Detection {
    pub class_name: String,
    /// Rounded to 4 decimal places.
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` pixel corners, rounded to 2 decimal places.
    pub bbox: [f32; 4],
}

/// Aggregate response for one prediction request.
#[derive(Clone, Debug, Serialize)]
pub struct PredictionResult {
    pub primary_type: String,
    pub primary_info: HazardEntry,
    pub detections: Vec<Detection>,
}

fn round_to(value: f32, places: i32) -> f32 {
    let factor = 10f32.powi(places);
    (value * factor).round() / factor
}

/// Build a [`PredictionResult`] from raw detections.
///
/// Primary selection uses strict `>` against the running maximum, so the
/// earliest of equal-confidence detections wins. Selection compares the raw
/// (unrounded) confidences; rounding is presentation only. The returned
/// `detections` list keeps detector order and is not filtered to
/// catalog-matching classes.
pub fn aggregate(raw: &[RawDetection], catalog: &HazardCatalog) -> PredictionResult {
    let mut detections = Vec::with_capacity(raw.len());
    let mut primary_type = SENTINEL_CLASS.to_string();
    let mut highest_confidence = 0.0f32;

    for detection in raw {
        let class_name = normalize_class_name(&detection.class_name);

        if catalog.lookup(&class_name).is_some() && detection.confidence > highest_confidence {
            primary_type = class_name.clone();
            highest_confidence = detection.confidence;
        }

        detections.push(Detection {
            class_name,
            confidence: round_to(detection.confidence, 4),
            bbox: [
                round_to(detection.x1, 2),
                round_to(detection.y1, 2),
                round_to(detection.x2, 2),
                round_to(detection.y2, 2),
            ],
        });
    }

    // The sentinel fallback cannot trigger for a validated catalog; kept
    // defensive so primary_info is never absent.
    let primary_info = catalog
        .lookup(&primary_type)
        .unwrap_or_else(|| catalog.sentinel())
        .clone();

    PredictionResult {
        primary_type,
        primary_info,
        detections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(class_name: &str, confidence: f32) -> RawDetection {
        RawDetection {
            class_id: 0,
            class_name: class_name.to_string(),
            confidence,
            x1: 10.006,
            y1: 20.004,
            x2: 110.499,
            y2: 220.0,
        }
    }

    fn catalog() -> HazardCatalog {
        HazardCatalog::builtin()
    }

    #[test]
    fn empty_detections_fall_back_to_sentinel() {
        let result = aggregate(&[], &catalog());
        assert_eq!(result.primary_type, SENTINEL_CLASS);
        assert_eq!(&result.primary_info, catalog().sentinel());
        assert!(result.detections.is_empty());
    }

    #[test]
    fn highest_confidence_wins_regardless_of_order() {
        let cat = catalog();
        let result = aggregate(&[raw("battery", 0.9), raw("battery", 0.95)], &cat);
        assert_eq!(result.primary_type, "battery");
        assert_eq!(result.detections.len(), 2);

        let reversed = aggregate(&[raw("battery", 0.95), raw("battery", 0.9)], &cat);
        assert_eq!(reversed.primary_type, "battery");
    }

    #[test]
    fn unknown_class_never_becomes_primary() {
        let result = aggregate(&[raw("unknown_widget", 0.99)], &catalog());
        assert_eq!(result.primary_type, SENTINEL_CLASS);
        // ...but it is still reported.
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].class_name, "unknown_widget");
    }

    #[test]
    fn first_detection_wins_exact_ties() {
        let result = aggregate(&[raw("cable", 0.5), raw("battery", 0.5)], &catalog());
        assert_eq!(result.primary_type, "cable");
    }

    #[test]
    fn higher_confidence_beats_earlier_position() {
        let result = aggregate(&[raw("cable", 0.5), raw("battery", 0.6)], &catalog());
        assert_eq!(result.primary_type, "battery");
        assert_eq!(result.primary_info.hazard_level, 5);
    }

    #[test]
    fn class_names_are_normalized() {
        let result = aggregate(&[raw("  Battery ", 0.8)], &catalog());
        assert_eq!(result.primary_type, "battery");
        assert_eq!(result.detections[0].class_name, "battery");
    }

    #[test]
    fn numeric_fields_are_rounded() {
        let result = aggregate(&[raw("battery", 0.91236)], &catalog());
        let det = &result.detections[0];
        assert_eq!(det.confidence, 0.9124);
        assert_eq!(det.bbox, [10.01, 20.0, 110.5, 220.0]);
    }

    #[test]
    fn primary_info_is_never_absent() {
        let cat = catalog();
        let cases: &[&[RawDetection]] = &[
            &[],
            &[raw("unknown_widget", 0.99)],
            &[raw("battery", 0.9), raw("mystery", 0.95)],
        ];
        for raw_detections in cases {
            let result = aggregate(raw_detections, &cat);
            assert!(result.primary_info.hazard_level >= 1);
        }
    }

    #[test]
    fn mixed_known_and_unknown_classes() {
        let result = aggregate(
            &[raw("mystery", 0.99), raw("printer", 0.45), raw("cable", 0.7)],
            &catalog(),
        );
        assert_eq!(result.primary_type, "cable");
        assert_eq!(result.detections.len(), 3);
    }
}
