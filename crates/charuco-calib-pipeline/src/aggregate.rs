//! Collect per-image detections into solver-ready correspondence sets.

use charuco_calib_core::{DetectionResult, ImageCollection};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Index-aligned correspondences of every image that can feed the solver.
///
/// `corners_per_image[k]`, `ids_per_image[k]` and `image_indices[k]` all
/// describe the same view; `image_indices` is strictly increasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationResult {
    pub corners_per_image: Vec<Vec<Point2<f32>>>,
    pub ids_per_image: Vec<Vec<u32>>,
    pub image_indices: Vec<usize>,
    pub included: usize,
    pub excluded: usize,
    /// Excluded because the board was not found.
    pub not_detected: usize,
    /// Excluded because the detection carries no corners.
    pub degenerate: usize,
    /// Excluded because detection never ran or the image failed to load.
    pub not_run: usize,
}

impl AggregationResult {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.included == 0
    }

    /// Counts and indices only, for reports.
    pub fn summary(&self) -> AggregationSummary {
        AggregationSummary {
            included: self.included,
            excluded: self.excluded,
            not_detected: self.not_detected,
            degenerate: self.degenerate,
            not_run: self.not_run,
            image_indices: self.image_indices.clone(),
            corners_per_image: self.corners_per_image.iter().map(Vec::len).collect(),
        }
    }
}

/// Serializable digest of an [`AggregationResult`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub included: usize,
    pub excluded: usize,
    #[serde(default)]
    pub not_detected: usize,
    #[serde(default)]
    pub degenerate: usize,
    #[serde(default)]
    pub not_run: usize,
    pub image_indices: Vec<usize>,
    /// Corner count of each included view.
    #[serde(default)]
    pub corners_per_image: Vec<usize>,
}

/// Gather the corner sets of every usable detection, in collection order.
///
/// An image is included iff its record is `Detected` with a non-empty corner
/// list and a non-empty id list. Nothing is mutated.
pub fn aggregate(images: &ImageCollection) -> AggregationResult {
    let mut out = AggregationResult::default();

    for (index, image) in images.iter().enumerate() {
        let Some(record) = image.detection() else {
            out.not_run += 1;
            continue;
        };
        match &record.result {
            DetectionResult::NotDetected => out.not_detected += 1,
            DetectionResult::Detected(det) if det.is_degenerate() => out.degenerate += 1,
            DetectionResult::Detected(det) => {
                out.corners_per_image.push(det.board_corners.clone());
                out.ids_per_image.push(det.board_corner_ids.clone());
                out.image_indices.push(index);
            }
        }
    }

    out.included = out.image_indices.len();
    out.excluded = images.len() - out.included;
    out
}
