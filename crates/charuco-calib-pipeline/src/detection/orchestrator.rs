use super::{DetectionError, DetectionReport, DetectionStatus, ImageOutcome};
use crate::cancel::CancelToken;
use crate::capability::BoardDetector;
use crate::error::ConfigurationError;
use charuco_calib_core::{
    BoardSpec, CalibrationImage, DetectionRecord, DetectionResult, GrayImage, ImageCollection,
    ImageStore,
};
use log::{debug, info, warn};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Runs a board detector over every image of a collection.
///
/// Pixel buffers are loaded through the [`ImageStore`] one image at a time
/// and dropped as soon as that image is done. The viewer's selected image
/// keeps its resident buffer, which is reused instead of reloading.
pub struct DetectionOrchestrator<S> {
    store: S,
    cancel: CancelToken,
}

impl<S: ImageStore> DetectionOrchestrator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cancel: CancelToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Detect the board on every image and store the results on the images.
    pub fn run_detection<D>(
        &self,
        images: &mut ImageCollection,
        board: &BoardSpec,
        detector: &D,
    ) -> Result<DetectionReport, DetectionError>
    where
        D: BoardDetector + ?Sized,
    {
        self.run_detection_with_progress(images, board, detector, |_| {})
    }

    /// Like [`run_detection`](Self::run_detection), calling `on_outcome` after
    /// each image is processed.
    ///
    /// Records produced under a different board are dropped up front. If the
    /// pass is cancelled, images already processed keep their new results
    /// and the remaining ones are reported as `Cancelled`. A cancel request
    /// only applies to the pass it reaches; the token is re-armed when the
    /// pass returns.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, images, board, detector, on_outcome),
            fields(
                images = images.len(),
                columns = board.columns,
                rows = board.rows,
                dictionary = %board.dictionary
            )
        )
    )]
    pub fn run_detection_with_progress<D, F>(
        &self,
        images: &mut ImageCollection,
        board: &BoardSpec,
        detector: &D,
        mut on_outcome: F,
    ) -> Result<DetectionReport, DetectionError>
    where
        D: BoardDetector + ?Sized,
        F: FnMut(&ImageOutcome),
    {
        board.validate().map_err(ConfigurationError::from)?;
        if images.is_empty() {
            return Err(ConfigurationError::EmptyCollection.into());
        }

        let mut report = DetectionReport::new(*board);
        // A pass cancelled before it starts leaves every record alone.
        report.cancelled = self.cancel.is_cancelled();
        if !report.cancelled {
            report.invalidated = images.invalidate_stale(board);
        }
        if report.invalidated > 0 {
            debug!(
                "dropped {} detection records made with a different board",
                report.invalidated
            );
        }

        info!(
            "running detection on {} images ({}x{} squares, {})",
            images.len(),
            board.columns,
            board.rows,
            board.dictionary
        );

        let selected = images.selected();
        for (index, image) in images.iter_mut().enumerate() {
            let status = if report.cancelled || self.cancel.is_cancelled() {
                report.cancelled = true;
                DetectionStatus::Cancelled
            } else {
                let status = self.detect_one(image, board, detector);
                if selected != Some(index) {
                    image.release_buffer();
                }
                status
            };

            let outcome = ImageOutcome {
                index,
                path: image.path().to_path_buf(),
                status,
            };
            on_outcome(&outcome);
            report.outcomes.push(outcome);
        }
        self.cancel.reset();

        if report.cancelled {
            info!(
                "detection cancelled after {} of {} images",
                report.outcomes.len() - report.cancelled_count(),
                report.outcomes.len()
            );
        } else {
            info!(
                "detection finished: {} usable, {} degenerate, {} not detected, {} unreadable",
                report.usable_count(),
                report.detected_count() - report.usable_count(),
                report.not_detected_count(),
                report.load_failed_count()
            );
        }
        Ok(report)
    }

    fn detect_one<D>(
        &self,
        image: &mut CalibrationImage,
        board: &BoardSpec,
        detector: &D,
    ) -> DetectionStatus
    where
        D: BoardDetector + ?Sized,
    {
        let scoped: GrayImage;
        let buffer = match image.buffer() {
            Some(resident) => resident,
            None => match self.store.load_grayscale(image.path()) {
                Ok(loaded) => {
                    scoped = loaded;
                    &scoped
                }
                Err(err) => {
                    warn!("skipping image: {err}");
                    image.clear_detection();
                    return DetectionStatus::LoadFailed {
                        error: err.to_string(),
                    };
                }
            },
        };

        let image_size = buffer.size();
        let (result, reason) = match detector.detect(&buffer.view(), board) {
            Ok(DetectionResult::Detected(det)) => match det.validate(board) {
                Ok(()) => (DetectionResult::Detected(det), None),
                Err(err) => {
                    warn!(
                        "{}: detector output rejected: {err}",
                        image.path().display()
                    );
                    (DetectionResult::NotDetected, Some(err.to_string()))
                }
            },
            Ok(DetectionResult::NotDetected) => (DetectionResult::NotDetected, None),
            Err(err) => {
                warn!("{}: {err}", image.path().display());
                (DetectionResult::NotDetected, Some(err.to_string()))
            }
        };

        let status = match &result {
            DetectionResult::Detected(det) => DetectionStatus::Detected {
                corners: det.corner_count(),
                markers: det.marker_count(),
            },
            DetectionResult::NotDetected => DetectionStatus::NotDetected { reason },
        };
        debug!("{} ({image_size}): {status:?}", image.path().display());

        image.set_detection(DetectionRecord::new(*board, image_size, result));
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::BoardDetectError;
    use charuco_calib_core::{BoardDetection, GrayImageView, ImageLoadError};
    use nalgebra::Point2;
    use std::cell::RefCell;
    use std::path::Path;

    /// Encodes the wanted outcome in the file name.
    struct NameStore;

    impl ImageStore for NameStore {
        fn load_grayscale(&self, path: &Path) -> Result<GrayImage, ImageLoadError> {
            let name = path.to_string_lossy();
            if name.contains("missing") {
                return Err(ImageLoadError::new(path, "no such file"));
            }
            let value = if name.contains("board") { 255 } else { 0 };
            Ok(GrayImage::filled(16, 12, value))
        }
    }

    /// Reports a board on bright images only.
    struct BrightDetector {
        calls: RefCell<usize>,
    }

    impl BoardDetector for BrightDetector {
        fn detect(
            &self,
            image: &GrayImageView<'_>,
            _board: &BoardSpec,
        ) -> Result<DetectionResult, BoardDetectError> {
            *self.calls.borrow_mut() += 1;
            if image.get(0, 0) != Some(255) {
                return Ok(DetectionResult::NotDetected);
            }
            Ok(DetectionResult::Detected(BoardDetection {
                board_corners: (0..4).map(|i| Point2::new(i as f32, 1.0)).collect(),
                board_corner_ids: vec![0, 1, 2, 3],
                marker_corners: vec![[Point2::origin(); 4]],
                marker_ids: vec![0],
            }))
        }
    }

    fn detector() -> BrightDetector {
        BrightDetector {
            calls: RefCell::new(0),
        }
    }

    #[test]
    fn rejects_empty_collection_and_bad_board() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut empty = ImageCollection::new();
        let err = orchestrator
            .run_detection(&mut empty, &BoardSpec::default(), &detector())
            .unwrap_err();
        assert_eq!(
            err,
            DetectionError::InvalidConfiguration(ConfigurationError::EmptyCollection)
        );

        let mut images = ImageCollection::from_paths(["board.png"]);
        let bad = BoardSpec {
            rows: 1,
            ..BoardSpec::default()
        };
        let err = orchestrator
            .run_detection(&mut images, &bad, &detector())
            .unwrap_err();
        assert!(matches!(
            err,
            DetectionError::InvalidConfiguration(ConfigurationError::Board(_))
        ));
        assert!(images.get(0).and_then(CalibrationImage::detection).is_none());
    }

    #[test]
    fn load_failure_is_recorded_and_skipped() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut images = ImageCollection::from_paths(["board_a.png", "missing.png", "board_b.png"]);
        let det = detector();
        let report = orchestrator
            .run_detection(&mut images, &BoardSpec::default(), &det)
            .expect("pass");

        assert_eq!(*det.calls.borrow(), 2);
        assert_eq!(report.outcomes.len(), 3);
        assert!(matches!(
            report.outcomes[1].status,
            DetectionStatus::LoadFailed { .. }
        ));
        assert!(images.get(1).and_then(CalibrationImage::detection).is_none());
        assert_eq!(report.usable_count(), 2);
    }

    #[test]
    fn buffers_are_released_except_selection() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut images = ImageCollection::from_paths(["board_a.png", "board_b.png"]);
        images.select(1, &NameStore).expect("select");
        images
            .get_mut(0)
            .expect("0")
            .load(&NameStore)
            .expect("load");

        orchestrator
            .run_detection(&mut images, &BoardSpec::default(), &detector())
            .expect("pass");
        assert!(!images.get(0).is_some_and(CalibrationImage::is_loaded));
        assert!(images.get(1).is_some_and(CalibrationImage::is_loaded));
    }

    fn failing(
        _: &GrayImageView<'_>,
        _: &BoardSpec,
    ) -> Result<DetectionResult, BoardDetectError> {
        Err(BoardDetectError::Internal("solver blew up".into()))
    }

    fn misaligned(
        _: &GrayImageView<'_>,
        _: &BoardSpec,
    ) -> Result<DetectionResult, BoardDetectError> {
        Ok(DetectionResult::Detected(BoardDetection {
            board_corners: vec![Point2::new(1.0, 1.0)],
            board_corner_ids: vec![0, 1],
            ..BoardDetection::default()
        }))
    }

    #[test]
    fn detector_error_and_bad_shape_become_not_detected() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut images = ImageCollection::from_paths(["board.png"]);

        let report = orchestrator
            .run_detection(&mut images, &BoardSpec::default(), &failing)
            .expect("pass");
        assert_eq!(
            report.outcomes[0].status,
            DetectionStatus::NotDetected {
                reason: Some("detector internal error: solver blew up".into())
            }
        );

        let report = orchestrator
            .run_detection(&mut images, &BoardSpec::default(), &misaligned)
            .expect("pass");
        assert!(matches!(
            &report.outcomes[0].status,
            DetectionStatus::NotDetected { reason: Some(_) }
        ));
        let record = images
            .get(0)
            .and_then(CalibrationImage::detection)
            .expect("record");
        assert_eq!(record.result, DetectionResult::NotDetected);
    }

    #[test]
    fn progress_callback_sees_every_image_in_order() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut images = ImageCollection::from_paths(["board.png", "dark.png", "missing.png"]);
        let mut seen = Vec::new();
        orchestrator
            .run_detection_with_progress(&mut images, &BoardSpec::default(), &detector(), |o| {
                seen.push(o.index)
            })
            .expect("pass");
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn cancelled_token_skips_every_image() {
        let token = CancelToken::new();
        token.cancel();
        let orchestrator = DetectionOrchestrator::new(NameStore).with_cancel_token(token);
        let mut images = ImageCollection::from_paths(["board.png", "board.png"]);
        let det = detector();
        let report = orchestrator
            .run_detection(&mut images, &BoardSpec::default(), &det)
            .expect("pass");
        assert!(report.cancelled);
        assert_eq!(report.cancelled_count(), 2);
        assert_eq!(*det.calls.borrow(), 0);
        assert!(!orchestrator.cancel_token().is_cancelled());
    }

    fn small_board() -> BoardSpec {
        BoardSpec {
            columns: 8,
            rows: 6,
            ..BoardSpec::default()
        }
    }

    #[test]
    fn cancel_request_does_not_outlive_its_pass() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut images = ImageCollection::from_paths(["board.png", "dark.png", "board.png"]);
        let board = BoardSpec::default();
        orchestrator
            .run_detection(&mut images, &board, &detector())
            .expect("first pass");

        // Request arrives after the last image, nothing is left to skip.
        let token = orchestrator.cancel_token().clone();
        let report = orchestrator
            .run_detection_with_progress(&mut images, &board, &detector(), |o| {
                if o.index == 2 {
                    token.cancel();
                }
            })
            .expect("second pass");
        assert!(!report.cancelled);

        let next = small_board();
        let det = detector();
        let report = orchestrator
            .run_detection(&mut images, &next, &det)
            .expect("third pass");
        assert!(!report.cancelled);
        assert_eq!(report.cancelled_count(), 0);
        assert_eq!(*det.calls.borrow(), 3);
        assert!(images
            .iter()
            .all(|img| img.detection().is_some_and(|rec| rec.matches_board(&next))));
    }

    #[test]
    fn pass_cancelled_up_front_keeps_old_records() {
        let orchestrator = DetectionOrchestrator::new(NameStore);
        let mut images = ImageCollection::from_paths(["board.png", "dark.png"]);
        let board = BoardSpec::default();
        orchestrator
            .run_detection(&mut images, &board, &detector())
            .expect("first pass");
        let before = images.detection_snapshot();

        orchestrator.cancel_token().cancel();
        let report = orchestrator
            .run_detection(&mut images, &small_board(), &detector())
            .expect("cancelled pass");
        assert!(report.cancelled);
        assert_eq!(report.invalidated, 0);
        assert_eq!(report.cancelled_count(), 2);
        assert_eq!(images.detection_snapshot(), before);
        assert!(!orchestrator.cancel_token().is_cancelled());
    }
}
