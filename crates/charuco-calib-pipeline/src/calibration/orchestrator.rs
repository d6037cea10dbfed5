use super::{CalibrationError, CalibrationParams, CalibrationResult, CalibrationStatus, ImagePose};
use crate::aggregate::{aggregate, AggregationResult};
use crate::cancel::CancelToken;
use crate::capability::{CalibrationSolver, SolverOutput};
use crate::error::ConfigurationError;
use charuco_calib_core::{BoardSpec, CalibrationImage, ImageCollection, ImageSize};
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Debug, Default)]
struct State {
    status: CalibrationStatus,
    result: Option<Arc<CalibrationResult>>,
    last_error: Option<String>,
}

/// Drives one camera calibration at a time and owns its latest result.
///
/// The orchestrator is `Sync`; share it by reference or `Arc`. A second
/// [`run_calibration`](Self::run_calibration) issued while one is solving is
/// rejected with [`CalibrationError::AlreadyRunning`]. The internal lock is
/// only held for state transitions, never during the solve.
#[derive(Debug, Default)]
pub struct CalibrationOrchestrator {
    params: CalibrationParams,
    state: Mutex<State>,
    cancel: CancelToken,
}

impl CalibrationOrchestrator {
    pub fn new(params: CalibrationParams) -> Self {
        Self {
            params,
            state: Mutex::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[inline]
    pub fn params(&self) -> &CalibrationParams {
        &self.params
    }

    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn status(&self) -> CalibrationStatus {
        self.lock().status
    }

    /// Latest successful result. Survives later failed calls.
    pub fn result(&self) -> Option<Arc<CalibrationResult>> {
        self.lock().result.clone()
    }

    /// Message of the most recent failed call, cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Forget the stored result and return to `NotRun`.
    pub fn reset(&self) -> Result<(), CalibrationError> {
        let mut state = self.lock();
        if state.status.is_running() {
            return Err(CalibrationError::AlreadyRunning);
        }
        *state = State::default();
        Ok(())
    }

    /// Calibrate from the detections currently stored on `images`.
    ///
    /// Requires a detection pass under `board`: records produced for any
    /// other board make the call fail with `DetectionRequired`. On success the
    /// stored result is replaced whole; on any failure it is left untouched.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, images, board, solver),
            fields(images = images.len(), columns = board.columns, rows = board.rows)
        )
    )]
    pub fn run_calibration<S>(
        &self,
        images: &ImageCollection,
        board: &BoardSpec,
        solver: &S,
    ) -> Result<Arc<CalibrationResult>, CalibrationError>
    where
        S: CalibrationSolver + ?Sized,
    {
        let guard = self.begin()?;

        let (agg, image_size) = match self.prepare(images, board) {
            Ok(prepared) => prepared,
            Err(err) => return Err(guard.fail(err)),
        };

        // Requests made after this point wait for the solver to return.
        if self.cancel.is_cancelled() {
            info!("calibration cancelled before the solve");
            guard.restore();
            return Err(CalibrationError::Cancelled);
        }

        info!(
            "solving with {} views ({} excluded), image size {image_size}",
            agg.included, agg.excluded
        );
        let output = match solver.calibrate(
            &agg.corners_per_image,
            &agg.ids_per_image,
            board,
            image_size,
        ) {
            Ok(output) => output,
            Err(err) => return Err(guard.fail(CalibrationError::solver(&err))),
        };

        if let Err(err) = check_output(&output, agg.included) {
            return Err(guard.fail(err));
        }

        let result = Arc::new(build_result(output, agg.image_indices, *board, image_size));
        info!(
            "calibration succeeded: fx={:.2} fy={:.2} rms={:.4}px",
            result.fx(),
            result.fy(),
            result.reprojection_error
        );
        guard.succeed(Arc::clone(&result));
        Ok(result)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<RunGuard<'_>, CalibrationError> {
        let mut state = self.lock();
        if state.status.is_running() {
            warn!("calibration requested while another one is running");
            return Err(CalibrationError::AlreadyRunning);
        }
        let previous = state.status;
        state.status = CalibrationStatus::Running;
        Ok(RunGuard {
            state: &self.state,
            cancel: &self.cancel,
            previous,
            done: false,
        })
    }

    fn prepare(
        &self,
        images: &ImageCollection,
        board: &BoardSpec,
    ) -> Result<(AggregationResult, ImageSize), CalibrationError> {
        board.validate().map_err(ConfigurationError::from)?;
        if images.is_empty() {
            return Err(ConfigurationError::EmptyCollection.into());
        }

        let (fresh, stale) = images
            .iter()
            .filter_map(CalibrationImage::detection)
            .fold((0usize, 0usize), |(fresh, stale), rec| {
                if rec.matches_board(board) {
                    (fresh + 1, stale)
                } else {
                    (fresh, stale + 1)
                }
            });
        if fresh == 0 || stale > 0 {
            return Err(CalibrationError::DetectionRequired {
                stale_images: stale,
            });
        }

        let agg = aggregate(images);
        debug!(
            "aggregated {} views: {} not detected, {} degenerate, {} without detection",
            agg.included, agg.not_detected, agg.degenerate, agg.not_run
        );
        if agg.included == 0 {
            return Err(CalibrationError::InsufficientData {
                included: 0,
                excluded: agg.excluded,
            });
        }
        if agg.included < self.params.min_views {
            if self.params.require_min_views {
                return Err(CalibrationError::InsufficientData {
                    included: agg.included,
                    excluded: agg.excluded,
                });
            }
            warn!(
                "only {} usable views (recommended at least {}); the solve may be poorly constrained",
                agg.included, self.params.min_views
            );
        }

        let image_size = reference_size(images, &agg.image_indices)?;
        Ok((agg, image_size))
    }
}

/// Size shared by every included image, taken from the first one.
fn reference_size(
    images: &ImageCollection,
    included: &[usize],
) -> Result<ImageSize, CalibrationError> {
    let mut sizes = included.iter().filter_map(|&idx| {
        images
            .get(idx)
            .and_then(CalibrationImage::detection)
            .map(|rec| (idx, rec.image_size))
    });
    let Some((_, expected)) = sizes.next() else {
        return Err(CalibrationError::InsufficientData {
            included: 0,
            excluded: images.len(),
        });
    };
    for (image_index, found) in sizes {
        if found != expected {
            return Err(CalibrationError::ImageDimensionMismatch {
                image_index,
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

fn check_output(output: &SolverOutput, included: usize) -> Result<(), CalibrationError> {
    let reason = if output.poses.len() != included {
        format!(
            "solver returned {} poses for {included} views",
            output.poses.len()
        )
    } else if !output.reprojection_error.is_finite() || output.reprojection_error < 0.0 {
        format!(
            "invalid reprojection error {}",
            output.reprojection_error
        )
    } else if !output.intrinsics.iter().all(|v| v.is_finite()) {
        "non-finite camera matrix".to_string()
    } else if !output.distortion.iter().all(|v| v.is_finite()) {
        "non-finite distortion coefficients".to_string()
    } else if let Some(k) = output.poses.iter().position(|p| !p.is_finite()) {
        format!("non-finite pose for view {k}")
    } else {
        return Ok(());
    };
    Err(CalibrationError::SolverFailure { reason })
}

fn build_result(
    output: SolverOutput,
    image_indices: Vec<usize>,
    board: BoardSpec,
    image_size: ImageSize,
) -> CalibrationResult {
    let poses = output
        .poses
        .iter()
        .zip(&image_indices)
        .map(|(pose, &image_index)| ImagePose {
            image_index,
            rotation: pose.rotation,
            translation: pose.translation,
        })
        .collect();
    CalibrationResult {
        intrinsics: output.intrinsics,
        distortion: output.distortion,
        poses,
        reprojection_error: output.reprojection_error,
        image_indices,
        board,
        image_size,
    }
}

/// Holds the `Running` status for the duration of one call.
///
/// Dropped without being resolved (the solver panicked) it marks the
/// orchestrator `Failed` so it never stays stuck in `Running`. Dropping it
/// also re-arms the cancel token: a request belongs to the call it was made
/// during and never leaks into the next one.
struct RunGuard<'a> {
    state: &'a Mutex<State>,
    cancel: &'a CancelToken,
    previous: CalibrationStatus,
    done: bool,
}

impl RunGuard<'_> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn succeed(mut self, result: Arc<CalibrationResult>) {
        let mut state = self.lock();
        state.status = CalibrationStatus::Succeeded;
        state.result = Some(result);
        state.last_error = None;
        drop(state);
        self.done = true;
    }

    fn fail(mut self, err: CalibrationError) -> CalibrationError {
        error!("calibration failed: {err}");
        let mut state = self.lock();
        state.status = CalibrationStatus::Failed;
        state.last_error = Some(err.to_string());
        drop(state);
        self.done = true;
        err
    }

    fn restore(mut self) {
        let previous = self.previous;
        self.lock().status = previous;
        self.done = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.cancel.reset();
        if !self.done {
            let mut state = self.lock();
            state.status = CalibrationStatus::Failed;
            state.last_error = Some("calibration aborted by a panic".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Pose, SolverError};
    use charuco_calib_core::{BoardDetection, DetectionRecord, DetectionResult};
    use nalgebra::{Matrix3, Point2, Vector3};
    use std::cell::Cell;
    use std::sync::Barrier;
    use std::thread;

    struct FixedSolver {
        calls: Cell<usize>,
        fail: bool,
    }

    impl FixedSolver {
        fn ok() -> Self {
            Self {
                calls: Cell::new(0),
                fail: false,
            }
        }
    }

    impl CalibrationSolver for FixedSolver {
        fn calibrate(
            &self,
            corners_per_image: &[Vec<Point2<f32>>],
            _ids_per_image: &[Vec<u32>],
            _board: &BoardSpec,
            image_size: ImageSize,
        ) -> Result<SolverOutput, SolverError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(SolverError::Singular);
            }
            Ok(SolverOutput {
                intrinsics: Matrix3::new(
                    500.0,
                    0.0,
                    image_size.width as f64 / 2.0,
                    0.0,
                    500.0,
                    image_size.height as f64 / 2.0,
                    0.0,
                    0.0,
                    1.0,
                ),
                distortion: vec![0.0; 5],
                poses: corners_per_image
                    .iter()
                    .map(|_| Pose {
                        rotation: Vector3::zeros(),
                        translation: Vector3::new(0.0, 0.0, 1.0),
                    })
                    .collect(),
                reprojection_error: 0.25,
            })
        }
    }

    fn images_with(results: &[(DetectionResult, ImageSize)], board: BoardSpec) -> ImageCollection {
        let mut images = ImageCollection::new();
        for (i, (result, size)) in results.iter().enumerate() {
            let idx = images.push(format!("cam_{i}.png"));
            images
                .get_mut(idx)
                .expect("pushed")
                .set_detection(DetectionRecord::new(board, *size, result.clone()));
        }
        images
    }

    fn seen(n: u32) -> DetectionResult {
        DetectionResult::Detected(BoardDetection {
            board_corners: (0..n).map(|i| Point2::new(i as f32, 0.0)).collect(),
            board_corner_ids: (0..n).collect(),
            ..BoardDetection::default()
        })
    }

    const VGA: ImageSize = ImageSize::new(640, 480);

    #[test]
    fn no_detection_pass_requires_detection() {
        let mut images = ImageCollection::new();
        images.push("a.png");
        let orch = CalibrationOrchestrator::default();
        let solver = FixedSolver::ok();
        let err = orch
            .run_calibration(&images, &BoardSpec::default(), &solver)
            .unwrap_err();
        assert_eq!(err, CalibrationError::DetectionRequired { stale_images: 0 });
        assert_eq!(orch.status(), CalibrationStatus::Failed);
        assert_eq!(solver.calls.get(), 0);
    }

    #[test]
    fn stale_records_require_detection() {
        let old = BoardSpec {
            columns: 8,
            rows: 6,
            ..BoardSpec::default()
        };
        let images = images_with(&[(seen(6), VGA)], old);
        let orch = CalibrationOrchestrator::default();
        let err = orch
            .run_calibration(&images, &BoardSpec::default(), &FixedSolver::ok())
            .unwrap_err();
        assert_eq!(err, CalibrationError::DetectionRequired { stale_images: 1 });
    }

    #[test]
    fn require_min_views_blocks_small_sets() {
        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA), (seen(6), VGA)], board);
        let solver = FixedSolver::ok();

        let strict = CalibrationOrchestrator::new(CalibrationParams {
            min_views: 3,
            require_min_views: true,
        });
        let err = strict.run_calibration(&images, &board, &solver).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::InsufficientData {
                included: 2,
                excluded: 0
            }
        );
        assert_eq!(solver.calls.get(), 0);

        let lenient = CalibrationOrchestrator::default();
        lenient
            .run_calibration(&images, &board, &solver)
            .expect("solve with a warning");
        assert_eq!(solver.calls.get(), 1);
    }

    #[test]
    fn dimension_reference_is_first_included_image() {
        let board = BoardSpec::default();
        let small = ImageSize::new(320, 240);
        let images = images_with(
            &[
                (DetectionResult::NotDetected, small),
                (seen(6), VGA),
                (seen(6), VGA),
            ],
            board,
        );
        let result = CalibrationOrchestrator::default()
            .run_calibration(&images, &board, &FixedSolver::ok())
            .expect("solve");
        assert_eq!(result.image_size, VGA);

        let images = images_with(&[(seen(6), VGA), (seen(6), small)], board);
        let err = CalibrationOrchestrator::default()
            .run_calibration(&images, &board, &FixedSolver::ok())
            .unwrap_err();
        assert_eq!(
            err,
            CalibrationError::ImageDimensionMismatch {
                image_index: 1,
                expected: VGA,
                found: small
            }
        );
    }

    #[test]
    fn solver_error_becomes_solver_failure() {
        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA)], board);
        let orch = CalibrationOrchestrator::default();
        let solver = FixedSolver {
            calls: Cell::new(0),
            fail: true,
        };
        let err = orch.run_calibration(&images, &board, &solver).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::SolverFailure {
                reason: "singular system".into()
            }
        );
        assert_eq!(orch.last_error().as_deref(), Some("solver failed: singular system"));
    }

    #[test]
    fn pose_count_mismatch_is_rejected() {
        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA), (seen(6), VGA)], board);
        let err = CalibrationOrchestrator::default()
            .run_calibration(&images, &board, &ShortSolver)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::SolverFailure { .. }));
    }

    #[test]
    fn cancel_before_solve_restores_status() {
        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA)], board);
        let orch = CalibrationOrchestrator::default();
        let solver = FixedSolver::ok();
        orch.run_calibration(&images, &board, &solver).expect("solve");

        orch.cancel_token().cancel();
        let err = orch.run_calibration(&images, &board, &solver).unwrap_err();
        assert_eq!(err, CalibrationError::Cancelled);
        assert_eq!(orch.status(), CalibrationStatus::Succeeded);
        assert_eq!(solver.calls.get(), 1);

        assert!(!orch.cancel_token().is_cancelled());
        orch.run_calibration(&images, &board, &solver)
            .expect("next call is not cancelled");
        assert_eq!(solver.calls.get(), 2);
    }

    /// Blocks inside the solve until the test lets it go.
    struct GatedSolver {
        entered: Barrier,
        release: Barrier,
    }

    impl CalibrationSolver for GatedSolver {
        fn calibrate(
            &self,
            corners_per_image: &[Vec<Point2<f32>>],
            ids_per_image: &[Vec<u32>],
            board: &BoardSpec,
            image_size: ImageSize,
        ) -> Result<SolverOutput, SolverError> {
            self.entered.wait();
            self.release.wait();
            FixedSolver::ok().calibrate(corners_per_image, ids_per_image, board, image_size)
        }
    }

    #[test]
    fn cancel_during_solve_waits_for_the_solver() {
        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA), (seen(6), VGA)], board);
        let orch = CalibrationOrchestrator::default();
        let solver = GatedSolver {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        };

        let outcome = thread::scope(|scope| {
            let run = scope.spawn(|| orch.run_calibration(&images, &board, &solver));
            solver.entered.wait();
            orch.cancel_token().cancel();
            solver.release.wait();
            run.join().expect("calibration thread")
        });

        let result = outcome.expect("solve finishes despite the request");
        assert_eq!(orch.status(), CalibrationStatus::Succeeded);
        assert!(orch.result().is_some_and(|stored| Arc::ptr_eq(&stored, &result)));
        assert!(!orch.cancel_token().is_cancelled());
        orch.run_calibration(&images, &board, &FixedSolver::ok())
            .expect("next call is not cancelled");
    }

    #[test]
    fn reset_drops_result() {
        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA)], board);
        let orch = CalibrationOrchestrator::default();
        orch.run_calibration(&images, &board, &FixedSolver::ok())
            .expect("solve");
        assert!(orch.result().is_some());
        orch.reset().expect("reset");
        assert_eq!(orch.status(), CalibrationStatus::NotRun);
        assert!(orch.result().is_none());
    }

    #[test]
    fn panicking_solver_leaves_failed_status() {
        struct Boom;
        impl CalibrationSolver for Boom {
            fn calibrate(
                &self,
                _: &[Vec<Point2<f32>>],
                _: &[Vec<u32>],
                _: &BoardSpec,
                _: ImageSize,
            ) -> Result<SolverOutput, SolverError> {
                panic!("numerical library crashed");
            }
        }

        let board = BoardSpec::default();
        let images = images_with(&[(seen(6), VGA)], board);
        let orch = CalibrationOrchestrator::default();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            orch.run_calibration(&images, &board, &Boom)
        }));
        assert!(outcome.is_err());
        assert_eq!(orch.status(), CalibrationStatus::Failed);
        assert!(orch.run_calibration(&images, &board, &FixedSolver::ok()).is_ok());
    }

    /// Returns no poses at all.
    struct ShortSolver;

    impl CalibrationSolver for ShortSolver {
        fn calibrate(
            &self,
            _: &[Vec<Point2<f32>>],
            _: &[Vec<u32>],
            _: &BoardSpec,
            _: ImageSize,
        ) -> Result<SolverOutput, SolverError> {
            Ok(SolverOutput {
                intrinsics: Matrix3::identity(),
                distortion: Vec::new(),
                poses: Vec::new(),
                reprojection_error: 0.1,
            })
        }
    }
}
