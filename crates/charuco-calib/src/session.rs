use crate::io::{SessionConfig, SessionConfigError, SessionReport};
use charuco_calib_core::ImageStore;
use charuco_calib_pipeline::{
    aggregate, BoardDetector, CalibrationOrchestrator, CalibrationSolver, DetectionError,
    DetectionOrchestrator,
};
use log::{info, warn};

/// Failure that prevents a session from producing a report.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] SessionConfigError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
}

/// Run detection on every configured image, then calibrate.
///
/// Per-image problems are kept in the detection part of the report. A failed
/// calibration does not fail the call; its message lands in
/// [`SessionReport::error`].
pub fn run_session<S, D, V>(
    config: &SessionConfig,
    store: S,
    detector: &D,
    solver: &V,
) -> Result<SessionReport, SessionError>
where
    S: ImageStore,
    D: BoardDetector + ?Sized,
    V: CalibrationSolver + ?Sized,
{
    let board = config.build_board()?;
    let mut images = config.build_collection()?;
    let mut report = SessionReport::new(board);

    let detection =
        DetectionOrchestrator::new(store).run_detection(&mut images, &board, detector)?;
    report.detection = Some(detection);

    let agg = aggregate(&images);
    report.aggregation = Some(agg.summary());

    let calib = CalibrationOrchestrator::new(config.calibration.clone());
    match calib.run_calibration(&images, &board, solver) {
        Ok(result) => {
            info!(
                "session calibrated from {} of {} images",
                result.poses.len(),
                images.len()
            );
            report.calibration = Some((*result).clone());
        }
        Err(err) => {
            warn!("session finished without calibration: {err}");
            report.set_error(err);
        }
    }
    Ok(report)
}
