use serde::{Deserialize, Serialize};

/// Tuning knobs of the calibration orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    /// Number of views below which the solve is considered poorly posed.
    pub min_views: usize,
    /// Refuse to solve below `min_views` instead of only warning.
    ///
    /// Off by default: the solver's own convergence report is the authority
    /// on whether the data was enough.
    pub require_min_views: bool,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            min_views: 3,
            require_min_views: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let params: CalibrationParams =
            serde_json::from_str(r#"{ "require_min_views": true }"#).expect("parse");
        assert_eq!(params.min_views, 3);
        assert!(params.require_min_views);
    }
}
