use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between a driver and a running pass.
///
/// Detection checks it between images; calibration checks it once, right
/// before handing the data to the solver. A request is scoped to the pass
/// that sees it: both orchestrators re-arm the token when a pass returns.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Re-arm the token for the next pass.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}
