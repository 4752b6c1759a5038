use once_cell::sync::OnceCell;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::types::QueryMode;

/// Observer for ranking latency and result counts.
pub trait MatchMetrics: Send + Sync {
    fn record_match(&self, mode: &QueryMode, latency: Duration, hit_count: usize);
}

static MATCH_METRICS: OnceCell<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceCell::new();

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    MATCH_METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    metrics_lock()
        .read()
        .ok()
        .and_then(|guard| guard.as_ref().cloned())
}

/// Install or clear the global match metrics recorder.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}
