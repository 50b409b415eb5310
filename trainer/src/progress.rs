use std::time::Duration;

/// What one finished epoch looked like.
#[derive(Debug, Clone, Copy)]
pub struct EpochStats {
    pub epoch: usize,
    pub samples: usize,
    pub mean_loss: f64,
    pub elapsed: Duration,
}

/// Per-epoch progress callback. Installed by the caller; when absent the
/// trainers fall back to [`log_epoch`].
pub type ProgressFn = dyn Fn(&EpochStats);

/// Default progress sink.
pub fn log_epoch(stats: &EpochStats) {
    log::info!(
        "epoch={} processed=[{}] time=[{:.2}s] train-loss=[{:.6}]",
        stats.epoch,
        stats.samples,
        stats.elapsed.as_secs_f64(),
        stats.mean_loss
    );
}

pub(crate) fn report(progress: Option<&ProgressFn>, stats: &EpochStats) {
    match progress {
        Some(f) => f(stats),
        None => log_epoch(stats),
    }
}
