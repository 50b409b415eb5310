mod config;
mod error;
mod eval;
mod parallel;
mod progress;
mod serial;

pub use config::{is_stdin, TrainOptions};
pub use error::{Result, TrainError};
pub use eval::{evaluate_file, EvalStats};
pub use progress::{log_epoch, EpochStats, ProgressFn};
pub use serial::train as train_serial;
pub use parallel::train as train_parallel;

use ftrl_core::Float;

/// Runs a full training session and writes the model.
///
/// A worker count of 1 (or stream input, where only one pass is meaningful)
/// trains serially with the base solver; anything else goes through the
/// parameter server with one solver per thread.
pub fn train<T: Float>(opts: &TrainOptions, progress: Option<&ProgressFn>) -> Result<()> {
    opts.validate()?;

    if opts.threads == 1 || is_stdin(&opts.train_file) {
        serial::train::<T>(opts, progress)
    } else {
        parallel::train::<T>(opts, progress)
    }
}
