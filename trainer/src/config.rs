use std::path::{Path, PathBuf};

use ftrl_core::{DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_L1, DEFAULT_L2};
use worker::{DEFAULT_FETCH_STEP, DEFAULT_PUSH_STEP};

use crate::error::{Result, TrainError};

/// Everything a training run needs, as handed over by the command line.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Training file; `stdin` or `-` reads standard input (single pass).
    pub train_file: PathBuf,
    /// Optional held-out file evaluated after every epoch.
    pub test_file: Option<PathBuf>,
    /// Where the weights file goes; the full state goes to `<model>.save`.
    pub model_file: PathBuf,
    /// Full-state file to continue training from.
    pub start_from: Option<PathBuf>,
    pub epochs: usize,
    pub alpha: f64,
    pub beta: f64,
    pub l1: f64,
    pub l2: f64,
    pub dropout: f64,
    /// Local steps per group between delta pushes.
    pub push_step: usize,
    /// Local steps per group between snapshot fetches.
    pub fetch_step: usize,
    /// Fraction of the first epoch trained single-threaded before the
    /// workers start.
    pub burn_in: f64,
    /// Worker count; `1` trains serially, `0` uses hardware concurrency.
    pub threads: usize,
    /// Consult / write the `<train>.cache` sidecar during the problem scan.
    pub cache: bool,
    /// Base RNG seed; workers derive their own from it. `None` seeds from
    /// the OS.
    pub seed: Option<u64>,
    /// Explicit feature dimension, required for stdin input; `0` takes the
    /// scanned value.
    pub feat_num: usize,
}

impl TrainOptions {
    /// Options with the stock hyperparameters for the given paths.
    pub fn new(train_file: impl Into<PathBuf>, model_file: impl Into<PathBuf>) -> Self {
        Self {
            train_file: train_file.into(),
            test_file: None,
            model_file: model_file.into(),
            start_from: None,
            epochs: 1,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            l1: DEFAULT_L1,
            l2: DEFAULT_L2,
            dropout: 0.0,
            push_step: DEFAULT_PUSH_STEP,
            fetch_step: DEFAULT_FETCH_STEP,
            burn_in: 0.0,
            threads: 1,
            cache: true,
            seed: None,
            feat_num: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TrainError::InvalidConfig("epoch count must be >= 1".into()));
        }
        if self.alpha <= 0.0 {
            return Err(TrainError::InvalidConfig("alpha must be positive".into()));
        }
        if self.l1 < 0.0 || self.l2 < 0.0 || self.beta < 0.0 {
            return Err(TrainError::InvalidConfig(
                "beta, l1 and l2 must be non-negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(TrainError::InvalidConfig(
                "dropout must be in [0, 1)".into(),
            ));
        }
        if self.push_step == 0 || self.fetch_step == 0 {
            return Err(TrainError::InvalidConfig("sync step must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&self.burn_in) {
            return Err(TrainError::InvalidConfig(
                "burn-in fraction must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Whether a training path designates standard input.
pub fn is_stdin(path: &Path) -> bool {
    path == Path::new("stdin") || path == Path::new("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_options_pass_validation() {
        assert!(TrainOptions::new("train.txt", "model").validate().is_ok());
    }

    #[test]
    fn bad_ranges_are_rejected() {
        let mut opts = TrainOptions::new("train.txt", "model");
        opts.epochs = 0;
        assert!(opts.validate().is_err());

        let mut opts = TrainOptions::new("train.txt", "model");
        opts.dropout = 1.0;
        assert!(opts.validate().is_err());

        let mut opts = TrainOptions::new("train.txt", "model");
        opts.push_step = 0;
        assert!(opts.validate().is_err());

        let mut opts = TrainOptions::new("train.txt", "model");
        opts.alpha = 0.0;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn stdin_spellings() {
        assert!(is_stdin(Path::new("stdin")));
        assert!(is_stdin(Path::new("-")));
        assert!(!is_stdin(Path::new("data/stdin.txt")));
    }
}
