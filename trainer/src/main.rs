use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use trainer::TrainOptions;

/// FTRL-Proximal trainer for L1/L2-regularized logistic regression over
/// sparse LIBSVM-format data.
#[derive(Parser, Debug)]
#[command(name = "ftrl_train", version)]
struct Cli {
    /// Training file; "stdin" or "-" reads standard input (single pass)
    #[arg(short = 'f', long = "train")]
    train: PathBuf,

    /// Held-out file evaluated after every epoch
    #[arg(short = 't', long = "test")]
    test: Option<PathBuf>,

    /// Output model file (full state goes to <model>.save)
    #[arg(short = 'm', long = "model")]
    model: PathBuf,

    /// Continue training from a <model>.save state file
    #[arg(long = "start-from")]
    start_from: Option<PathBuf>,

    /// Number of passes over the training data
    #[arg(long, default_value_t = 1)]
    epoch: usize,

    /// Learning-rate scale
    #[arg(long, default_value_t = ftrl_core::DEFAULT_ALPHA)]
    alpha: f64,

    /// Learning-rate offset
    #[arg(long, default_value_t = ftrl_core::DEFAULT_BETA)]
    beta: f64,

    /// L1 regularization strength
    #[arg(long, default_value_t = ftrl_core::DEFAULT_L1)]
    l1: f64,

    /// L2 regularization strength
    #[arg(long, default_value_t = ftrl_core::DEFAULT_L2)]
    l2: f64,

    /// Per-feature dropout rate in [0, 1)
    #[arg(long, default_value_t = 0.0)]
    dropout: f64,

    /// Push/fetch interval of the async protocol
    #[arg(long = "sync-step", default_value_t = worker::DEFAULT_PUSH_STEP)]
    sync_step: usize,

    /// Fraction of the data burned in single-threaded before the workers
    /// start
    #[arg(long = "burn-in", default_value_t = 0.0)]
    burn_in: f64,

    /// Worker threads; 1 trains serially, 0 uses hardware concurrency
    #[arg(long = "thread", default_value_t = 1)]
    thread: usize,

    /// Train in f64 instead of f32
    #[arg(long = "double-precision")]
    double_precision: bool,

    /// Skip the <train>.cache sidecar of the problem scan
    #[arg(long = "no-cache")]
    no_cache: bool,

    /// Base RNG seed for reproducible dropout
    #[arg(long)]
    seed: Option<u64>,

    /// Feature dimension override; required for stdin input
    #[arg(long = "feat-num", default_value_t = 0)]
    feat_num: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let opts = TrainOptions {
        train_file: cli.train,
        test_file: cli.test,
        model_file: cli.model,
        start_from: cli.start_from,
        epochs: cli.epoch,
        alpha: cli.alpha,
        beta: cli.beta,
        l1: cli.l1,
        l2: cli.l2,
        dropout: cli.dropout,
        push_step: cli.sync_step,
        fetch_step: cli.sync_step,
        burn_in: cli.burn_in,
        threads: cli.thread,
        cache: !cli.no_cache,
        seed: cli.seed,
        feat_num: cli.feat_num,
    };

    if cli.double_precision {
        trainer::train::<f64>(&opts, None).context("training failed")?;
    } else {
        trainer::train::<f32>(&opts, None).context("training failed")?;
    }

    Ok(())
}
