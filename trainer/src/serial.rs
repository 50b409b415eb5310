use std::{
    io::{self, BufRead, BufReader},
    time::Instant,
};

use ftrl_core::{data, log_loss, Float, FtrlHyper, FtrlSolver, SparseVec};

use crate::{
    config::{is_stdin, TrainOptions},
    error::{Result, TrainError},
    eval::evaluate_file,
    progress::{report, EpochStats, ProgressFn},
};

type Input = data::SampleReader<Box<dyn BufRead + Send>>;

fn open_input(opts: &TrainOptions) -> io::Result<Input> {
    let src: Box<dyn BufRead + Send> = if is_stdin(&opts.train_file) {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(std::fs::File::open(&opts.train_file)?))
    };
    Ok(data::SampleReader::new(src))
}

/// Single-threaded training: the base solver straight over the input.
///
/// Used when the worker count is 1 and for unseekable input, where only one
/// pass is meaningful and the epoch count is forced to 1.
pub fn train<T: Float>(opts: &TrainOptions, progress: Option<&ProgressFn>) -> Result<()> {
    let stdin_mode = is_stdin(&opts.train_file);
    let epochs = if stdin_mode {
        if opts.epochs > 1 {
            log::warn!("input is a stream, forcing a single epoch");
        }
        1
    } else {
        opts.epochs
    };

    let feat_num = if stdin_mode {
        opts.feat_num
    } else {
        let info = data::scan_problem_info::<T>(&opts.train_file, 0, opts.cache)?;
        if opts.feat_num > 0 {
            opts.feat_num
        } else {
            info.features
        }
    };

    let mut solver = match &opts.start_from {
        Some(path) => FtrlSolver::<T>::from_file(path, opts.seed)?,
        None => {
            if feat_num == 0 {
                return Err(TrainError::InvalidConfig(
                    "feature count is zero; scan found no features and none was given".into(),
                ));
            }
            FtrlSolver::new(
                FtrlHyper::new(
                    T::from_f64(opts.alpha),
                    T::from_f64(opts.beta),
                    T::from_f64(opts.l1),
                    T::from_f64(opts.l2),
                    feat_num,
                    T::from_f64(opts.dropout),
                ),
                opts.seed,
            )
        }
    };

    log::info!(
        "params={{alpha:{:.2}, beta:{:.2}, l1:{:.2}, l2:{:.2}, dropout:{:.2}, epoch:{epochs}}}",
        opts.alpha,
        opts.beta,
        opts.l1,
        opts.l2,
        opts.dropout
    );

    for epoch in 0..epochs {
        let start = Instant::now();
        let reader = open_input(opts)?;

        let mut x: SparseVec<T> = Vec::new();
        let mut samples = 0usize;
        let mut loss = 0f64;

        while let Some(y) = reader.read_sample(&mut x) {
            let pred = solver.update(&x, y);
            loss += log_loss(y, pred).to_f64();
            samples += 1;

            if samples % 100_000 == 0 {
                log::debug!(
                    "epoch={epoch} processed=[{samples}] train-loss=[{:.6}]",
                    loss / samples as f64
                );
            }
        }

        report(
            progress,
            &EpochStats {
                epoch,
                samples,
                mean_loss: loss / samples.max(1) as f64,
                elapsed: start.elapsed(),
            },
        );

        if let Some(test_file) = &opts.test_file {
            let stats = evaluate_file(test_file, |x| solver.predict(x), 0)?;
            log::info!("epoch={epoch} validation-loss=[{:.6}]", stats.mean_loss);
        }
    }

    solver.save_model_all(&opts.model_file)?;
    Ok(())
}
