use std::{thread, time::Instant};

use parking_lot::Mutex;

use ftrl_core::{approx_eq, data, log_loss, Float, FtrlHyper, SparseVec};
use parameter_server::FtrlParamServer;
use worker::FtrlWorker;

use crate::{
    config::{is_stdin, TrainOptions},
    error::{Result, TrainError},
    eval::evaluate_file,
    progress::{report, EpochStats, ProgressFn},
};

/// Multi-threaded training through the parameter server.
///
/// Per epoch: an optional single-threaded burn-in prefix (first epoch only),
/// a snapshot reset on every worker, then one worker thread per solver
/// draining the shared reader until end-of-stream. Workers flush their
/// staged deltas before joining. Two runs on two or more threads are not
/// bit-reproducible; per-group staleness stays bounded by the fetch step.
pub fn train<T: Float>(opts: &TrainOptions, progress: Option<&ProgressFn>) -> Result<()> {
    if is_stdin(&opts.train_file) {
        return Err(TrainError::InvalidConfig(
            "parallel training needs a re-readable input file".into(),
        ));
    }

    let threads = data::resolve_threads(opts.threads);
    let info = data::scan_problem_info::<T>(&opts.train_file, threads, opts.cache)?;
    let feat_num = if opts.feat_num > 0 {
        opts.feat_num
    } else {
        info.features
    };

    let mut server = match &opts.start_from {
        Some(path) => FtrlParamServer::<T>::from_file(path, opts.seed)?,
        None => {
            if feat_num == 0 {
                return Err(TrainError::InvalidConfig(
                    "feature count is zero; scan found no features and none was given".into(),
                ));
            }
            FtrlParamServer::new(
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

    let mut workers: Vec<FtrlWorker<T>> = (0..threads)
        .map(|i| {
            FtrlWorker::new(
                &server,
                opts.push_step,
                opts.fetch_step,
                opts.seed.map(|s| s.wrapping_add(1 + i as u64)),
            )
        })
        .collect();

    log::info!(
        "params={{alpha:{:.2}, beta:{:.2}, l1:{:.2}, l2:{:.2}, dropout:{:.2}, epoch:{}}} \
         threads={threads} push_step={} fetch_step={}",
        opts.alpha,
        opts.beta,
        opts.l1,
        opts.l2,
        opts.dropout,
        opts.epochs,
        opts.push_step,
        opts.fetch_step
    );

    for epoch in 0..opts.epochs {
        let start = Instant::now();
        let reader = data::SampleReader::open(&opts.train_file)?;

        if epoch == 0 && opts.burn_in > 0.0 {
            let target = (opts.burn_in * info.samples as f64) as usize;
            let mut x: SparseVec<T> = Vec::new();
            let mut samples = 0usize;
            let mut loss = 0f64;

            while samples < target {
                let Some(y) = reader.read_sample(&mut x) else {
                    break;
                };
                let pred = server.update(&x, y);
                loss += log_loss(y, pred).to_f64();
                samples += 1;
            }

            log::info!(
                "burn-in processed=[{samples}] time=[{:.2}s] train-loss=[{:.6}]",
                start.elapsed().as_secs_f64(),
                loss / samples.max(1) as f64
            );

            // Full burn-in consumed the whole pass; nothing left for the
            // workers this epoch.
            if approx_eq(opts.burn_in, 1.0) {
                continue;
            }
        }

        for w in &mut workers {
            w.reset(&server);
        }

        let totals = Mutex::new((0usize, 0f64));
        {
            let server = &server;
            let reader = &reader;
            let totals = &totals;

            thread::scope(|s| {
                for w in &mut workers {
                    s.spawn(move || {
                        let mut x: SparseVec<T> = Vec::new();
                        let mut samples = 0usize;
                        let mut loss = 0f64;

                        while let Some(y) = reader.read_sample_shared(&mut x) {
                            let pred = w.update(&x, y, server);
                            loss += log_loss(y, pred).to_f64();
                            samples += 1;
                        }

                        w.push_param(server);

                        let mut totals = totals.lock();
                        totals.0 += samples;
                        totals.1 += loss;
                    });
                }
            });
        }

        let (samples, loss) = totals.into_inner();
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
            let stats = evaluate_file(test_file, |x| server.predict(x), threads)?;
            log::info!("epoch={epoch} validation-loss=[{:.6}]", stats.mean_loss);
        }
    }

    server.save_model_all(&opts.model_file)?;
    Ok(())
}
