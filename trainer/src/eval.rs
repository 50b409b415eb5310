use std::{io, path::Path, thread};

use parking_lot::Mutex;

use ftrl_core::{
    data::{resolve_threads, SampleReader},
    log_loss, Float, SparseVec,
};

/// Held-out evaluation result.
#[derive(Debug, Clone, Copy)]
pub struct EvalStats {
    pub samples: usize,
    pub mean_loss: f64,
}

/// Replays `path` through `predict` across `threads` threads and returns the
/// mean clamped log-loss.
///
/// Reuses the reader's multi-producer mode, so the file is consumed exactly
/// once however many threads run.
pub fn evaluate_file<T, F>(path: &Path, predict: F, threads: usize) -> io::Result<EvalStats>
where
    T: Float,
    F: Fn(&[(usize, T)]) -> T + Sync,
{
    let reader = SampleReader::open(path)?;
    let threads = resolve_threads(threads);
    let totals = Mutex::new((0usize, 0f64));

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let mut x: SparseVec<T> = Vec::new();
                let mut samples = 0usize;
                let mut loss = 0f64;

                while let Some(y) = reader.read_sample_shared(&mut x) {
                    loss += log_loss(y, predict(&x)).to_f64();
                    samples += 1;
                }

                let mut totals = totals.lock();
                totals.0 += samples;
                totals.1 += loss;
            });
        }
    });

    let (samples, loss) = totals.into_inner();
    Ok(EvalStats {
        samples,
        mean_loss: loss / samples.max(1) as f64,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ftrl_core::sigmoid;

    use super::*;

    #[test]
    fn mean_loss_over_a_constant_predictor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "1 0:1\n0 0:1\n1 0:1\n0 0:1\n").unwrap();

        // A zero-weight model scores 0.5 everywhere.
        let stats = evaluate_file(&path, |_: &[(usize, f64)]| sigmoid(0.0), 2).unwrap();
        assert_eq!(stats.samples, 4);
        assert!((stats.mean_loss - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn empty_file_reports_zero_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();

        let stats = evaluate_file(&path, |_: &[(usize, f32)]| 0.5, 3).unwrap();
        assert_eq!(stats.samples, 0);
        assert_eq!(stats.mean_loss, 0.0);
    }
}
