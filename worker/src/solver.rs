use rand::{rngs::StdRng, SeedableRng};

use ftrl_core::{feature_dropped, sigmoid, Float, FtrlHyper};
use parameter_server::{group_count, group_of, FtrlParamServer};

pub const DEFAULT_PUSH_STEP: usize = 3;
pub const DEFAULT_FETCH_STEP: usize = 3;

/// One worker's view of the shared FTRL state.
///
/// The worker derives weights from a full-length local snapshot and stages
/// its updates in delta buffers. Per touched group it follows the
/// fetch-then-compute-then-stage-then-maybe-push protocol: every
/// `fetch_step`-th local step on a group refreshes the snapshot from the
/// server, every `push_step`-th step flushes the staged deltas. That bounds
/// the staleness of any group to `fetch_step` of this worker's steps while
/// keeping lock traffic to one group-sized critical section per interval.
#[derive(Debug)]
pub struct FtrlWorker<T: Float> {
    hyper: FtrlHyper<T>,
    n: Box<[T]>,
    z: Box<[T]>,
    n_delta: Box<[T]>,
    z_delta: Box<[T]>,
    group_step: Box<[usize]>,
    push_step: usize,
    fetch_step: usize,
    rng: StdRng,
}

impl<T: Float> FtrlWorker<T> {
    /// Creates a worker attached to `server`.
    ///
    /// Copies the server's hyperparameters and seeds the local snapshot with
    /// a full fetch.
    ///
    /// # Arguments
    /// * `server` - The shared parameter store.
    /// * `push_step` - Local steps per group between delta pushes, >= 1.
    /// * `fetch_step` - Local steps per group between snapshot fetches, >= 1.
    /// * `seed` - Dropout RNG seed; workers should get distinct seeds.
    pub fn new(
        server: &FtrlParamServer<T>,
        push_step: usize,
        fetch_step: usize,
        seed: Option<u64>,
    ) -> Self {
        assert!(push_step >= 1, "push_step must be >= 1");
        assert!(fetch_step >= 1, "fetch_step must be >= 1");

        let hyper = *server.hyper();
        let feat_num = hyper.feat_num();

        let mut n = vec![T::zero(); feat_num].into_boxed_slice();
        let mut z = vec![T::zero(); feat_num].into_boxed_slice();
        server.fetch_all(&mut n, &mut z);

        Self {
            hyper,
            n,
            z,
            n_delta: vec![T::zero(); feat_num].into_boxed_slice(),
            z_delta: vec![T::zero(); feat_num].into_boxed_slice(),
            group_step: vec![0; group_count(feat_num)].into_boxed_slice(),
            push_step,
            fetch_step,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            },
        }
    }

    /// Refreshes the local snapshot and zeroes the step counters.
    ///
    /// Called at the start of every epoch.
    pub fn reset(&mut self, server: &FtrlParamServer<T>) {
        server.fetch_all(&mut self.n, &mut self.z);
        self.group_step.fill(0);
    }

    /// One FTRL update against the local snapshot, synchronized with the
    /// server per the push/fetch protocol. Returns the prediction.
    pub fn update(&mut self, x: &[(usize, T)], y: T, server: &FtrlParamServer<T>) -> T {
        let mut touched: Vec<(usize, T, T)> = Vec::with_capacity(x.len());
        let mut wtx = T::zero();

        for &(idx, val) in x {
            if feature_dropped(self.hyper.dropout(), &mut self.rng) {
                continue;
            }
            if idx >= self.hyper.feat_num() {
                continue;
            }

            let w = self.hyper.weight(self.n[idx], self.z[idx]);
            touched.push((idx, w, val));
            wtx += w * val;
        }

        let pred = sigmoid(wtx);
        let grad = pred - y;

        for &(i, w_i, val) in &touched {
            let g = group_of(i);

            if self.group_step[g] % self.fetch_step == 0 {
                server.fetch_group(&mut self.n, &mut self.z, g);
            }

            let g_i = grad * val;
            let sigma = ((self.n[i] + g_i * g_i).sqrt() - self.n[i].sqrt()) / self.hyper.alpha();
            let dz = g_i - sigma * w_i;
            let dn = g_i * g_i;

            self.z[i] += dz;
            self.n[i] += dn;
            self.z_delta[i] += dz;
            self.n_delta[i] += dn;

            if self.group_step[g] % self.push_step == 0 {
                server.push_group(&mut self.n_delta, &mut self.z_delta, g);
            }

            self.group_step[g] += 1;
        }

        pred
    }

    /// Flushes every group's pending deltas to the server.
    ///
    /// Called at worker shutdown; afterwards both delta buffers are all
    /// zero.
    pub fn push_param(&mut self, server: &FtrlParamServer<T>) {
        for g in 0..self.group_step.len() {
            server.push_group(&mut self.n_delta, &mut self.z_delta, g);
        }
    }

    /// Staged (not yet pushed) squared-gradient deltas.
    pub fn n_delta(&self) -> &[T] {
        &self.n_delta
    }

    /// Staged (not yet pushed) gradient-proxy deltas.
    pub fn z_delta(&self) -> &[T] {
        &self.z_delta
    }
}

#[cfg(test)]
mod tests {
    use ftrl_core::FtrlSolver;
    use parameter_server::GROUP_SIZE;

    use super::*;

    fn hyper(feat_num: usize) -> FtrlHyper<f64> {
        FtrlHyper::new(0.1, 1.0, 0.0, 0.0, feat_num, 0.0)
    }

    fn sample(k: usize, feat_num: usize) -> ([(usize, f64); 2], f64) {
        let x = [(k % feat_num, 1.0), ((k * 5 + 2) % feat_num, -0.5)];
        (x, (k % 2) as f64)
    }

    #[test]
    fn lockstep_sync_matches_the_base_solver_exactly() {
        const FEATS: usize = 34;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut worker = FtrlWorker::new(&server, 1, 1, Some(2));
        let mut solver = FtrlSolver::new(hyper(FEATS), Some(3));

        for k in 0..500 {
            let (x, y) = sample(k, FEATS);
            assert_eq!(worker.update(&x, y, &server), solver.update(&x, y));
        }

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);
        assert_eq!(n, solver.n());
        assert_eq!(z, solver.z());
    }

    #[test]
    fn push_param_flushes_and_zeroes_every_delta() {
        const FEATS: usize = GROUP_SIZE * 3 + 4;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut worker = FtrlWorker::new(&server, 5, 5, Some(2));

        for k in 0..40 {
            let (x, y) = sample(k, FEATS);
            worker.update(&x, y, &server);
        }

        worker.push_param(&server);
        assert!(worker.n_delta().iter().all(|&v| v == 0.0));
        assert!(worker.z_delta().iter().all(|&v| v == 0.0));

        // Everything staged locally is now on the server.
        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);
        assert!(n.iter().all(|&v| v >= 0.0));
        assert!(n.iter().any(|&v| v > 0.0));
    }

    #[test]
    fn deferred_sync_still_accumulates_the_same_n() {
        // n is a sum of squared gradients pushed as deltas, so whatever the
        // staleness, the server total must equal the worker's local view
        // after a final flush.
        const FEATS: usize = 17;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut worker = FtrlWorker::new(&server, 3, 3, Some(2));

        for k in 0..200 {
            let (x, y) = sample(k, FEATS);
            worker.update(&x, y, &server);
        }
        worker.push_param(&server);

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);

        // A fresh fetch must agree with the worker's snapshot after it
        // resets (no pending deltas anywhere).
        worker.reset(&server);
        assert_eq!(&n[..], &worker.n[..]);
        assert_eq!(&z[..], &worker.z[..]);
    }

    #[test]
    fn reset_clears_counters_and_refreshes_the_snapshot() {
        const FEATS: usize = 12;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut worker = FtrlWorker::new(&server, 2, 2, Some(2));

        for k in 0..30 {
            let (x, y) = sample(k, FEATS);
            worker.update(&x, y, &server);
        }
        worker.push_param(&server);
        worker.reset(&server);

        assert!(worker.group_step.iter().all(|&s| s == 0));

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);
        assert_eq!(&n[..], &worker.n[..]);
        assert_eq!(&z[..], &worker.z[..]);
    }

    #[test]
    fn out_of_range_features_do_not_touch_state() {
        const FEATS: usize = 8;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut worker = FtrlWorker::new(&server, 1, 1, Some(2));

        let before: Vec<f64> = worker.n.to_vec();
        worker.update(&[(FEATS, 1.0), (FEATS + 100, 2.0)], 1.0, &server);
        assert_eq!(before, worker.n.to_vec());
        assert!(worker.n_delta().iter().all(|&v| v == 0.0));
    }
}
