use std::path::Path;

use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};

use ftrl_core::{feature_dropped, sigmoid, Float, FtrlHyper, Result};

use crate::group::{group_count, group_of, group_range, GROUP_SIZE};

/// One lock-protected slice of the global `n`,`z` arrays.
#[derive(Debug)]
struct ParamGroup<T> {
    n: Box<[T]>,
    z: Box<[T]>,
}

/// Sharded FTRL parameter store shared by all workers.
///
/// The index space is split into fixed-width groups, each guarded by its own
/// mutex, so workers touching disjoint groups never contend. All access to
/// `n`,`z` goes through [`fetch_group`](Self::fetch_group) and
/// [`push_group`](Self::push_group); once a push returns, its deltas are
/// visible to every subsequent fetch of that group. There is no cross-group
/// ordering.
#[derive(Debug)]
pub struct FtrlParamServer<T: Float> {
    hyper: FtrlHyper<T>,
    groups: Box<[Mutex<ParamGroup<T>>]>,
    rng: StdRng,
}

impl<T: Float> FtrlParamServer<T> {
    /// Creates a zero-state server.
    ///
    /// # Arguments
    /// * `hyper` - Hyperparameters shared with every worker.
    /// * `seed` - Dropout RNG seed for the burn-in path; `None` seeds from
    ///   the OS.
    pub fn new(hyper: FtrlHyper<T>, seed: Option<u64>) -> Self {
        let feat_num = hyper.feat_num();
        Self::from_parts(
            hyper,
            vec![T::zero(); feat_num],
            vec![T::zero(); feat_num],
            seed,
        )
    }

    /// Restores a server from a full-state file (warm restart).
    pub fn from_file(path: impl AsRef<Path>, seed: Option<u64>) -> Result<Self> {
        let (hyper, n, z) = ftrl_core::read_state(path.as_ref())?;
        Ok(Self::from_parts(hyper, n, z, seed))
    }

    fn from_parts(hyper: FtrlHyper<T>, n: Vec<T>, z: Vec<T>, seed: Option<u64>) -> Self {
        let feat_num = hyper.feat_num();
        debug_assert_eq!(n.len(), feat_num);
        debug_assert_eq!(z.len(), feat_num);

        let groups: Vec<_> = (0..group_count(feat_num))
            .map(|g| {
                let range = group_range(g, feat_num);
                Mutex::new(ParamGroup {
                    n: n[range.clone()].to_vec().into_boxed_slice(),
                    z: z[range].to_vec().into_boxed_slice(),
                })
            })
            .collect();

        Self {
            hyper,
            groups: groups.into_boxed_slice(),
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            },
        }
    }

    pub fn hyper(&self) -> &FtrlHyper<T> {
        &self.hyper
    }

    pub fn feat_num(&self) -> usize {
        self.hyper.feat_num()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Copies group `g` into the full-length caller buffers at `[start, end)`.
    ///
    /// # Panics
    /// If `g` is out of range or the buffers are shorter than the feature
    /// dimension (programmer error).
    pub fn fetch_group(&self, n_out: &mut [T], z_out: &mut [T], g: usize) {
        let range = group_range(g, self.hyper.feat_num());
        let group = self.groups[g].lock();

        n_out[range.clone()].copy_from_slice(&group.n);
        z_out[range].copy_from_slice(&group.z);
    }

    /// Copies the whole store into the caller's buffers, group by group.
    ///
    /// Each group is internally consistent; the combined snapshot carries no
    /// cross-group ordering guarantee.
    pub fn fetch_all(&self, n_out: &mut [T], z_out: &mut [T]) {
        for g in 0..self.groups.len() {
            self.fetch_group(n_out, z_out, g);
        }
    }

    /// Folds the caller's staged deltas for group `g` into the store and
    /// zeroes those delta entries in place.
    ///
    /// The zeroing is part of the contract: the caller's buffer is ready to
    /// accumulate again as soon as this returns.
    pub fn push_group(&self, n_delta: &mut [T], z_delta: &mut [T], g: usize) {
        let range = group_range(g, self.hyper.feat_num());
        let mut group = self.groups[g].lock();

        for (k, i) in range.enumerate() {
            group.n[k] += n_delta[i];
            group.z[k] += z_delta[i];
            n_delta[i] = T::zero();
            z_delta[i] = T::zero();
        }
    }

    /// One FTRL update applied directly to the sharded store.
    ///
    /// This is the burn-in path: the exclusive borrow keeps workers out, so
    /// the per-index group locks are uncontended. Semantics match the base
    /// solver update exactly.
    pub fn update(&mut self, x: &[(usize, T)], y: T) -> T {
        let mut touched: Vec<(usize, T, T)> = Vec::with_capacity(x.len());
        let mut wtx = T::zero();

        for &(idx, val) in x {
            if feature_dropped(self.hyper.dropout(), &mut self.rng) {
                continue;
            }
            if idx >= self.hyper.feat_num() {
                continue;
            }

            let (n_i, z_i) = self.read_nz(idx);
            let w = self.hyper.weight(n_i, z_i);
            touched.push((idx, w, val));
            wtx += w * val;
        }

        let pred = sigmoid(wtx);
        let grad = pred - y;

        for &(i, w_i, val) in &touched {
            let g_i = grad * val;
            let k = i - group_of(i) * GROUP_SIZE;
            let mut group = self.groups[group_of(i)].lock();

            let sigma = ((group.n[k] + g_i * g_i).sqrt() - group.n[k].sqrt()) / self.hyper.alpha();
            group.z[k] += g_i - sigma * w_i;
            group.n[k] += g_i * g_i;
        }

        pred
    }

    /// Scores a sample against the live store without mutating it.
    ///
    /// Safe to call concurrently (held-out evaluation); each feature reads
    /// its group under that group's lock.
    pub fn predict(&self, x: &[(usize, T)]) -> T {
        let mut wtx = T::zero();

        for &(idx, val) in x {
            if idx >= self.hyper.feat_num() {
                continue;
            }
            let (n_i, z_i) = self.read_nz(idx);
            wtx += self.hyper.weight(n_i, z_i) * val;
        }

        sigmoid(wtx)
    }

    /// Writes the derived weights from a group-consistent snapshot.
    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<()> {
        let (n, z) = self.snapshot();
        let weights = (0..self.hyper.feat_num()).map(|i| self.hyper.weight(n[i], z[i]));
        ftrl_core::write_weights(path.as_ref(), weights)
    }

    /// Writes the full `(hyper, n, z)` state for warm restarts.
    pub fn save_model_detail(&self, path: impl AsRef<Path>) -> Result<()> {
        let (n, z) = self.snapshot();
        ftrl_core::write_state(path.as_ref(), &self.hyper, &n, &z)
    }

    /// Writes the weights at `path` and the full state at `path.save`.
    pub fn save_model_all(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.save_model(path)?;
        self.save_model_detail(ftrl_core::detail_path(path))
    }

    fn snapshot(&self) -> (Vec<T>, Vec<T>) {
        let feat_num = self.hyper.feat_num();
        let mut n = vec![T::zero(); feat_num];
        let mut z = vec![T::zero(); feat_num];
        self.fetch_all(&mut n, &mut z);
        (n, z)
    }

    fn read_nz(&self, idx: usize) -> (T, T) {
        let g = group_of(idx);
        let k = idx - g * GROUP_SIZE;
        let group = self.groups[g].lock();
        (group.n[k], group.z[k])
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use ftrl_core::{approx_eq, FtrlSolver};

    use super::*;

    fn hyper(feat_num: usize) -> FtrlHyper<f64> {
        FtrlHyper::new(0.1, 1.0, 0.0, 0.0, feat_num, 0.0)
    }

    #[test]
    fn push_zeroes_the_callers_deltas() {
        const FEATS: usize = 25;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut n_delta = vec![1.0; FEATS];
        let mut z_delta = vec![-2.0; FEATS];

        server.push_group(&mut n_delta, &mut z_delta, 1);

        for i in 0..FEATS {
            let in_group = (10..20).contains(&i);
            assert_eq!(n_delta[i] == 0.0, in_group, "n_delta at {i}");
            assert_eq!(z_delta[i] == 0.0, in_group, "z_delta at {i}");
        }

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);
        for i in 0..FEATS {
            let in_group = (10..20).contains(&i);
            assert_eq!(n[i], if in_group { 1.0 } else { 0.0 });
            assert_eq!(z[i], if in_group { -2.0 } else { 0.0 });
        }
    }

    #[test]
    fn pushes_accumulate_and_fetches_observe_them() {
        const FEATS: usize = 12;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));

        for _ in 0..3 {
            let mut n_delta = vec![0.5; FEATS];
            let mut z_delta = vec![1.0; FEATS];
            server.push_group(&mut n_delta, &mut z_delta, 0);
            server.push_group(&mut n_delta, &mut z_delta, 1);
        }

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);
        assert!(n.iter().all(|&v| v == 1.5));
        assert!(z.iter().all(|&v| v == 3.0));
    }

    #[test]
    fn concurrent_pushes_to_one_group_never_lose_updates() {
        const FEATS: usize = 10;
        const THREADS: usize = 4;
        const ROUNDS: usize = 250;

        let server = FtrlParamServer::new(hyper(FEATS), Some(1));

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let mut n_delta = vec![0.0; FEATS];
                    let mut z_delta = vec![0.0; FEATS];
                    for _ in 0..ROUNDS {
                        n_delta.fill(1.0);
                        z_delta.fill(-1.0);
                        server.push_group(&mut n_delta, &mut z_delta, 0);
                        assert!(n_delta.iter().all(|&v| v == 0.0));
                    }
                });
            }
        });

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);

        let expected = (THREADS * ROUNDS) as f64;
        assert!(n.iter().all(|&v| v == expected));
        assert!(z.iter().all(|&v| v == -expected));
    }

    #[test]
    fn burn_in_update_matches_the_base_solver() {
        const FEATS: usize = 23;

        let mut server = FtrlParamServer::new(hyper(FEATS), Some(1));
        let mut solver = FtrlSolver::new(hyper(FEATS), Some(1));

        for k in 0..300 {
            let x = [(k % FEATS, 1.0), ((k * 7 + 3) % FEATS, -0.5)];
            let y = (k % 2) as f64;
            assert_eq!(server.update(&x, y), solver.update(&x, y));
        }

        let mut n = vec![0.0; FEATS];
        let mut z = vec![0.0; FEATS];
        server.fetch_all(&mut n, &mut z);
        assert_eq!(n, solver.n());
        assert_eq!(z, solver.z());
        assert!(n.iter().all(|&v| v >= 0.0));

        let probe = [(0, 1.0), (11, 2.0), (22, -1.0)];
        assert!(approx_eq(server.predict(&probe), solver.predict(&probe)));
    }

    #[test]
    fn state_round_trips_through_disk() {
        const FEATS: usize = 15;

        let mut server = FtrlParamServer::new(hyper(FEATS), Some(4));
        for k in 0..100 {
            server.update(&[(k % FEATS, 1.0)], (k % 2) as f64);
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        server.save_model_all(&path).unwrap();

        let restored =
            FtrlParamServer::<f64>::from_file(ftrl_core::detail_path(&path), Some(4)).unwrap();
        let probe = [(1, 1.0), (14, -2.0)];
        assert_eq!(server.predict(&probe), restored.predict(&probe));
        assert_eq!(restored.group_count(), 2);
    }
}
