use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::Result,
    numeric::{approx_gt, approx_le, sigmoid, Float},
    persist,
};

pub const DEFAULT_ALPHA: f64 = 0.15;
pub const DEFAULT_BETA: f64 = 1.0;
pub const DEFAULT_L1: f64 = 1.0;
pub const DEFAULT_L2: f64 = 1.0;

/// Immutable FTRL-Proximal hyperparameters plus the feature dimension.
///
/// Shared verbatim between the base solver, the parameter server and the
/// workers; safe to read without locks once constructed.
#[derive(Debug, Clone, Copy)]
pub struct FtrlHyper<T: Float> {
    alpha: T,
    beta: T,
    l1: T,
    l2: T,
    dropout: T,
    feat_num: usize,
}

impl<T: Float> FtrlHyper<T> {
    /// Creates a new hyperparameter set.
    ///
    /// # Arguments
    /// * `alpha` - Learning-rate scale, must be positive.
    /// * `beta` - Learning-rate offset.
    /// * `l1` - L1 regularization strength.
    /// * `l2` - L2 regularization strength.
    /// * `feat_num` - The feature dimension `D`.
    /// * `dropout` - Per-feature dropout probability in `[0, 1)`.
    pub fn new(alpha: T, beta: T, l1: T, l2: T, feat_num: usize, dropout: T) -> Self {
        Self {
            alpha,
            beta,
            l1,
            l2,
            dropout,
            feat_num,
        }
    }

    pub fn alpha(&self) -> T {
        self.alpha
    }

    pub fn beta(&self) -> T {
        self.beta
    }

    pub fn l1(&self) -> T {
        self.l1
    }

    pub fn l2(&self) -> T {
        self.l2
    }

    pub fn dropout(&self) -> T {
        self.dropout
    }

    pub fn feat_num(&self) -> usize {
        self.feat_num
    }

    /// Derives the weight for one feature from its `(n, z)` statistics.
    ///
    /// The weight is never stored; it is recomputed on demand from whatever
    /// snapshot the caller holds:
    ///
    /// ```text
    /// w = 0                                            if |z| <= l1
    /// w = (sign(z) * l1 - z) / ((beta + sqrt(n)) / alpha + l2)   otherwise
    /// ```
    pub fn weight(&self, n_i: T, z_i: T) -> T {
        let sign = if z_i < T::zero() { -T::one() } else { T::one() };

        if approx_le(sign * z_i, self.l1) {
            T::zero()
        } else {
            (sign * self.l1 - z_i) / ((self.beta + n_i.sqrt()) / self.alpha + self.l2)
        }
    }
}

/// Draws a dropout decision for one feature.
///
/// Always `false` when `dropout` is zero so a configured-off dropout never
/// consumes randomness.
pub fn feature_dropped<T: Float, R: Rng>(dropout: T, rng: &mut R) -> bool {
    if !approx_gt(dropout, T::zero()) {
        return false;
    }

    T::from_f64(rng.random::<f64>()) < dropout
}

/// Single-threaded FTRL-Proximal solver for logistic regression.
///
/// Owns the dense `n` (accumulated squared gradient) and `z` (regularized
/// gradient proxy) arrays and mutates them in place on every update.
#[derive(Debug)]
pub struct FtrlSolver<T: Float> {
    hyper: FtrlHyper<T>,
    n: Box<[T]>,
    z: Box<[T]>,
    rng: StdRng,
}

impl<T: Float> FtrlSolver<T> {
    /// Creates a zero-state solver.
    ///
    /// # Arguments
    /// * `hyper` - Hyperparameters, fixed for the lifetime of the solver.
    /// * `seed` - Dropout RNG seed; `None` seeds from the OS.
    pub fn new(hyper: FtrlHyper<T>, seed: Option<u64>) -> Self {
        let feat_num = hyper.feat_num();

        Self {
            hyper,
            n: vec![T::zero(); feat_num].into_boxed_slice(),
            z: vec![T::zero(); feat_num].into_boxed_slice(),
            rng: seeded_rng(seed),
        }
    }

    /// Restores a solver from a full-state file written by
    /// [`save_model_detail`](Self::save_model_detail).
    pub fn from_file(path: impl AsRef<Path>, seed: Option<u64>) -> Result<Self> {
        let (hyper, n, z) = persist::read_state(path.as_ref())?;

        Ok(Self {
            hyper,
            n: n.into_boxed_slice(),
            z: z.into_boxed_slice(),
            rng: seeded_rng(seed),
        })
    }

    pub fn hyper(&self) -> &FtrlHyper<T> {
        &self.hyper
    }

    /// Accumulated squared-gradient statistics, one per feature.
    pub fn n(&self) -> &[T] {
        &self.n
    }

    /// Accumulated gradient-proxy statistics, one per feature.
    pub fn z(&self) -> &[T] {
        &self.z
    }

    /// Performs one FTRL update and returns the pre-update prediction.
    ///
    /// Two passes over the sample: the first derives the weight for every
    /// surviving feature (dropout mask applied, out-of-range indices
    /// skipped) and accumulates `wTx`; the second folds the per-feature
    /// gradient back into `n` and `z` using the exact weights the forward
    /// score was computed with.
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

            let w = self.hyper.weight(self.n[idx], self.z[idx]);
            touched.push((idx, w, val));
            wtx += w * val;
        }

        let pred = sigmoid(wtx);
        let grad = pred - y;

        for &(i, w_i, val) in &touched {
            let g_i = grad * val;
            let sigma = ((self.n[i] + g_i * g_i).sqrt() - self.n[i].sqrt()) / self.hyper.alpha();
            self.z[i] += g_i - sigma * w_i;
            self.n[i] += g_i * g_i;
        }

        pred
    }

    /// Scores a sample without dropout and without mutating any state.
    pub fn predict(&self, x: &[(usize, T)]) -> T {
        let mut wtx = T::zero();

        for &(idx, val) in x {
            if idx >= self.hyper.feat_num() {
                continue;
            }
            wtx += self.hyper.weight(self.n[idx], self.z[idx]) * val;
        }

        sigmoid(wtx)
    }

    /// Writes the derived weights, one per line in feature order.
    pub fn save_model(&self, path: impl AsRef<Path>) -> Result<()> {
        let weights = (0..self.hyper.feat_num()).map(|i| self.hyper.weight(self.n[i], self.z[i]));
        persist::write_weights(path.as_ref(), weights)
    }

    /// Writes the full `(hyper, n, z)` state for warm restarts.
    pub fn save_model_detail(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::write_state(path.as_ref(), &self.hyper, &self.n, &self.z)
    }

    /// Writes the weights at `path` and the full state at `path.save`.
    pub fn save_model_all(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.save_model(path)?;
        self.save_model_detail(persist::detail_path(path))
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
