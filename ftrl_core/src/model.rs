use std::path::Path;

use crate::{
    error::Result,
    numeric::{sigmoid, Float},
    persist,
};

/// Weights-only logistic model for inference.
///
/// Loads the flat weights file written by the solver; feature index is
/// implied by line position. Indices beyond the stored dimension score as
/// zero.
#[derive(Debug)]
pub struct LrModel<T: Float> {
    weights: Vec<T>,
}

impl<T: Float> LrModel<T> {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            weights: persist::read_weights(path.as_ref())?,
        })
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn predict(&self, x: &[(usize, T)]) -> T {
        let mut wtx = T::zero();

        for &(idx, val) in x {
            if idx >= self.weights.len() {
                continue;
            }
            wtx += self.weights[idx] * val;
        }

        sigmoid(wtx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::approx_eq;

    #[test]
    fn scores_match_the_stored_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model");
        persist::write_weights(&path, [1.0f64, -2.0, 0.0].into_iter()).unwrap();

        let model = LrModel::<f64>::from_file(&path).unwrap();
        assert_eq!(model.len(), 3);

        let p = model.predict(&[(0, 2.0), (1, 1.0)]);
        assert!(approx_eq(p, sigmoid(0.0)));

        // Out-of-range indices contribute nothing.
        assert_eq!(p, model.predict(&[(0, 2.0), (1, 1.0), (10, 99.0)]));
    }
}
