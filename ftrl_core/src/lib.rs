pub mod data;
mod error;
mod model;
mod numeric;
mod persist;
mod sample;
mod solver;

pub use error::{CoreError, Result};
pub use model::LrModel;
pub use numeric::{
    approx_eq, approx_gt, approx_le, clamp_pred, log_loss, safe_exp, sigmoid, Float,
};
pub use persist::{detail_path, read_state, read_weights, write_state, write_weights};
pub use sample::{parse_line, SparseVec};
pub use solver::{
    feature_dropped, FtrlHyper, FtrlSolver, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_L1, DEFAULT_L2,
};
