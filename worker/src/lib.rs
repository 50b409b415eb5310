mod solver;

pub use solver::{FtrlWorker, DEFAULT_FETCH_STEP, DEFAULT_PUSH_STEP};
