use std::{
    ffi::OsString,
    fs,
    io,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    thread,
};

use parking_lot::Mutex;

use crate::{numeric::Float, sample::SparseVec};

use super::SampleReader;

/// What a scan of a training file learns: the sample count and the feature
/// dimension (`max index + 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemInfo {
    pub samples: usize,
    pub features: usize,
}

/// Resolves a requested thread count; `0` means hardware concurrency.
pub fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    } else {
        threads
    }
}

/// Sidecar cache path for a training file: `<path>.cache`.
pub fn cache_path(path: &Path) -> PathBuf {
    let mut os = OsString::from(path.as_os_str());
    os.push(".cache");
    PathBuf::from(os)
}

/// Counts samples and the feature dimension of a training file.
///
/// Runs the multi-producer reader across `threads` native threads and merges
/// the per-thread tallies. With `use_cache`, a valid `<path>.cache` sidecar
/// answers without opening the data file, and a fresh scan writes the
/// sidecar for next time. A cache write failure is logged and otherwise
/// ignored.
pub fn scan_problem_info<T: Float>(
    path: &Path,
    threads: usize,
    use_cache: bool,
) -> io::Result<ProblemInfo> {
    let cache = cache_path(path);
    let cache_existed = cache.exists();

    if use_cache && cache_existed {
        if let Some(info) = read_cache(&cache) {
            log::debug!(
                "using cached problem info from {}: {info:?}",
                cache.display()
            );
            return Ok(info);
        }
        log::warn!("ignoring malformed cache file {}", cache.display());
    }

    let reader = SampleReader::open(path)?;
    let threads = resolve_threads(threads);
    let merged = Mutex::new(ProblemInfo {
        samples: 0,
        features: 0,
    });

    thread::scope(|s| {
        for _ in 0..threads {
            s.spawn(|| {
                let mut x: SparseVec<T> = Vec::new();
                let mut samples = 0;
                let mut features = 0;

                while reader.read_sample_shared(&mut x).is_some() {
                    samples += 1;
                    for &(idx, _) in &x {
                        features = features.max(idx + 1);
                    }
                }

                let mut merged = merged.lock();
                merged.samples += samples;
                merged.features = merged.features.max(features);
            });
        }
    });

    let info = merged.into_inner();
    log::info!(
        "scanned {}: instances=[{}] features=[{}]",
        path.display(),
        info.samples,
        info.features
    );

    if use_cache && !cache_existed {
        if let Err(e) = write_cache(&cache, info) {
            log::warn!("failed to write cache file {}: {e}", cache.display());
        }
    }

    Ok(info)
}

fn read_cache(path: &Path) -> Option<ProblemInfo> {
    let text = fs::read_to_string(path).ok()?;
    let mut fields = text.split_ascii_whitespace();
    let samples = fields.next()?.parse().ok()?;
    let features = fields.next()?.parse().ok()?;
    Some(ProblemInfo { samples, features })
}

fn write_cache(path: &Path, info: ProblemInfo) -> io::Result<()> {
    fs::write(path, format!("{}\t{}\n", info.samples, info.features))
}
