//! Text formats for model artifacts.
//!
//! Two files make up a saved model: a weights file (one derived weight per
//! line, consumed by the standalone predictor) and a full-state file
//! (hyperparameters plus the raw `n`/`z` arrays, consumed by warm restarts).
//! Weights keep the fixed 8-fraction-digit format; state values use the
//! shortest round-trip rendering so a reload reproduces the same floats.

use std::{
    ffi::OsString,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Lines, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::{CoreError, Result},
    numeric::Float,
    solver::FtrlHyper,
};

/// Appends `.save` to a weights path, preserving any existing extension.
pub fn detail_path(path: &Path) -> PathBuf {
    let mut os = OsString::from(path.as_os_str());
    os.push(".save");
    PathBuf::from(os)
}

/// Writes one weight per line in feature order, `{:.8}` fixed format.
pub fn write_weights<T: Float>(path: &Path, weights: impl Iterator<Item = T>) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    for w in weights {
        writeln!(out, "{w:.8}")?;
    }

    out.flush()?;
    Ok(())
}

/// Reads a weights file back as a dense vector, index implied by position.
pub fn read_weights<T: Float>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut weights = Vec::new();

    for line in reader.lines() {
        for token in line?.split_ascii_whitespace() {
            let w = token.parse::<T>().map_err(|_| CoreError::Format {
                path: path.to_owned(),
                what: "unparsable weight",
            })?;
            weights.push(w);
        }
    }

    Ok(weights)
}

/// Writes the full-state file: a tab-separated header
/// `alpha beta l1 l2 D dropout`, then `D` lines of `n`, then `D` lines of `z`.
pub fn write_state<T: Float>(path: &Path, hyper: &FtrlHyper<T>, n: &[T], z: &[T]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);

    writeln!(
        out,
        "{}\t{}\t{}\t{}\t{}\t{}",
        hyper.alpha(),
        hyper.beta(),
        hyper.l1(),
        hyper.l2(),
        hyper.feat_num(),
        hyper.dropout()
    )?;

    for v in n {
        writeln!(out, "{v}")?;
    }
    for v in z {
        writeln!(out, "{v}")?;
    }

    out.flush()?;
    Ok(())
}

/// Reads a full-state file back into `(hyper, n, z)`.
pub fn read_state<T: Float>(path: &Path) -> Result<(FtrlHyper<T>, Vec<T>, Vec<T>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();

    let header = next_line(&mut lines, path, "missing header")?;
    let mut fields = header.split_ascii_whitespace();
    let mut field = |what| {
        fields
            .next()
            .ok_or(CoreError::Format {
                path: path.to_owned(),
                what,
            })
            .map(str::to_owned)
    };

    let alpha = parse_real::<T>(&field("missing alpha")?, path)?;
    let beta = parse_real::<T>(&field("missing beta")?, path)?;
    let l1 = parse_real::<T>(&field("missing l1")?, path)?;
    let l2 = parse_real::<T>(&field("missing l2")?, path)?;
    let feat_num = field("missing feature count")?
        .parse::<usize>()
        .map_err(|_| CoreError::Format {
            path: path.to_owned(),
            what: "unparsable feature count",
        })?;
    let dropout = parse_real::<T>(&field("missing dropout")?, path)?;

    let mut read_array = |what| -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(feat_num);
        for _ in 0..feat_num {
            let line = next_line(&mut lines, path, what)?;
            values.push(parse_real::<T>(line.trim(), path)?);
        }
        Ok(values)
    };

    let n = read_array("truncated n array")?;
    let z = read_array("truncated z array")?;

    Ok((FtrlHyper::new(alpha, beta, l1, l2, feat_num, dropout), n, z))
}

fn next_line(
    lines: &mut Lines<BufReader<File>>,
    path: &Path,
    what: &'static str,
) -> Result<String> {
    match lines.next() {
        Some(line) => Ok(line?),
        None => Err(CoreError::Format {
            path: path.to_owned(),
            what,
        }),
    }
}

fn parse_real<T: Float>(token: &str, path: &Path) -> Result<T> {
    token.parse::<T>().map_err(|_| CoreError::Format {
        path: path.to_owned(),
        what: "unparsable real",
    })
}
