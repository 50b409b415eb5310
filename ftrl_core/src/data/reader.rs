use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
};

use parking_lot::Mutex;

use crate::{
    numeric::Float,
    sample::{parse_line, SparseVec},
};

/// Streaming LIBSVM-style sample reader over a shared text source.
///
/// One reader feeds any number of threads. Two access modes are offered:
/// a serialized mode that parses inside the line lock using a reusable
/// buffer, and a multi-producer mode that holds the lock only long enough
/// to pull one line into a fresh buffer so parsing runs outside it.
///
/// Lines whose label does not parse are skipped in both modes; a read
/// error is treated as end-of-stream.
pub struct SampleReader<R> {
    inner: Mutex<LineSource<R>>,
}

struct LineSource<R> {
    src: R,
    buf: String,
}

impl SampleReader<BufReader<File>> {
    /// Opens a training or evaluation file.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read> SampleReader<BufReader<R>> {
    /// Wraps an arbitrary byte stream (e.g. stdin).
    pub fn from_reader(src: R) -> Self {
        Self::new(BufReader::new(src))
    }
}

impl<R: BufRead> SampleReader<R> {
    pub fn new(src: R) -> Self {
        Self {
            inner: Mutex::new(LineSource {
                src,
                buf: String::new(),
            }),
        }
    }

    /// Reads the next sample, holding the lock across read and parse.
    ///
    /// The internal line buffer is reused between calls (it grows to the
    /// longest line seen and stays there). Returns the label and fills `x`;
    /// `None` at end-of-stream.
    pub fn read_sample<T: Float>(&self, x: &mut SparseVec<T>) -> Option<T> {
        let mut inner = self.inner.lock();
        let LineSource { src, buf } = &mut *inner;

        loop {
            buf.clear();
            match src.read_line(buf) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }

            if let Some(y) = parse_line(buf, x) {
                return Some(y);
            }
        }
    }

    /// Reads the next sample, parsing outside the lock.
    ///
    /// Each call owns its line buffer, so concurrent callers receive
    /// disjoint lines and every caller observes end-of-stream.
    pub fn read_sample_shared<T: Float>(&self, x: &mut SparseVec<T>) -> Option<T> {
        loop {
            let mut line = String::new();
            {
                let mut inner = self.inner.lock();
                match inner.src.read_line(&mut line) {
                    Ok(0) | Err(_) => return None,
                    Ok(_) => {}
                }
            }

            if let Some(y) = parse_line(&line, x) {
                return Some(y);
            }
        }
    }
}
