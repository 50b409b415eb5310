use crate::numeric::Float;

/// Sparse feature vector: ordered `(index, value)` pairs.
pub type SparseVec<T> = Vec<(usize, T)>;

/// Parses one LIBSVM-style line into a label and sparse features.
///
/// The first whitespace-separated token is the label (negatives clamp to 0);
/// the rest are `index:value` pairs. A malformed pair is dropped on its own,
/// the remaining tokens still contribute. Returns `None` when the label is
/// missing or unparsable; `x` is cleared and refilled on success.
pub fn parse_line<T: Float>(line: &str, x: &mut SparseVec<T>) -> Option<T> {
    let mut tokens = line.split_ascii_whitespace();
    let mut y = tokens.next()?.parse::<T>().ok()?;
    if y < T::zero() {
        y = T::zero();
    }

    x.clear();
    for token in tokens {
        let Some((idx, val)) = token.split_once(':') else {
            continue;
        };
        let Ok(idx) = idx.parse::<usize>() else {
            continue;
        };
        let Ok(val) = val.parse::<T>() else {
            continue;
        };
        x.push((idx, val));
    }

    Some(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<(f64, SparseVec<f64>)> {
        let mut x = Vec::new();
        parse_line(line, &mut x).map(|y| (y, x))
    }

    #[test]
    fn parses_label_and_pairs() {
        let (y, x) = parse("1 0:1 1:2").unwrap();
        assert_eq!(y, 1.0);
        assert_eq!(x, vec![(0, 1.0), (1, 2.0)]);
    }

    #[test]
    fn negative_labels_clamp_to_zero() {
        let (y, x) = parse("-1 2:1").unwrap();
        assert_eq!(y, 0.0);
        assert_eq!(x, vec![(2, 1.0)]);
    }

    #[test]
    fn unparsable_label_rejects_the_line() {
        assert!(parse("garbage").is_none());
        assert!(parse("").is_none());
        assert!(parse("   \t ").is_none());
    }

    #[test]
    fn malformed_pairs_are_dropped_individually() {
        let (y, x) = parse("1 0:bad 3:4").unwrap();
        assert_eq!(y, 1.0);
        assert_eq!(x, vec![(3, 4.0)]);

        let (_, x) = parse("1 nocolon -2:5 1:7").unwrap();
        assert_eq!(x, vec![(1, 7.0)]);
    }

    #[test]
    fn bare_label_yields_empty_features() {
        let (y, x) = parse("0").unwrap();
        assert_eq!(y, 0.0);
        assert!(x.is_empty());
    }

    #[test]
    fn tabs_count_as_separators() {
        let (y, x) = parse("1\t0:1\t5:2.5\n").unwrap();
        assert_eq!(y, 1.0);
        assert_eq!(x, vec![(0, 1.0), (5, 2.5)]);
    }
}
