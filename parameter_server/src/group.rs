use std::ops::Range;

/// Width of one parameter group. The push/fetch protocol is correct for any
/// width >= 1; this is a contention/traffic tuning constant.
pub const GROUP_SIZE: usize = 10;

/// Number of groups covering a feature space of `feat_num` indices.
pub fn group_count(feat_num: usize) -> usize {
    feat_num.div_ceil(GROUP_SIZE)
}

/// The group a feature index belongs to.
pub fn group_of(idx: usize) -> usize {
    idx / GROUP_SIZE
}

/// The index range `[start, end)` covered by `group`; the last group may be
/// shorter than `GROUP_SIZE`.
pub fn group_range(group: usize, feat_num: usize) -> Range<usize> {
    let start = group * GROUP_SIZE;
    start..(start + GROUP_SIZE).min(feat_num)
}
