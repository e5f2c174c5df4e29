use std::ops::Range;

/// Splits `0..total` into at most `parts` contiguous, non-empty ranges whose
/// lengths differ by at most one.
pub fn split_range(total: u64, parts: usize) -> Vec<Range<u64>> {
    let parts = (parts.max(1) as u64).min(total);
    if parts == 0 {
        return Vec::new();
    }
    let chunk = total / parts;
    let remainder = total % parts;
    let mut ranges = Vec::with_capacity(parts as usize);
    let mut start = 0;
    for i in 0..parts {
        let len = chunk + u64::from(i < remainder);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Number of chunks to cut a search space into.
pub fn worker_chunks() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads() * 4
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}
