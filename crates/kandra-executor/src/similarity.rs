/// Ratcliff/Obershelp matching-blocks ratio, equivalent to Python's
/// `difflib.SequenceMatcher(None, a, b).ratio()`. No crate in the corpus
/// provides this, so it's hand-rolled here rather than pulled in as an
/// external dependency for one call site.
///
/// Ratio is `2 * M / T` where `M` is the total length of all matching
/// blocks found by recursively taking the longest common contiguous
/// substring of the unmatched remainders, and `T` is the combined length
/// of both strings.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_blocks_length(&a, &b);
    (2 * matches) as f64 / total as f64
}

fn matching_blocks_length(a: &[char], b: &[char]) -> usize {
    let (pos_a, pos_b, len) = longest_match(a, b);
    if len == 0 {
        return 0;
    }
    let mut total = len;
    total += matching_blocks_length(&a[..pos_a], &b[..pos_b]);
    total += matching_blocks_length(&a[pos_a + len..], &b[pos_b + len..]);
    total
}

/// Longest contiguous common substring of `a` and `b`: returns
/// `(start_in_a, start_in_b, length)`. O(len(a) * len(b)) dynamic
/// programming — acceptable for thought strings, which are at most a few
/// KiB of free text.
fn longest_match(a: &[char], b: &[char]) -> (usize, usize, usize) {
    if a.is_empty() || b.is_empty() {
        return (0, 0, 0);
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut best = (0, 0, 0);
    for i in 0..a.len() {
        let mut curr = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                let len = prev[j] + 1;
                curr[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = curr;
    }
    best
}
