//! Ratcliff-Obershelp string similarity
//!
//! `ratio(a, b)` is `2 * M / T` as an integer percentage, where `M` counts
//! the characters matched by repeatedly taking the longest common contiguous
//! block and recursing on what lies left and right of it, and `T` is the
//! combined length. Inputs are lower-cased first.
//!
//! The block search is order-dependent when several longest blocks tie, so
//! `ratio` scores both argument orders and keeps the larger count. The
//! result is symmetric and equals the one-directional ratio whenever that
//! one already is.

use std::collections::HashMap;

/// Similarity of two strings in `0..=100`, case-insensitive. Halves round
/// to even. An empty string scores 0 against anything, itself included.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let total = a.len() + b.len();

    let m = matching_characters(&a, &b).max(matching_characters(&b, &a));
    let r = 2.0 * m as f64 / total as f64;
    (100.0 * r).round_ties_even() as u8
}

/// Number of characters covered by the matching blocks of `a` and `b`.
pub fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, ch) in b.iter().enumerate() {
        b2j.entry(*ch).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest block `a[i..i+k] == b[j..j+k]` inside the given windows. Ties
/// go to the smallest `i`, then the smallest `j`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run length of the match ending at (i - 1, j), keyed by j
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(&a[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_k)
}
