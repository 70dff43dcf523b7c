//! Merge Engine
//!
//! Combines per-shard frame sequences into one priority-ordered sequence.
//!
//! ## Priority
//! ```text
//! offset   DESC   (a frame starting later wins)
//! length   DESC   (at equal offset, the longer frame wins)
//! argument order  (tie across sequences: the first sequence wins)
//! input order     (tie inside a sequence: the later element wins)
//! ```
//! Storage positions from different shards are not comparable, so they
//! never take part in the comparison. Inside one shard the query output
//! is already ordered by position, so the later append wins there.
//! The first frame in the merged output covering a byte position is the
//! one whose byte is visible there.

use std::cmp::Ordering;

use crate::shard::Frame;

/// Compare two frames by merge priority. `Greater` means `a` wins.
pub fn compare_priority(a: &Frame, b: &Frame) -> Ordering {
    a.descriptor
        .offset
        .cmp(&b.descriptor.offset)
        .then(a.descriptor.length.cmp(&b.descriptor.length))
}

/// Merge two ascending sequences into one sequence in priority order.
///
/// Both inputs must be ascending under [`compare_priority`] (what
/// `ShardLog::query` returns). Runs a single two-pointer pass from the
/// tails, O(|a| + |b|). On equal priority `a` goes first, and inside one
/// sequence the later element goes first.
pub fn merge(a: Vec<Frame>, b: Vec<Frame>) -> Vec<Frame> {
    if a.is_empty() {
        return b.into_iter().rev().collect();
    }
    if b.is_empty() {
        return a.into_iter().rev().collect();
    }

    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().rev().peekable();
    let mut b = b.into_iter().rev().peekable();

    loop {
        let take_a = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => compare_priority(x, y) != Ordering::Less,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        let next = if take_a { a.next() } else { b.next() };
        if let Some(frame) = next {
            merged.push(frame);
        }
    }

    merged
}

/// Merge any number of ascending sequences, pairwise and accumulating.
///
/// Earlier sequences win full ties.
pub fn merge_all<I>(sequences: I) -> Vec<Frame>
where
    I: IntoIterator<Item = Vec<Frame>>,
{
    // Accumulator is kept ascending so it can feed the next merge
    let mut accumulated: Vec<Frame> = Vec::new();
    for sequence in sequences {
        let mut merged = merge(accumulated, sequence);
        merged.reverse();
        accumulated = merged;
    }

    accumulated.reverse();
    accumulated
}
