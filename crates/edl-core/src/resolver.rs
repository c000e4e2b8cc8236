//! Maps the clock onto the active phase index.
//!
//! The result lies in `0..=starts.len()`, where `starts.len()` is the
//! past-the-end sentinel ("after the last phase").

use crate::clock::TimeBounds;

/// Resolve the active phase index.
///
/// `starts` must be strictly increasing. Runs in O(log n).
///
/// - Playing forward, the index is the last phase that has started, or the
///   sentinel once `time` is past the last start.
/// - Playing backward, the index is the phase containing `time`. Before the
///   first phase it resolves to `1` if currently on the last phase and `0`
///   otherwise, so a rate flip on a boundary cannot oscillate.
/// - Paused, times at or outside the bounds clamp to the first and last
///   phase; in between the forward rule applies.
#[must_use]
pub fn resolve_phase_index(
    time: f64,
    rate: f64,
    current: usize,
    starts: &[f64],
    bounds: TimeBounds,
) -> usize {
    let len = starts.len();
    if len == 0 {
        return 0;
    }

    let index = if rate > 0.0 {
        forward_index(time, starts)
    } else if rate < 0.0 {
        match first_start_after(time, starts) {
            0 if current == len - 1 => 1,
            0 => 0,
            next => next - 1,
        }
    } else if time <= bounds.min {
        0
    } else if time >= bounds.max {
        len - 1
    } else {
        forward_index(time, starts)
    };

    index.min(len)
}

/// Index of the first start strictly after `time`, or `starts.len()`.
fn first_start_after(time: f64, starts: &[f64]) -> usize {
    starts.partition_point(|&start| start <= time)
}

fn forward_index(time: f64, starts: &[f64]) -> usize {
    match first_start_after(time, starts) {
        next if next == starts.len() => next,
        next => next.saturating_sub(1),
    }
}
