//! Commit timeline scheduling
//!
//! Spreads a repository's commits across a backdated window ending now.
//! Draws are uniform over the window, then sorted, then nudged apart so
//! no two commits share a calendar minute. The result is deliberately
//! irregular: bursts and gaps, not an even grid.

use chrono::{Duration, Utc};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

use super::types::Timeline;

/// Errors produced while scheduling a commit timeline
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("history window must span at least one day, got {0}")]
    InvalidHistoryDays(i64),
    #[error("a repository needs at least one commit, got {0}")]
    InvalidCommitCount(usize),
}

const SECS_PER_DAY: i64 = 86_400;
/// Smallest forward shift applied when two draws land on the same minute
const MIN_COLLISION_SHIFT_SECS: i64 = 60;
/// Largest forward shift applied when two draws land on the same minute
const MAX_COLLISION_SHIFT_SECS: i64 = 300;

/// Produce `commit_count` strictly increasing timestamps inside the
/// window `(now - history_days, now]`, each on a distinct minute.
pub fn schedule<R: Rng>(
    history_days: i64,
    commit_count: usize,
    rng: &mut R,
) -> Result<Timeline, ScheduleError> {
    if history_days < 1 {
        return Err(ScheduleError::InvalidHistoryDays(history_days));
    }
    if commit_count < 1 {
        return Err(ScheduleError::InvalidCommitCount(commit_count));
    }

    let now = Utc::now();
    let window_secs = history_days * SECS_PER_DAY;
    let start = now - Duration::seconds(window_secs);

    // Offsets in seconds from the window start. 1..=window keeps every
    // draw inside the half-open window and allows landing exactly on now.
    let mut offsets: Vec<i64> = (0..commit_count)
        .map(|_| rng.gen_range(1..=window_secs))
        .collect();
    offsets.sort_unstable();

    // Two commits on the same minute read as machine-generated. Push the
    // later one forward by a randomized shift; repeated collisions cascade.
    for i in 1..offsets.len() {
        if offsets[i] / 60 <= offsets[i - 1] / 60 {
            offsets[i] =
                offsets[i - 1] + rng.gen_range(MIN_COLLISION_SHIFT_SECS..=MAX_COLLISION_SHIFT_SECS);
        }
    }

    // Cascading shifts can run past the window end. Walk back from the
    // tail, capping each offset so the sequence stays strictly increasing
    // and never lands in the future. The floor keeps caps inside the
    // window even when the commit count exceeds the window's seconds;
    // ordering degrades to non-strict only in that oversubscribed case.
    let count = offsets.len();
    for i in (0..count).rev() {
        let cap = (window_secs - (count - 1 - i) as i64).max(1);
        if offsets[i] > cap {
            offsets[i] = cap;
        } else {
            break;
        }
    }

    let timeline: Timeline = offsets
        .into_iter()
        .map(|offset| start + Duration::seconds(offset))
        .collect();

    debug!(
        commits = timeline.len(),
        days = history_days,
        first = %timeline[0],
        last = %timeline[timeline.len() - 1],
        "scheduled commit timeline"
    );
    Ok(timeline)
}
