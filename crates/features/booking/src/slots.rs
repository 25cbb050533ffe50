//! Candidate slot generation and overlap detection.
//!
//! Everything here is pure interval arithmetic over [`TimeRange`]; fetching the
//! working window and the busy intervals is the caller's job. Slots are
//! half-open, so a slot ending exactly when an appointment starts is free.

use bloom_domain::scheduling::TimeRange;
use chrono::Duration;

/// A candidate interval with its availability verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub range: TimeRange,
    pub available: bool,
}

/// Generates candidate slots of `duration_minutes` inside `window`, starting
/// every `step_minutes`.
///
/// A candidate is emitted only when it ends at or before the window close. A
/// duration longer than the window therefore yields nothing, as does a zero
/// duration or step.
#[must_use]
pub fn generate_slots(window: TimeRange, duration_minutes: u32, step_minutes: u32) -> Vec<TimeRange> {
    if window.is_empty() || duration_minutes == 0 || step_minutes == 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(i64::from(duration_minutes));
    let step = Duration::minutes(i64::from(step_minutes));

    let mut slots = Vec::new();
    let mut cursor = window.start;

    loop {
        let end = cursor + duration;
        // `+` on NaiveTime wraps at midnight; a wrapped end lands before the cursor.
        if end < cursor || end > window.end {
            break;
        }
        slots.push(TimeRange::new(cursor, end));

        let next = cursor + step;
        if next <= cursor {
            break;
        }
        cursor = next;
    }

    slots
}

/// True when `candidate` collides with any of the `busy` intervals.
#[must_use]
pub fn has_conflict(candidate: TimeRange, busy: &[TimeRange]) -> bool {
    busy.iter().any(|taken| candidate.overlaps(taken))
}

/// The busy intervals that collide with `candidate`, for conflict reporting.
#[must_use]
pub fn find_conflicts(candidate: TimeRange, busy: &[TimeRange]) -> Vec<TimeRange> {
    busy.iter().copied().filter(|taken| candidate.overlaps(taken)).collect()
}

/// Marks each candidate produced by [`generate_slots`] against the busy list.
#[must_use]
pub fn mark_availability(candidates: Vec<TimeRange>, busy: &[TimeRange]) -> Vec<Slot> {
    candidates
        .into_iter()
        .map(|range| Slot { range, available: !has_conflict(range, busy) })
        .collect()
}

/// Counts how many slots of `step_minutes` fit into `window`, ignoring
/// bookings. Used for capacity reporting.
#[must_use]
pub fn slot_capacity(window: TimeRange, step_minutes: u32) -> u32 {
    if window.is_empty() || step_minutes == 0 {
        return 0;
    }
    let span = (window.end - window.start).num_minutes();
    u32::try_from(span).unwrap_or_default() / step_minutes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::new(t(start.0, start.1), t(end.0, end.1))
    }

    #[test]
    fn generates_half_hour_steps_across_the_window() {
        let slots = generate_slots(range((9, 0), (12, 0)), 60, 30);
        assert_eq!(slots.len(), 5, "9:00..11:00 starts, hourly slots, 30m step");
        assert_eq!(slots[0], range((9, 0), (10, 0)));
        assert_eq!(slots[4], range((11, 0), (12, 0)));
    }

    #[test]
    fn last_slot_must_fit_before_close() {
        let slots = generate_slots(range((9, 0), (10, 30)), 45, 30);
        // 9:00-9:45 and 9:30-10:15 fit; 10:00-10:45 does not.
        assert_eq!(slots.len(), 2);
        assert_eq!(slots.last().copied(), Some(range((9, 30), (10, 15))));
    }

    #[test]
    fn oversized_duration_yields_nothing() {
        assert!(generate_slots(range((9, 0), (10, 0)), 90, 30).is_empty());
    }

    #[test]
    fn zero_duration_or_step_yields_nothing() {
        assert!(generate_slots(range((9, 0), (17, 0)), 0, 30).is_empty());
        assert!(generate_slots(range((9, 0), (17, 0)), 60, 0).is_empty());
    }

    #[test]
    fn conflicts_are_detected_for_partial_overlap() {
        let busy = vec![range((10, 0), (11, 0))];
        assert!(has_conflict(range((10, 30), (11, 30)), &busy));
        assert!(has_conflict(range((9, 30), (10, 30)), &busy));
        assert!(has_conflict(range((9, 0), (12, 0)), &busy), "enclosing interval conflicts");
        assert!(!has_conflict(range((11, 0), (12, 0)), &busy), "back-to-back is free");
        assert!(!has_conflict(range((9, 0), (10, 0)), &busy), "ending at start is free");
    }

    #[test]
    fn availability_marking_matches_conflicts() {
        let busy = vec![range((10, 0), (11, 0))];
        let slots = mark_availability(generate_slots(range((9, 0), (12, 0)), 60, 60), &busy);

        assert_eq!(slots.len(), 3);
        assert!(slots[0].available, "9:00-10:00");
        assert!(!slots[1].available, "10:00-11:00");
        assert!(slots[2].available, "11:00-12:00");
    }

    #[test]
    fn conflict_listing_returns_the_colliding_intervals() {
        let busy = vec![range((9, 0), (9, 30)), range((10, 0), (11, 0)), range((13, 0), (14, 0))];
        let hits = find_conflicts(range((9, 15), (10, 15)), &busy);
        assert_eq!(hits, vec![range((9, 0), (9, 30)), range((10, 0), (11, 0))]);
    }

    #[test]
    fn capacity_counts_whole_steps() {
        assert_eq!(slot_capacity(range((9, 0), (17, 0)), 30), 16);
        assert_eq!(slot_capacity(range((9, 0), (9, 45)), 30), 1);
        assert_eq!(slot_capacity(range((9, 0), (9, 0)), 30), 0);
        assert_eq!(slot_capacity(range((9, 0), (17, 0)), 0), 0);
    }
}
