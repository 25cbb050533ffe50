use bloom_booking::slots::{generate_slots, has_conflict, mark_availability, slot_capacity};
use bloom_domain::scheduling::TimeRange;
use chrono::NaiveTime;
use proptest::prelude::*;

fn minutes(total: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(total / 60, total % 60, 0).unwrap()
}

prop_compose! {
    /// A non-empty window within one day.
    fn window()(start in 0u32..1380, len in 30u32..360) -> TimeRange {
        let end = (start + len).min(1439);
        TimeRange::new(minutes(start), minutes(end))
    }
}

prop_compose! {
    fn busy_list()(ranges in prop::collection::vec((0u32..1380, 15u32..120), 0..8)) -> Vec<TimeRange> {
        ranges
            .into_iter()
            .map(|(start, len)| TimeRange::new(minutes(start), minutes((start + len).min(1439))))
            .collect()
    }
}

proptest! {
    #[test]
    fn slots_stay_inside_the_window(window in window(), duration in 15u32..180, step in 5u32..60) {
        for slot in generate_slots(window, duration, step) {
            prop_assert!(slot.start >= window.start);
            prop_assert!(slot.end <= window.end);
        }
    }

    #[test]
    fn slots_have_the_requested_duration(window in window(), duration in 15u32..180, step in 5u32..60) {
        for slot in generate_slots(window, duration, step) {
            let span = (slot.end - slot.start).num_minutes();
            prop_assert_eq!(span, i64::from(duration));
        }
    }

    #[test]
    fn slot_starts_are_step_aligned(window in window(), duration in 15u32..180, step in 5u32..60) {
        for (index, slot) in generate_slots(window, duration, step).iter().enumerate() {
            let offset = (slot.start - window.start).num_minutes();
            let expected = i64::from(step) * i64::try_from(index).unwrap();
            prop_assert_eq!(offset, expected);
        }
    }

    #[test]
    fn overlap_is_symmetric(a in window(), b in window()) {
        prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
    }

    #[test]
    fn a_range_never_overlaps_what_follows_it(a in window()) {
        let follower = TimeRange::new(a.end, a.end);
        prop_assert!(!a.overlaps(&follower), "empty follower must not overlap");
    }

    #[test]
    fn marking_agrees_with_the_conflict_check(
        window in window(),
        duration in 15u32..180,
        step in 5u32..60,
        busy in busy_list(),
    ) {
        let marked = mark_availability(generate_slots(window, duration, step), &busy);
        for slot in marked {
            prop_assert_eq!(slot.available, !has_conflict(slot.range, &busy));
        }
    }

    #[test]
    fn available_slots_collide_with_nothing(
        window in window(),
        duration in 15u32..180,
        step in 5u32..60,
        busy in busy_list(),
    ) {
        let marked = mark_availability(generate_slots(window, duration, step), &busy);
        for slot in marked.iter().filter(|slot| slot.available) {
            for taken in &busy {
                prop_assert!(!slot.range.overlaps(taken));
            }
        }
    }

    #[test]
    fn capacity_matches_generated_slot_count_when_duration_equals_step(
        window in window(),
        step in 5u32..60,
    ) {
        let generated = generate_slots(window, step, step).len();
        let capacity = slot_capacity(window, step) as usize;
        prop_assert_eq!(generated, capacity);
    }
}
