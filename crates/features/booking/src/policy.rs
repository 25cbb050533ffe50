//! Cancellation and reschedule eligibility windows.
//!
//! A change is allowed only while the appointment status still accepts changes
//! and the lead time before the start is at least the configured cutoff
//! (24 hours by default). The comparison is pure; callers supply `now`.

use bloom_domain::scheduling::AppointmentStatus;
use chrono::{Duration, NaiveDateTime};

/// Why a cancellation or reschedule was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDenial {
    /// The appointment starts too soon (or has already started).
    TooLate { cutoff_hours: i64 },
    /// The status no longer accepts changes.
    StatusLocked { status: AppointmentStatus },
}

impl std::fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLate { cutoff_hours } => write!(
                f,
                "appointments cannot be changed less than {cutoff_hours} hours in advance"
            ),
            Self::StatusLocked { status } => {
                write!(f, "appointment in status '{status}' cannot be changed")
            },
        }
    }
}

/// Lead-time policy for customer-initiated changes.
#[derive(Debug, Clone, Copy)]
pub struct ChangePolicy {
    cutoff_hours: i64,
}

impl ChangePolicy {
    #[must_use]
    pub const fn new(cutoff_hours: i64) -> Self {
        Self { cutoff_hours }
    }

    /// Checks whether an appointment may still be changed at `now`.
    ///
    /// # Errors
    /// Returns the denial reason; status gating is checked before lead time.
    pub fn check(
        &self,
        now: NaiveDateTime,
        starts_at: NaiveDateTime,
        status: AppointmentStatus,
    ) -> Result<(), PolicyDenial> {
        if !status.accepts_changes() {
            return Err(PolicyDenial::StatusLocked { status });
        }
        if starts_at - now < Duration::hours(self.cutoff_hours) {
            return Err(PolicyDenial::TooLate { cutoff_hours: self.cutoff_hours });
        }
        Ok(())
    }

    /// True when the change window is still open; convenience for list views
    /// that display `canCancel`/`canReschedule` flags.
    #[must_use]
    pub fn is_open(
        &self,
        now: NaiveDateTime,
        starts_at: NaiveDateTime,
        status: AppointmentStatus,
    ) -> bool {
        self.check(now, starts_at, status).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn changes_allowed_outside_the_cutoff() {
        let policy = ChangePolicy::new(24);
        assert!(policy.check(at(1, 9), at(2, 10), AppointmentStatus::Confirmed).is_ok());
        assert!(policy.check(at(1, 9), at(2, 9), AppointmentStatus::Pending).is_ok());
    }

    #[test]
    fn changes_refused_inside_the_cutoff() {
        let policy = ChangePolicy::new(24);
        let denial = policy.check(at(1, 9), at(2, 8), AppointmentStatus::Confirmed).unwrap_err();
        assert_eq!(denial, PolicyDenial::TooLate { cutoff_hours: 24 });
    }

    #[test]
    fn past_appointments_are_refused() {
        let policy = ChangePolicy::new(24);
        let denial = policy.check(at(2, 9), at(1, 9), AppointmentStatus::Confirmed).unwrap_err();
        assert!(matches!(denial, PolicyDenial::TooLate { .. }));
    }

    #[test]
    fn locked_statuses_are_refused_before_lead_time() {
        let policy = ChangePolicy::new(24);
        // Even with plenty of lead time, a completed appointment stays locked.
        let denial = policy.check(at(1, 9), at(20, 9), AppointmentStatus::Completed).unwrap_err();
        assert_eq!(denial, PolicyDenial::StatusLocked { status: AppointmentStatus::Completed });
    }

    #[test]
    fn zero_cutoff_allows_changes_until_start() {
        let policy = ChangePolicy::new(0);
        assert!(policy.is_open(at(1, 9), at(1, 10), AppointmentStatus::Pending));
        assert!(!policy.is_open(at(1, 11), at(1, 10), AppointmentStatus::Pending));
    }
}
