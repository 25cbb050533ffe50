//! Scheduling primitives: calendar records, appointment lifecycle, and the
//! time-interval type the availability engine operates on.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A half-open time interval within a single day: `[start, end)`.
///
/// Two back-to-back appointments share a boundary instant without conflicting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    #[must_use]
    pub const fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// True when the interval covers no time at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Half-open overlap test: `[a, b)` intersects `[c, d)` iff `a < d && b > c`.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// True when `other` lies entirely within this interval.
    #[must_use]
    pub fn encloses(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Parses a wall-clock time in the `HH:MM` wire/storage format.
#[must_use]
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Formats a wall-clock time into the `HH:MM` wire/storage format.
#[must_use]
pub fn format_hhmm(value: NaiveTime) -> String {
    value.format("%H:%M").to_string()
}

/// Weekday as persisted on schedule records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl DayOfWeek {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }
}

/// Appointment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Draft,
    Pending,
    Confirmed,
    CheckedIn,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that occupy their time slot for availability purposes.
    ///
    /// `Rescheduled` marks the superseded record and does not block.
    #[must_use]
    pub const fn blocks_slot(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::CheckedIn | Self::InProgress)
    }

    /// Statuses from which a customer may still cancel or reschedule.
    #[must_use]
    pub const fn accepts_changes(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Parses the persisted/wire spelling produced by [`Self::as_str`].
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "checked_in" => Some(Self::CheckedIn),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "no_show" => Some(Self::NoShow),
            "rescheduled" => Some(Self::Rescheduled),
            _ => None,
        }
    }

    /// The spellings that occupy a slot, for storage-level filters.
    #[must_use]
    pub fn blocking_labels() -> Vec<String> {
        [Self::Pending, Self::Confirmed, Self::CheckedIn, Self::InProgress]
            .into_iter()
            .map(|status| status.as_str().to_owned())
            .collect()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::CheckedIn => "checked_in",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
            Self::Rescheduled => "rescheduled",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable salon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Salon {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub is_active: bool,
    pub is_accepting_bookings: bool,
    #[serde(default)]
    pub rating_average: f64,
    #[serde(default)]
    pub rating_count: u32,
}

/// A service offered by a salon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub salon_id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub base_price: f64,
    pub is_active: bool,
}

/// A staff member who can be booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: String,
    pub salon_id: String,
    pub display_name: String,
    #[serde(default)]
    pub title: String,
    pub is_active: bool,
}

/// Salon-wide opening hours for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingHours {
    pub salon_id: String,
    pub day: DayOfWeek,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub is_closed: bool,
}

impl OperatingHours {
    /// The bookable window, or `None` when the salon is closed that day.
    #[must_use]
    pub fn window(&self) -> Option<TimeRange> {
        if self.is_closed {
            return None;
        }
        let range = TimeRange::new(self.open_time, self.close_time);
        if range.is_empty() { None } else { Some(range) }
    }
}

/// A staff member's working window for one weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffSchedule {
    pub staff_id: String,
    pub salon_id: String,
    pub day: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl StaffSchedule {
    #[must_use]
    pub const fn window(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// A booked appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub salon_id: String,
    pub staff_id: String,
    pub customer_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    pub total_price: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    pub booked_at: DateTime<Utc>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Wall-clock start in the salon's local calendar.
    #[must_use]
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    #[must_use]
    pub const fn slot(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// One booked service line on an appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentServiceLine {
    pub appointment_id: String,
    pub service_id: String,
    pub price: f64,
    pub duration_minutes: u32,
}
