//! Live feed payloads: booking updates, conflict notices, capacity snapshots,
//! and daily stats. These types cross the event bus and the WebSocket wire.

use crate::scheduling::TimeRange;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// What happened to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Created,
    Updated,
    Cancelled,
    Rescheduled,
}

impl UpdateKind {
    /// How loudly the feed should surface this update.
    #[must_use]
    pub const fn priority(self) -> Priority {
        match self {
            Self::Created | Self::Cancelled => Priority::High,
            Self::Rescheduled => Priority::Medium,
            Self::Updated => Priority::Low,
        }
    }
}

/// Display priority for feed consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A single booking change, broadcast to every subscriber of the salon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdate {
    pub kind: UpdateKind,
    pub appointment_id: String,
    pub salon_id: String,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub slot: Option<TimeRange>,
    pub timestamp: DateTime<Utc>,
}

/// Why two bookings collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    DoubleBooking,
    StaffUnavailable,
}

/// A detected booking conflict, pushed at high priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConflict {
    pub kind: ConflictKind,
    pub salon_id: String,
    pub description: String,
    pub detected_at: DateTime<Utc>,
}

/// Utilization snapshot for one salon day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityInfo {
    pub salon_id: String,
    pub date: NaiveDate,
    pub total_slots: u32,
    pub booked_slots: u32,
    pub available_slots: u32,
    pub utilization_pct: f64,
}

impl CapacityInfo {
    /// Builds a snapshot from slot counts; utilization is 0 for an empty day.
    #[must_use]
    pub fn from_counts(salon_id: String, date: NaiveDate, total: u32, booked: u32) -> Self {
        let booked = booked.min(total);
        let utilization_pct =
            if total == 0 { 0.0 } else { f64::from(booked) / f64::from(total) * 100.0 };
        Self {
            salon_id,
            date,
            total_slots: total,
            booked_slots: booked,
            available_slots: total - booked,
            utilization_pct,
        }
    }
}

/// Rolling per-salon counters for the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStats {
    pub total_today: u64,
    pub new_bookings: u64,
    pub cancellations: u64,
    pub modifications: u64,
}

impl FeedStats {
    /// Folds one update into the counters.
    pub const fn absorb(&mut self, kind: UpdateKind) {
        self.total_today += 1;
        match kind {
            UpdateKind::Created => self.new_bookings += 1,
            UpdateKind::Cancelled => self.cancellations += 1,
            UpdateKind::Updated | UpdateKind::Rescheduled => self.modifications += 1,
        }
    }
}
