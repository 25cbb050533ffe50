//! Day-level availability: assembles the working window, the busy intervals,
//! and the candidate slots into answers the booking API can serve.
//!
//! Busy intervals are cached per `(staff, date)` with a short TTL; booking
//! mutations invalidate the touched keys so freshly booked slots disappear
//! from availability immediately.

use crate::error::{BookingError, BookingErrorExt};
use crate::repo::AppointmentRepo;
use crate::slots::{Slot, generate_slots, has_conflict, mark_availability, slot_capacity};
use bloom_catalog::CatalogRepo;
use bloom_domain::config::BookingConfig;
use bloom_domain::feed::CapacityInfo;
use bloom_domain::scheduling::{DayOfWeek, TimeRange};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use moka::future::Cache;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Why a requested slot (or a whole day) is not bookable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDenial {
    /// The salon is closed that day.
    SalonClosed,
    /// The staff member has no working window that day.
    NotScheduled,
    /// The requested interval falls outside the working window.
    OutsideWorkingHours,
    /// The requested interval collides with an existing appointment.
    SlotTaken,
}

impl SlotDenial {
    /// Human-readable reason, mirrored on the wire.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::SalonClosed => "Salon closed on this day",
            Self::NotScheduled => "Staff not available on this day",
            Self::OutsideWorkingHours => "Outside working hours",
            Self::SlotTaken => "Time slot already booked",
        }
    }
}

/// Verdict for one requested interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotVerdict {
    pub available: bool,
    pub denial: Option<SlotDenial>,
}

impl SlotVerdict {
    const OK: Self = Self { available: true, denial: None };

    const fn denied(denial: SlotDenial) -> Self {
        Self { available: false, denial: Some(denial) }
    }
}

/// All candidate slots of one staff day.
#[derive(Debug, Clone)]
pub struct DayBoard {
    pub date: NaiveDate,
    pub staff_id: String,
    /// The effective working window (staff schedule clipped to salon hours).
    pub window: Option<TimeRange>,
    pub slots: Vec<Slot>,
    /// Set when the whole day is unavailable.
    pub denial: Option<SlotDenial>,
}

impl DayBoard {
    fn closed(date: NaiveDate, staff_id: String, denial: SlotDenial) -> Self {
        Self { date, staff_id, window: None, slots: Vec::new(), denial: Some(denial) }
    }

    /// First free slot of the day, if any.
    #[must_use]
    pub fn next_available(&self) -> Option<TimeRange> {
        self.slots.iter().find(|slot| slot.available).map(|slot| slot.range)
    }
}

/// One day in the availability calendar.
#[derive(Debug, Clone)]
pub struct DayOutlook {
    /// Effective working window, or `None` when the staff member is off.
    pub working: Option<TimeRange>,
    pub booked: Vec<TimeRange>,
}

/// Availability computations over catalog schedules and booked appointments.
#[derive(Clone)]
pub struct AvailabilityEngine {
    catalog: CatalogRepo,
    appointments: AppointmentRepo,
    busy_cache: Cache<(String, NaiveDate), Arc<Vec<TimeRange>>>,
    config: BookingConfig,
}

impl std::fmt::Debug for AvailabilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityEngine").field("config", &self.config).finish_non_exhaustive()
    }
}

impl AvailabilityEngine {
    #[must_use]
    pub fn new(catalog: CatalogRepo, appointments: AppointmentRepo, config: BookingConfig) -> Self {
        let busy_cache = Cache::builder()
            .max_capacity(config.availability_cache_capacity)
            .time_to_live(std::time::Duration::from_secs(config.availability_cache_ttl_seconds))
            .build();

        Self { catalog, appointments, busy_cache, config }
    }

    /// Total duration of the requested services, in minutes.
    ///
    /// Services without a declared duration fall back to the configured
    /// default.
    ///
    /// # Errors
    /// Returns [`BookingError::Validation`] when no service id resolves.
    pub async fn total_duration(
        &self,
        salon_id: &str,
        service_ids: &[String],
    ) -> Result<u32, BookingError> {
        let services =
            self.catalog.services_by_ids(salon_id, service_ids).await.context("Resolving services")?;

        if services.is_empty() {
            return Err(BookingError::Validation {
                message: "no bookable services in request".into(),
                context: None,
            });
        }

        Ok(services
            .iter()
            .map(|service| {
                if service.duration_minutes == 0 {
                    self.config.default_service_duration_minutes
                } else {
                    service.duration_minutes
                }
            })
            .sum())
    }

    /// The candidate slots for one staff member and day, marked against
    /// existing appointments.
    ///
    /// # Errors
    /// Propagates catalog and storage failures; an unknown service set is a
    /// [`BookingError::Validation`].
    pub async fn day_slots(
        &self,
        salon_id: &str,
        staff_id: &str,
        date: NaiveDate,
        service_ids: &[String],
    ) -> Result<DayBoard, BookingError> {
        let duration = self.total_duration(salon_id, service_ids).await?;
        self.day_slots_for_duration(salon_id, staff_id, date, duration).await
    }

    /// Same as [`Self::day_slots`] with a pre-computed total duration.
    ///
    /// # Errors
    /// Propagates catalog and storage failures.
    pub async fn day_slots_for_duration(
        &self,
        salon_id: &str,
        staff_id: &str,
        date: NaiveDate,
        duration_minutes: u32,
    ) -> Result<DayBoard, BookingError> {
        let window = match self.working_window(salon_id, staff_id, date).await? {
            Ok(window) => window,
            Err(denial) => return Ok(DayBoard::closed(date, staff_id.to_owned(), denial)),
        };

        let busy = self.busy(staff_id, date).await?;
        let slots = mark_availability(
            generate_slots(window, duration_minutes, self.config.slot_step_minutes),
            &busy,
        );

        Ok(DayBoard { date, staff_id: staff_id.to_owned(), window: Some(window), slots, denial: None })
    }

    /// Verdict for one requested start time.
    ///
    /// # Errors
    /// Propagates catalog and storage failures.
    pub async fn check_slot(
        &self,
        salon_id: &str,
        staff_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: u32,
    ) -> Result<SlotVerdict, BookingError> {
        let window = match self.working_window(salon_id, staff_id, date).await? {
            Ok(window) => window,
            Err(denial) => return Ok(SlotVerdict::denied(denial)),
        };

        let end = start + Duration::minutes(i64::from(duration_minutes));
        let requested = TimeRange::new(start, end);
        if end < start || !window.encloses(&requested) {
            return Ok(SlotVerdict::denied(SlotDenial::OutsideWorkingHours));
        }

        let busy = self.busy(staff_id, date).await?;
        if has_conflict(requested, &busy) {
            return Ok(SlotVerdict::denied(SlotDenial::SlotTaken));
        }

        Ok(SlotVerdict::OK)
    }

    /// Verdict for a reschedule target, ignoring the appointment being moved.
    ///
    /// Bypasses the busy cache: the exclusion is per-appointment and the
    /// answer gates a write.
    ///
    /// # Errors
    /// Propagates catalog and storage failures.
    pub async fn check_slot_excluding(
        &self,
        salon_id: &str,
        staff_id: &str,
        date: NaiveDate,
        start: NaiveTime,
        duration_minutes: u32,
        excluded_id: &str,
    ) -> Result<SlotVerdict, BookingError> {
        let window = match self.working_window(salon_id, staff_id, date).await? {
            Ok(window) => window,
            Err(denial) => return Ok(SlotVerdict::denied(denial)),
        };

        let end = start + Duration::minutes(i64::from(duration_minutes));
        let requested = TimeRange::new(start, end);
        if end < start || !window.encloses(&requested) {
            return Ok(SlotVerdict::denied(SlotDenial::OutsideWorkingHours));
        }

        let busy = self.appointments.busy_ranges_excluding(staff_id, date, excluded_id).await?;
        if has_conflict(requested, &busy) {
            return Ok(SlotVerdict::denied(SlotDenial::SlotTaken));
        }

        Ok(SlotVerdict::OK)
    }

    /// Day-by-day outlook for one staff member over an inclusive date range.
    ///
    /// # Errors
    /// Returns [`BookingError::Validation`] for an inverted range; otherwise
    /// propagates catalog and storage failures.
    pub async fn calendar(
        &self,
        salon_id: &str,
        staff_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DayOutlook>, BookingError> {
        if from > to {
            return Err(BookingError::Validation {
                message: "date range is inverted".into(),
                context: None,
            });
        }

        let appointments = self.appointments.blocking_between(staff_id, from, to).await?;
        let mut booked_by_day: BTreeMap<NaiveDate, Vec<TimeRange>> = BTreeMap::new();
        for appointment in appointments {
            booked_by_day.entry(appointment.date).or_default().push(appointment.slot());
        }

        let mut outlook = BTreeMap::new();
        let mut date = from;
        while date <= to {
            let working = match self.working_window(salon_id, staff_id, date).await? {
                Ok(window) => Some(window),
                Err(_) => None,
            };
            let booked =
                if working.is_some() { booked_by_day.remove(&date).unwrap_or_default() } else { Vec::new() };
            outlook.insert(date, DayOutlook { working, booked });

            date = date.succ_opt().ok_or_else(|| BookingError::Internal {
                message: "date overflow while building calendar".into(),
                context: None,
            })?;
        }

        Ok(outlook)
    }

    /// Utilization snapshot for one salon day: total slots across every staff
    /// window vs. blocking appointments.
    ///
    /// # Errors
    /// Propagates catalog and storage failures.
    pub async fn capacity(
        &self,
        salon_id: &str,
        date: NaiveDate,
    ) -> Result<CapacityInfo, BookingError> {
        let day = DayOfWeek::from(date.weekday());
        let salon_window = self
            .catalog
            .operating_hours(salon_id, day)
            .await
            .context("Loading salon hours")?
            .and_then(|hours| hours.window());

        let total = match salon_window {
            None => 0,
            Some(salon_window) => {
                let schedules =
                    self.catalog.salon_schedules(salon_id, day).await.context("Loading schedules")?;
                schedules
                    .iter()
                    .filter_map(|schedule| clip(schedule.window(), salon_window))
                    .map(|window| slot_capacity(window, self.config.slot_step_minutes))
                    .sum()
            },
        };

        let booked = self.appointments.booked_count(salon_id, date).await?;
        Ok(CapacityInfo::from_counts(salon_id.to_owned(), date, total, booked))
    }

    /// Drops the cached busy intervals of one staff day.
    pub async fn invalidate(&self, staff_id: &str, date: NaiveDate) {
        self.busy_cache.invalidate(&(staff_id.to_owned(), date)).await;
    }

    /// Effective working window: the staff schedule clipped to salon hours.
    async fn working_window(
        &self,
        salon_id: &str,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Result<TimeRange, SlotDenial>, BookingError> {
        let day = DayOfWeek::from(date.weekday());

        let Some(hours) =
            self.catalog.operating_hours(salon_id, day).await.context("Loading salon hours")?
        else {
            return Ok(Err(SlotDenial::SalonClosed));
        };
        let Some(salon_window) = hours.window() else {
            return Ok(Err(SlotDenial::SalonClosed));
        };

        let Some(schedule) =
            self.catalog.staff_schedule(staff_id, day).await.context("Loading staff schedule")?
        else {
            return Ok(Err(SlotDenial::NotScheduled));
        };

        Ok(clip(schedule.window(), salon_window).ok_or(SlotDenial::NotScheduled))
    }

    async fn busy(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Arc<Vec<TimeRange>>, BookingError> {
        let key = (staff_id.to_owned(), date);
        let appointments = &self.appointments;
        let staff = staff_id.to_owned();

        self.busy_cache
            .try_get_with(key, async move {
                appointments.busy_ranges(&staff, date).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<BookingError>| {
                Arc::try_unwrap(e).unwrap_or_else(|arc| BookingError::Internal {
                    message: arc.to_string().into(),
                    context: Some("Cache loader returned an error, but it was shared (Arc)".into()),
                })
            })
    }
}

/// Intersection of two windows, or `None` when they do not overlap.
fn clip(window: TimeRange, bounds: TimeRange) -> Option<TimeRange> {
    let clipped = TimeRange::new(window.start.max(bounds.start), window.end.min(bounds.end));
    if clipped.is_empty() { None } else { Some(clipped) }
}
