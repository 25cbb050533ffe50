//! Booking lifecycle: create, cancel, reschedule, status transitions, and
//! listings.
//!
//! Creation and rescheduling re-validate the requested slot under a per-staff
//! lock, so two concurrent requests for the same stylist serialize and the
//! loser gets a clean conflict instead of a double booking.

use crate::availability::{AvailabilityEngine, SlotDenial};
use crate::error::{BookingError, BookingErrorExt};
use crate::policy::ChangePolicy;
use crate::repo::{AppointmentRepo, BookingFilter};
use bloom_catalog::CatalogRepo;
use bloom_domain::config::BookingConfig;
use bloom_domain::constants::APPOINTMENT;
use bloom_domain::feed::{BookingConflict, BookingUpdate, CapacityInfo, ConflictKind, UpdateKind};
use bloom_domain::scheduling::{
    Appointment, AppointmentServiceLine, AppointmentStatus, TimeRange, format_hhmm,
};
use bloom_event_bus::EventBus;
use bloom_kernel::safe_nanoid;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A new booking request, as accepted from the public API.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub salon_id: String,
    pub staff_id: String,
    pub customer_id: String,
    pub service_ids: Vec<String>,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub notes: Option<String>,
}

/// An appointment together with the change-window flags list views display.
#[derive(Debug, Clone)]
pub struct BookingView {
    pub appointment: Appointment,
    pub can_cancel: bool,
    pub can_reschedule: bool,
}

/// Booking operations over the appointment store.
#[derive(Debug, Clone)]
pub struct BookingService {
    repo: AppointmentRepo,
    catalog: CatalogRepo,
    availability: AvailabilityEngine,
    events: EventBus,
    cancel_policy: ChangePolicy,
    reschedule_policy: ChangePolicy,
    staff_locks: Arc<Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl BookingService {
    #[must_use]
    pub fn new(
        repo: AppointmentRepo,
        catalog: CatalogRepo,
        availability: AvailabilityEngine,
        events: EventBus,
        config: &BookingConfig,
    ) -> Self {
        Self {
            repo,
            catalog,
            availability,
            events,
            cancel_policy: ChangePolicy::new(config.cancellation_cutoff_hours),
            reschedule_policy: ChangePolicy::new(config.reschedule_cutoff_hours),
            staff_locks: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// The availability engine backing this service.
    #[must_use]
    pub const fn availability(&self) -> &AvailabilityEngine {
        &self.availability
    }

    /// Books an appointment.
    ///
    /// Validates the salon, staff member, and services, then re-checks the
    /// requested slot under the staff lock before inserting. Publishes a
    /// `Created` update and a fresh capacity snapshot on success, and a
    /// conflict notice when the slot was lost to a concurrent booking.
    ///
    /// # Errors
    /// * [`BookingError::Validation`] for unknown services or a salon that is
    ///   not accepting bookings.
    /// * [`BookingError::NotFound`] for an unknown salon or staff member.
    /// * [`BookingError::SlotUnavailable`] when the requested interval is not
    ///   bookable.
    #[instrument(skip(self, request), fields(salon = %request.salon_id, staff = %request.staff_id))]
    pub async fn create(&self, request: NewBooking) -> Result<Appointment, BookingError> {
        let salon = self.catalog.salon(&request.salon_id).await.context("Resolving salon")?;
        if !salon.is_accepting_bookings {
            return Err(BookingError::Validation {
                message: "salon is not accepting bookings".into(),
                context: None,
            });
        }

        let staff =
            self.catalog.staff_member(&request.staff_id).await.context("Resolving staff")?;
        if staff.salon_id != salon.id {
            return Err(BookingError::Validation {
                message: "staff member does not belong to this salon".into(),
                context: None,
            });
        }

        let services = self
            .catalog
            .services_by_ids(&salon.id, &request.service_ids)
            .await
            .context("Resolving services")?;
        if services.is_empty() {
            return Err(BookingError::Validation {
                message: "no bookable services in request".into(),
                context: None,
            });
        }

        let total_price: f64 = services.iter().map(|s| s.base_price).sum();
        let duration: u32 = services.iter().map(|s| s.duration_minutes).sum();
        let end = request.start + Duration::minutes(i64::from(duration));
        let slot = TimeRange::new(request.start, end);

        // Serialize bookings per staff member; the verdict below is only
        // trustworthy while we hold this lock.
        let lock = self.staff_lock(&staff.id);
        let _guard = lock.lock().await;

        let verdict = self
            .availability
            .check_slot(&salon.id, &staff.id, request.date, request.start, duration)
            .await?;
        if let Some(denial) = verdict.denial {
            if denial == SlotDenial::SlotTaken {
                self.publish_conflict(&salon.id, &staff.display_name, slot);
            }
            return Err(BookingError::SlotUnavailable {
                message: denial.reason().into(),
                context: None,
            });
        }

        let appointment = Appointment {
            id: format!("{APPOINTMENT}:{}", safe_nanoid!()),
            salon_id: salon.id,
            staff_id: staff.id,
            customer_id: request.customer_id,
            date: request.date,
            start_time: request.start,
            end_time: end,
            status: AppointmentStatus::Pending,
            total_price,
            notes: request.notes,
            cancellation_reason: None,
            booked_at: Utc::now(),
            confirmed_at: None,
            cancelled_at: None,
            completed_at: None,
        };

        let lines: Vec<AppointmentServiceLine> = services
            .iter()
            .map(|service| AppointmentServiceLine {
                appointment_id: appointment.id.clone(),
                service_id: service.id.clone(),
                price: service.base_price,
                duration_minutes: service.duration_minutes,
            })
            .collect();

        self.repo.insert(&appointment, &lines).await?;
        info!(appointment = %appointment.id, "Booking created");

        self.availability.invalidate(&appointment.staff_id, appointment.date).await;
        self.publish_update(UpdateKind::Created, &appointment).await;

        Ok(appointment)
    }

    /// Cancels a customer's appointment inside the policy window.
    ///
    /// # Errors
    /// * [`BookingError::NotFound`] for an unknown appointment.
    /// * [`BookingError::Forbidden`] when `customer_id` does not own it.
    /// * [`BookingError::Policy`] when the window has closed or the status is
    ///   locked.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        appointment_id: &str,
        customer_id: &str,
        reason: Option<String>,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.fetch_owned(appointment_id, customer_id).await?;

        self.cancel_policy
            .check(now(), appointment.starts_at(), appointment.status)
            .map_err(|denial| BookingError::Policy {
                message: denial.to_string().into(),
                context: None,
            })?;

        self.repo.cancel(&appointment.id, reason, Utc::now()).await?;
        info!(appointment = %appointment.id, "Booking cancelled");

        self.availability.invalidate(&appointment.staff_id, appointment.date).await;
        let appointment = self.reload(&appointment.id).await?;
        self.publish_update(UpdateKind::Cancelled, &appointment).await;

        Ok(appointment)
    }

    /// Hard-deletes an appointment and its lines (back-office path; no policy
    /// window applies).
    ///
    /// # Errors
    /// Returns [`BookingError::NotFound`] for an unknown appointment.
    #[instrument(skip(self))]
    pub async fn delete(&self, appointment_id: &str) -> Result<(), BookingError> {
        let appointment = self.fetch_existing(appointment_id).await?;

        self.repo.delete(&appointment.id).await?;
        info!(appointment = %appointment.id, "Booking deleted");

        self.availability.invalidate(&appointment.staff_id, appointment.date).await;
        self.publish_update(UpdateKind::Cancelled, &appointment).await;
        Ok(())
    }

    /// Moves an appointment to a new day/time inside the policy window.
    ///
    /// The target slot is validated against the staff schedule and every other
    /// appointment under the staff lock.
    ///
    /// # Errors
    /// * [`BookingError::NotFound`] / [`BookingError::Forbidden`] as for cancel.
    /// * [`BookingError::Policy`] when the window has closed.
    /// * [`BookingError::SlotUnavailable`] when the target slot is not bookable.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: &str,
        customer_id: &str,
        new_date: NaiveDate,
        new_start: NaiveTime,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.fetch_owned(appointment_id, customer_id).await?;

        self.reschedule_policy
            .check(now(), appointment.starts_at(), appointment.status)
            .map_err(|denial| BookingError::Policy {
                message: denial.to_string().into(),
                context: None,
            })?;

        let lines = self.repo.lines(&appointment.id).await?;
        let duration: u32 = if lines.is_empty() {
            (appointment.slot().end - appointment.slot().start)
                .num_minutes()
                .try_into()
                .unwrap_or(60)
        } else {
            lines.iter().map(|line| line.duration_minutes).sum()
        };

        let lock = self.staff_lock(&appointment.staff_id);
        let _guard = lock.lock().await;

        let verdict = self
            .availability
            .check_slot_excluding(
                &appointment.salon_id,
                &appointment.staff_id,
                new_date,
                new_start,
                duration,
                &appointment.id,
            )
            .await?;
        if let Some(denial) = verdict.denial {
            return Err(BookingError::SlotUnavailable {
                message: denial.reason().into(),
                context: None,
            });
        }

        let new_end = new_start + Duration::minutes(i64::from(duration));
        let old_date = appointment.date;
        self.repo
            .move_slot(&appointment.id, new_date, TimeRange::new(new_start, new_end))
            .await?;
        info!(appointment = %appointment.id, %new_date, "Booking rescheduled");

        self.availability.invalidate(&appointment.staff_id, old_date).await;
        self.availability.invalidate(&appointment.staff_id, new_date).await;

        let appointment = self.reload(&appointment.id).await?;
        self.publish_update(UpdateKind::Rescheduled, &appointment).await;

        Ok(appointment)
    }

    /// Applies a back-office status transition (confirm, check-in, complete,
    /// no-show). Customer cancellations go through [`Self::cancel`].
    ///
    /// # Errors
    /// * [`BookingError::NotFound`] for an unknown appointment.
    /// * [`BookingError::Validation`] when the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, BookingError> {
        if matches!(status, AppointmentStatus::Cancelled) {
            return Err(BookingError::Validation {
                message: "use the cancellation endpoint to cancel".into(),
                context: None,
            });
        }

        let appointment = self.fetch_existing(appointment_id).await?;
        self.repo.set_status(&appointment.id, status, Utc::now()).await?;

        self.availability.invalidate(&appointment.staff_id, appointment.date).await;
        let appointment = self.reload(&appointment.id).await?;
        self.publish_update(UpdateKind::Updated, &appointment).await;

        Ok(appointment)
    }

    /// Lists appointments with their change-window flags, newest first.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<BookingView>, BookingError> {
        let appointments = self.repo.list(filter).await?;
        let now = now();

        Ok(appointments
            .into_iter()
            .map(|appointment| {
                let starts_at = appointment.starts_at();
                let can_cancel = self.cancel_policy.is_open(now, starts_at, appointment.status);
                let can_reschedule =
                    self.reschedule_policy.is_open(now, starts_at, appointment.status);
                BookingView { appointment, can_cancel, can_reschedule }
            })
            .collect())
    }

    /// Loads one appointment with its change-window flags.
    ///
    /// # Errors
    /// Returns [`BookingError::NotFound`] for an unknown appointment.
    pub async fn get(&self, appointment_id: &str) -> Result<BookingView, BookingError> {
        let appointment = self.fetch_existing(appointment_id).await?;
        let now = now();
        let starts_at = appointment.starts_at();
        Ok(BookingView {
            can_cancel: self.cancel_policy.is_open(now, starts_at, appointment.status),
            can_reschedule: self.reschedule_policy.is_open(now, starts_at, appointment.status),
            appointment,
        })
    }

    // --- internals ---

    fn staff_lock(&self, staff_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.staff_locks.lock();
        locks.entry(staff_id.to_owned()).or_default().clone()
    }

    async fn fetch_existing(&self, appointment_id: &str) -> Result<Appointment, BookingError> {
        self.repo.fetch(appointment_id).await?.ok_or_else(|| BookingError::NotFound {
            message: appointment_id.to_owned().into(),
            context: Some("appointment lookup".into()),
        })
    }

    async fn fetch_owned(
        &self,
        appointment_id: &str,
        customer_id: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.fetch_existing(appointment_id).await?;
        if appointment.customer_id != customer_id {
            return Err(BookingError::Forbidden {
                message: "appointment belongs to another customer".into(),
                context: None,
            });
        }
        Ok(appointment)
    }

    async fn reload(&self, appointment_id: &str) -> Result<Appointment, BookingError> {
        self.fetch_existing(appointment_id).await
    }

    /// Publishes the update and a refreshed capacity snapshot. The feed is
    /// best-effort: a failed publish is logged, never surfaced to the caller.
    async fn publish_update(&self, kind: UpdateKind, appointment: &Appointment) {
        let update = BookingUpdate {
            kind,
            appointment_id: appointment.id.clone(),
            salon_id: appointment.salon_id.clone(),
            staff_id: Some(appointment.staff_id.clone()),
            date: Some(appointment.date),
            slot: Some(appointment.slot()),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.events.publish(update) {
            warn!(error = %e, "Failed to publish booking update");
        }

        match self.availability.capacity(&appointment.salon_id, appointment.date).await {
            Ok(capacity) => {
                if let Err(e) = self.events.publish::<CapacityInfo>(capacity) {
                    warn!(error = %e, "Failed to publish capacity snapshot");
                }
            },
            Err(e) => warn!(error = %e, "Failed to compute capacity snapshot"),
        }
    }

    fn publish_conflict(&self, salon_id: &str, staff_name: &str, slot: TimeRange) {
        let conflict = BookingConflict {
            kind: ConflictKind::DoubleBooking,
            salon_id: salon_id.to_owned(),
            description: format!(
                "Time slot {}-{} is already booked for {staff_name}",
                format_hhmm(slot.start),
                format_hhmm(slot.end)
            ),
            detected_at: Utc::now(),
        };
        if let Err(e) = self.events.publish(conflict) {
            warn!(error = %e, "Failed to publish booking conflict");
        }
    }
}

/// Wall-clock "now" used for policy windows. Salon-local timezone handling is
/// delegated to the clients, as in the hosted deployment.
fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
