use crate::error::{BookingError, BookingErrorExt};
use bloom_database::Database;
use bloom_domain::constants::{APPOINTMENT, APPOINTMENT_SERVICE};
use bloom_domain::scheduling::{
    Appointment, AppointmentServiceLine, AppointmentStatus, TimeRange, format_hhmm, parse_hhmm,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use surrealdb::types::SurrealValue;

/// Storage access for appointments and their service lines.
///
/// Rows keep public ids in a `uid` field; dates are ISO `YYYY-MM-DD` strings
/// (which keeps range filters lexicographic), times use the `HH:MM` wire
/// format, and instants are RFC 3339.
#[derive(Debug, Clone)]
pub struct AppointmentRepo {
    db: Database,
}

#[derive(Debug, Clone, SurrealValue)]
struct AppointmentRow {
    uid: String,
    salon_id: String,
    staff_id: String,
    customer_id: String,
    date: String,
    start_time: String,
    end_time: String,
    status: String,
    total_price: f64,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    booked_at: String,
    confirmed_at: Option<String>,
    cancelled_at: Option<String>,
    completed_at: Option<String>,
}

#[derive(Debug, Clone, SurrealValue)]
struct LineRow {
    appointment_id: String,
    service_id: String,
    price: f64,
    duration_minutes: i64,
}

#[derive(Debug, Clone, SurrealValue)]
struct BusyRow {
    start_time: String,
    end_time: String,
}

/// Filters for listing appointments; all fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub customer_id: Option<String>,
    pub salon_id: Option<String>,
    pub staff_id: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

impl AppointmentRepo {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts the appointment and its service lines in one transaction.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn insert(
        &self,
        appointment: &Appointment,
        lines: &[AppointmentServiceLine],
    ) -> Result<(), BookingError> {
        let row = row_from_appointment(appointment);
        let line_rows: Vec<LineRow> = lines
            .iter()
            .map(|line| LineRow {
                appointment_id: line.appointment_id.clone(),
                service_id: line.service_id.clone(),
                price: line.price,
                duration_minutes: i64::from(line.duration_minutes),
            })
            .collect();

        let response = if line_rows.is_empty() {
            self.db
                .query(format!("CREATE {APPOINTMENT} CONTENT $appointment"))
                .bind(("appointment", row))
                .await
                .context("Inserting appointment")?
        } else {
            self.db
                .query(format!(
                    "BEGIN TRANSACTION;
                    CREATE {APPOINTMENT} CONTENT $appointment;
                    INSERT INTO {APPOINTMENT_SERVICE} $lines;
                    COMMIT TRANSACTION;"
                ))
                .bind(("appointment", row))
                .bind(("lines", line_rows))
                .await
                .context("Inserting appointment")?
        };
        response.check().map_err(surrealdb::Error::from)?;

        Ok(())
    }

    /// Loads one appointment by public id.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures or
    /// [`BookingError::Data`] when the stored row is malformed.
    pub async fn fetch(&self, appointment_id: &str) -> Result<Option<Appointment>, BookingError> {
        let row = self
            .db
            .query(format!("SELECT * FROM {APPOINTMENT} WHERE uid = $uid"))
            .bind(("uid", appointment_id.to_owned()))
            .await?
            .take::<Vec<AppointmentRow>>(0)?
            .into_iter()
            .next();

        row.map(appointment_from_row).transpose()
    }

    /// The service lines attached to one appointment.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn lines(
        &self,
        appointment_id: &str,
    ) -> Result<Vec<AppointmentServiceLine>, BookingError> {
        let rows = self
            .db
            .query(format!(
                "SELECT * FROM {APPOINTMENT_SERVICE} WHERE appointment_id = $appointment"
            ))
            .bind(("appointment", appointment_id.to_owned()))
            .await?
            .take::<Vec<LineRow>>(0)?;

        rows.into_iter()
            .map(|row| {
                let duration_minutes =
                    u32::try_from(row.duration_minutes).map_err(|_| BookingError::Data {
                        message: format!("negative duration on line of {}", row.appointment_id)
                            .into(),
                        context: None,
                    })?;
                Ok(AppointmentServiceLine {
                    appointment_id: row.appointment_id,
                    service_id: row.service_id,
                    price: row.price,
                    duration_minutes,
                })
            })
            .collect()
    }

    /// Busy intervals of one staff member on one day (blocking statuses only).
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures or
    /// [`BookingError::Data`] for malformed stored times.
    pub async fn busy_ranges(
        &self,
        staff_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeRange>, BookingError> {
        let rows = self
            .db
            .query(format!(
                "SELECT start_time, end_time FROM {APPOINTMENT}
                WHERE staff_id = $staff AND date = $date AND status IN $blocking
                ORDER BY start_time"
            ))
            .bind(("staff", staff_id.to_owned()))
            .bind(("date", date.to_string()))
            .bind(("blocking", AppointmentStatus::blocking_labels()))
            .await?
            .take::<Vec<BusyRow>>(0)?;

        rows.into_iter()
            .map(|row| {
                Ok(TimeRange::new(
                    parse_time(&row.start_time)?,
                    parse_time(&row.end_time)?,
                ))
            })
            .collect()
    }

    /// Busy intervals of one staff member on one day, leaving out one
    /// appointment (used when validating a reschedule target).
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures or
    /// [`BookingError::Data`] for malformed stored times.
    pub async fn busy_ranges_excluding(
        &self,
        staff_id: &str,
        date: NaiveDate,
        excluded_id: &str,
    ) -> Result<Vec<TimeRange>, BookingError> {
        let rows = self
            .db
            .query(format!(
                "SELECT start_time, end_time FROM {APPOINTMENT}
                WHERE staff_id = $staff AND date = $date AND uid != $excluded AND status IN $blocking
                ORDER BY start_time"
            ))
            .bind(("staff", staff_id.to_owned()))
            .bind(("date", date.to_string()))
            .bind(("excluded", excluded_id.to_owned()))
            .bind(("blocking", AppointmentStatus::blocking_labels()))
            .await?
            .take::<Vec<BusyRow>>(0)?;

        rows.into_iter()
            .map(|row| {
                Ok(TimeRange::new(
                    parse_time(&row.start_time)?,
                    parse_time(&row.end_time)?,
                ))
            })
            .collect()
    }

    /// Blocking appointments of one staff member across an inclusive date range.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures or
    /// [`BookingError::Data`] for malformed rows.
    pub async fn blocking_between(
        &self,
        staff_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Appointment>, BookingError> {
        let rows = self
            .db
            .query(format!(
                "SELECT * FROM {APPOINTMENT}
                WHERE staff_id = $staff AND date >= $from AND date <= $to AND status IN $blocking
                ORDER BY date, start_time"
            ))
            .bind(("staff", staff_id.to_owned()))
            .bind(("from", from.to_string()))
            .bind(("to", to.to_string()))
            .bind(("blocking", AppointmentStatus::blocking_labels()))
            .await?
            .take::<Vec<AppointmentRow>>(0)?;

        rows.into_iter().map(appointment_from_row).collect()
    }

    /// Count of blocking appointments in a salon on one day, for capacity.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn booked_count(
        &self,
        salon_id: &str,
        date: NaiveDate,
    ) -> Result<u32, BookingError> {
        let rows = self
            .db
            .query(format!(
                "SELECT start_time, end_time FROM {APPOINTMENT}
                WHERE salon_id = $salon AND date = $date AND status IN $blocking"
            ))
            .bind(("salon", salon_id.to_owned()))
            .bind(("date", date.to_string()))
            .bind(("blocking", AppointmentStatus::blocking_labels()))
            .await?
            .take::<Vec<BusyRow>>(0)?;

        Ok(u32::try_from(rows.len()).unwrap_or(u32::MAX))
    }

    /// Lists appointments newest-first, applying the given filters.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures or
    /// [`BookingError::Data`] for malformed rows.
    pub async fn list(&self, filter: &BookingFilter) -> Result<Vec<Appointment>, BookingError> {
        let mut clauses = Vec::new();
        if filter.customer_id.is_some() {
            clauses.push("customer_id = $customer");
        }
        if filter.salon_id.is_some() {
            clauses.push("salon_id = $salon");
        }
        if filter.staff_id.is_some() {
            clauses.push("staff_id = $staff");
        }
        if filter.status.is_some() {
            clauses.push("status = $status");
        }
        if filter.date.is_some() {
            clauses.push("date = $date");
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let mut query = self
            .db
            .query(format!(
                "SELECT * FROM {APPOINTMENT} {where_clause} ORDER BY date DESC, start_time DESC"
            ));

        if let Some(customer) = &filter.customer_id {
            query = query.bind(("customer", customer.clone()));
        }
        if let Some(salon) = &filter.salon_id {
            query = query.bind(("salon", salon.clone()));
        }
        if let Some(staff) = &filter.staff_id {
            query = query.bind(("staff", staff.clone()));
        }
        if let Some(status) = filter.status {
            query = query.bind(("status", status.as_str()));
        }
        if let Some(date) = filter.date {
            query = query.bind(("date", date.to_string()));
        }

        let rows = query.await?.take::<Vec<AppointmentRow>>(0)?;
        rows.into_iter().map(appointment_from_row).collect()
    }

    /// Applies a status transition with its timestamp stamp.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn set_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
        stamped_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let stamp_field = match status {
            AppointmentStatus::Confirmed => Some("confirmed_at"),
            AppointmentStatus::Cancelled => Some("cancelled_at"),
            AppointmentStatus::Completed => Some("completed_at"),
            _ => None,
        };

        let set_clause = stamp_field.map_or_else(
            || "SET status = $status".to_owned(),
            |field| format!("SET status = $status, {field} = $stamp"),
        );

        self.db
            .query(format!("UPDATE {APPOINTMENT} {set_clause} WHERE uid = $uid"))
            .bind(("uid", appointment_id.to_owned()))
            .bind(("status", status.as_str()))
            .bind(("stamp", stamped_at.to_rfc3339()))
            .await
            .context("Updating appointment status")?
            .check()
            .map_err(surrealdb::Error::from)?;

        Ok(())
    }

    /// Soft-cancels with a reason.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn cancel(
        &self,
        appointment_id: &str,
        reason: Option<String>,
        cancelled_at: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        self.db
            .query(format!(
                "UPDATE {APPOINTMENT}
                SET status = $status, cancellation_reason = $reason, cancelled_at = $stamp
                WHERE uid = $uid"
            ))
            .bind(("uid", appointment_id.to_owned()))
            .bind(("status", AppointmentStatus::Cancelled.as_str()))
            .bind(("reason", reason))
            .bind(("stamp", cancelled_at.to_rfc3339()))
            .await
            .context("Cancelling appointment")?
            .check()
            .map_err(surrealdb::Error::from)?;

        Ok(())
    }

    /// Moves an appointment to a new day/interval.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn move_slot(
        &self,
        appointment_id: &str,
        date: NaiveDate,
        slot: TimeRange,
    ) -> Result<(), BookingError> {
        self.db
            .query(format!(
                "UPDATE {APPOINTMENT}
                SET date = $date, start_time = $start, end_time = $end
                WHERE uid = $uid"
            ))
            .bind(("uid", appointment_id.to_owned()))
            .bind(("date", date.to_string()))
            .bind(("start", format_hhmm(slot.start)))
            .bind(("end", format_hhmm(slot.end)))
            .await
            .context("Rescheduling appointment")?
            .check()
            .map_err(surrealdb::Error::from)?;

        Ok(())
    }

    /// Hard-deletes an appointment and its service lines.
    ///
    /// # Errors
    /// Returns [`BookingError::Storage`] on query failures.
    pub async fn delete(&self, appointment_id: &str) -> Result<(), BookingError> {
        self.db
            .query(format!(
                "BEGIN TRANSACTION;
                DELETE FROM {APPOINTMENT_SERVICE} WHERE appointment_id = $uid;
                DELETE FROM {APPOINTMENT} WHERE uid = $uid;
                COMMIT TRANSACTION;"
            ))
            .bind(("uid", appointment_id.to_owned()))
            .await
            .context("Deleting appointment")?
            .check()
            .map_err(surrealdb::Error::from)?;

        Ok(())
    }
}

fn row_from_appointment(appointment: &Appointment) -> AppointmentRow {
    AppointmentRow {
        uid: appointment.id.clone(),
        salon_id: appointment.salon_id.clone(),
        staff_id: appointment.staff_id.clone(),
        customer_id: appointment.customer_id.clone(),
        date: appointment.date.to_string(),
        start_time: format_hhmm(appointment.start_time),
        end_time: format_hhmm(appointment.end_time),
        status: appointment.status.as_str().to_owned(),
        total_price: appointment.total_price,
        notes: appointment.notes.clone(),
        cancellation_reason: appointment.cancellation_reason.clone(),
        booked_at: appointment.booked_at.to_rfc3339(),
        confirmed_at: appointment.confirmed_at.map(|t| t.to_rfc3339()),
        cancelled_at: appointment.cancelled_at.map(|t| t.to_rfc3339()),
        completed_at: appointment.completed_at.map(|t| t.to_rfc3339()),
    }
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, BookingError> {
    let status = AppointmentStatus::parse(&row.status).ok_or_else(|| BookingError::Data {
        message: format!("unknown status '{}' on {}", row.status, row.uid).into(),
        context: None,
    })?;

    Ok(Appointment {
        date: parse_date(&row.date)?,
        start_time: parse_time(&row.start_time)?,
        end_time: parse_time(&row.end_time)?,
        booked_at: parse_instant(&row.booked_at)?,
        confirmed_at: row.confirmed_at.as_deref().map(parse_instant).transpose()?,
        cancelled_at: row.cancelled_at.as_deref().map(parse_instant).transpose()?,
        completed_at: row.completed_at.as_deref().map(parse_instant).transpose()?,
        id: row.uid,
        salon_id: row.salon_id,
        staff_id: row.staff_id,
        customer_id: row.customer_id,
        status,
        total_price: row.total_price,
        notes: row.notes,
        cancellation_reason: row.cancellation_reason,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, BookingError> {
    value.parse::<NaiveDate>().map_err(|_| BookingError::Data {
        message: format!("invalid date '{value}'").into(),
        context: None,
    })
}

fn parse_time(value: &str) -> Result<NaiveTime, BookingError> {
    parse_hhmm(value).ok_or_else(|| BookingError::Data {
        message: format!("invalid time '{value}'").into(),
        context: None,
    })
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, BookingError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| BookingError::Data {
            message: format!("invalid timestamp '{value}'").into(),
            context: None,
        })
}
