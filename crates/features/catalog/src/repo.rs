use crate::error::{CatalogError, CatalogErrorExt};
use bloom_database::Database;
use bloom_domain::constants::{OPERATING_HOURS, SALON, SERVICE, STAFF, STAFF_SCHEDULE};
use bloom_domain::scheduling::{
    DayOfWeek, OperatingHours, Salon, Service, StaffMember, StaffSchedule, format_hhmm, parse_hhmm,
};
use chrono::NaiveTime;
use surrealdb::types::SurrealValue;

/// Read/write access to catalog records.
///
/// Records keep their public identifier in a `uid` field (`table:key` strings
/// minted with `safe_nanoid!`), mirroring the external ids the booking API
/// exposes. Times are stored in the `HH:MM` wire format.
#[derive(Debug, Clone)]
pub struct CatalogRepo {
    db: Database,
}

#[derive(Debug, Clone, SurrealValue)]
struct SalonRow {
    uid: String,
    name: String,
    slug: String,
    description: String,
    is_active: bool,
    is_accepting_bookings: bool,
    rating_average: f64,
    rating_count: i64,
}

#[derive(Debug, Clone, SurrealValue)]
struct ServiceRow {
    uid: String,
    salon_id: String,
    name: String,
    duration_minutes: i64,
    base_price: f64,
    is_active: bool,
}

#[derive(Debug, Clone, SurrealValue)]
struct StaffRow {
    uid: String,
    salon_id: String,
    display_name: String,
    title: String,
    is_active: bool,
}

#[derive(Debug, Clone, SurrealValue)]
struct HoursRow {
    salon_id: String,
    day: String,
    open_time: String,
    close_time: String,
    is_closed: bool,
}

#[derive(Debug, Clone, SurrealValue)]
struct ScheduleRow {
    staff_id: String,
    salon_id: String,
    day: String,
    start_time: String,
    end_time: String,
}

impl CatalogRepo {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Loads an active salon by its public id.
    ///
    /// # Errors
    /// Returns [`CatalogError::NotFound`] when the salon does not exist or is inactive.
    pub async fn salon(&self, salon_id: &str) -> Result<Salon, CatalogError> {
        let row = self
            .db
            .query(format!("SELECT * FROM {SALON} WHERE uid = $uid AND is_active = true"))
            .bind(("uid", salon_id.to_owned()))
            .await?
            .take::<Vec<SalonRow>>(0)?
            .into_iter()
            .next();

        row.map(salon_from_row).ok_or_else(|| CatalogError::NotFound {
            message: salon_id.to_owned().into(),
            context: Some("salon lookup".into()),
        })
    }

    /// Active services offered by a salon.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn active_services(&self, salon_id: &str) -> Result<Vec<Service>, CatalogError> {
        let rows = self
            .db
            .query(format!(
                "SELECT * FROM {SERVICE} WHERE salon_id = $salon AND is_active = true ORDER BY name"
            ))
            .bind(("salon", salon_id.to_owned()))
            .await?
            .take::<Vec<ServiceRow>>(0)?;

        rows.into_iter().map(service_from_row).collect()
    }

    /// Resolves the requested service ids within one salon. Order of the
    /// result is unspecified; missing ids are simply absent.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn services_by_ids(
        &self,
        salon_id: &str,
        service_ids: &[String],
    ) -> Result<Vec<Service>, CatalogError> {
        if service_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .db
            .query(format!(
                "SELECT * FROM {SERVICE} WHERE salon_id = $salon AND uid IN $ids AND is_active = true"
            ))
            .bind(("salon", salon_id.to_owned()))
            .bind(("ids", service_ids.to_vec()))
            .await?
            .take::<Vec<ServiceRow>>(0)?;

        rows.into_iter().map(service_from_row).collect()
    }

    /// Active staff members of a salon.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn staff_roster(&self, salon_id: &str) -> Result<Vec<StaffMember>, CatalogError> {
        let rows = self
            .db
            .query(format!(
                "SELECT * FROM {STAFF} WHERE salon_id = $salon AND is_active = true ORDER BY display_name"
            ))
            .bind(("salon", salon_id.to_owned()))
            .await?
            .take::<Vec<StaffRow>>(0)?;

        Ok(rows.into_iter().map(staff_from_row).collect())
    }

    /// A single staff member by public id.
    ///
    /// # Errors
    /// Returns [`CatalogError::NotFound`] when the member does not exist or is inactive.
    pub async fn staff_member(&self, staff_id: &str) -> Result<StaffMember, CatalogError> {
        let row = self
            .db
            .query(format!("SELECT * FROM {STAFF} WHERE uid = $uid AND is_active = true"))
            .bind(("uid", staff_id.to_owned()))
            .await?
            .take::<Vec<StaffRow>>(0)?
            .into_iter()
            .next();

        row.map(staff_from_row).ok_or_else(|| CatalogError::NotFound {
            message: staff_id.to_owned().into(),
            context: Some("staff lookup".into()),
        })
    }

    /// Salon-wide opening hours for one weekday, when configured.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn operating_hours(
        &self,
        salon_id: &str,
        day: DayOfWeek,
    ) -> Result<Option<OperatingHours>, CatalogError> {
        let row = self
            .db
            .query(format!("SELECT * FROM {OPERATING_HOURS} WHERE salon_id = $salon AND day = $day"))
            .bind(("salon", salon_id.to_owned()))
            .bind(("day", day.as_str()))
            .await?
            .take::<Vec<HoursRow>>(0)?
            .into_iter()
            .next();

        row.map(hours_from_row).transpose()
    }

    /// The full weekly opening schedule of a salon.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn week_hours(&self, salon_id: &str) -> Result<Vec<OperatingHours>, CatalogError> {
        let rows = self
            .db
            .query(format!("SELECT * FROM {OPERATING_HOURS} WHERE salon_id = $salon"))
            .bind(("salon", salon_id.to_owned()))
            .await?
            .take::<Vec<HoursRow>>(0)?;

        rows.into_iter().map(hours_from_row).collect()
    }

    /// A staff member's working window for one weekday, when scheduled.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn staff_schedule(
        &self,
        staff_id: &str,
        day: DayOfWeek,
    ) -> Result<Option<StaffSchedule>, CatalogError> {
        let row = self
            .db
            .query(format!("SELECT * FROM {STAFF_SCHEDULE} WHERE staff_id = $staff AND day = $day"))
            .bind(("staff", staff_id.to_owned()))
            .bind(("day", day.as_str()))
            .await?
            .take::<Vec<ScheduleRow>>(0)?
            .into_iter()
            .next();

        row.map(schedule_from_row).transpose()
    }

    /// Every staff working window configured for one salon weekday.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn salon_schedules(
        &self,
        salon_id: &str,
        day: DayOfWeek,
    ) -> Result<Vec<StaffSchedule>, CatalogError> {
        let rows = self
            .db
            .query(format!("SELECT * FROM {STAFF_SCHEDULE} WHERE salon_id = $salon AND day = $day"))
            .bind(("salon", salon_id.to_owned()))
            .bind(("day", day.as_str()))
            .await?
            .take::<Vec<ScheduleRow>>(0)?;

        rows.into_iter().map(schedule_from_row).collect()
    }

    // --- Management (seeding and admin tooling) ---

    /// Inserts a salon record.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn add_salon(&self, salon: &Salon) -> Result<(), CatalogError> {
        let row = SalonRow {
            uid: salon.id.clone(),
            name: salon.name.clone(),
            slug: salon.slug.clone(),
            description: salon.description.clone(),
            is_active: salon.is_active,
            is_accepting_bookings: salon.is_accepting_bookings,
            rating_average: salon.rating_average,
            rating_count: i64::from(salon.rating_count),
        };
        self.db
            .query(format!("CREATE {SALON} CONTENT $data"))
            .bind(("data", row))
            .await?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Inserts a service record.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn add_service(&self, service: &Service) -> Result<(), CatalogError> {
        let row = ServiceRow {
            uid: service.id.clone(),
            salon_id: service.salon_id.clone(),
            name: service.name.clone(),
            duration_minutes: i64::from(service.duration_minutes),
            base_price: service.base_price,
            is_active: service.is_active,
        };
        self.db
            .query(format!("CREATE {SERVICE} CONTENT $data"))
            .bind(("data", row))
            .await?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Inserts a staff record.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn add_staff(&self, staff: &StaffMember) -> Result<(), CatalogError> {
        let row = StaffRow {
            uid: staff.id.clone(),
            salon_id: staff.salon_id.clone(),
            display_name: staff.display_name.clone(),
            title: staff.title.clone(),
            is_active: staff.is_active,
        };
        self.db
            .query(format!("CREATE {STAFF} CONTENT $data"))
            .bind(("data", row))
            .await?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Replaces the opening hours of one salon weekday.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn set_operating_hours(&self, hours: &OperatingHours) -> Result<(), CatalogError> {
        let row = HoursRow {
            salon_id: hours.salon_id.clone(),
            day: hours.day.as_str().to_owned(),
            open_time: format_hhmm(hours.open_time),
            close_time: format_hhmm(hours.close_time),
            is_closed: hours.is_closed,
        };
        self.db
            .query(format!(
                "DELETE FROM {OPERATING_HOURS} WHERE salon_id = $salon AND day = $day;
                CREATE {OPERATING_HOURS} CONTENT $data;"
            ))
            .bind(("salon", hours.salon_id.clone()))
            .bind(("day", hours.day.as_str()))
            .bind(("data", row))
            .await?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Replaces the working window of one staff weekday.
    ///
    /// # Errors
    /// Returns [`CatalogError::Storage`] on query failures.
    pub async fn set_staff_schedule(&self, schedule: &StaffSchedule) -> Result<(), CatalogError> {
        let row = ScheduleRow {
            staff_id: schedule.staff_id.clone(),
            salon_id: schedule.salon_id.clone(),
            day: schedule.day.as_str().to_owned(),
            start_time: format_hhmm(schedule.start_time),
            end_time: format_hhmm(schedule.end_time),
        };
        self.db
            .query(format!(
                "DELETE FROM {STAFF_SCHEDULE} WHERE staff_id = $staff AND day = $day;
                CREATE {STAFF_SCHEDULE} CONTENT $data;"
            ))
            .bind(("staff", schedule.staff_id.clone()))
            .bind(("day", schedule.day.as_str()))
            .bind(("data", row))
            .await?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }
}

fn salon_from_row(row: SalonRow) -> Salon {
    Salon {
        id: row.uid,
        name: row.name,
        slug: row.slug,
        description: row.description,
        is_active: row.is_active,
        is_accepting_bookings: row.is_accepting_bookings,
        rating_average: row.rating_average,
        rating_count: u32::try_from(row.rating_count).unwrap_or_default(),
    }
}

fn service_from_row(row: ServiceRow) -> Result<Service, CatalogError> {
    let duration_minutes = u32::try_from(row.duration_minutes).map_err(|_| CatalogError::Data {
        message: format!("negative duration on service {}", row.uid).into(),
        context: None,
    })?;
    Ok(Service {
        id: row.uid,
        salon_id: row.salon_id,
        name: row.name,
        duration_minutes,
        base_price: row.base_price,
        is_active: row.is_active,
    })
}

fn staff_from_row(row: StaffRow) -> StaffMember {
    StaffMember {
        id: row.uid,
        salon_id: row.salon_id,
        display_name: row.display_name,
        title: row.title,
        is_active: row.is_active,
    }
}

fn hours_from_row(row: HoursRow) -> Result<OperatingHours, CatalogError> {
    Ok(OperatingHours {
        day: parse_day(&row.day)?,
        open_time: parse_time(&row.open_time, "open_time")?,
        close_time: parse_time(&row.close_time, "close_time")?,
        salon_id: row.salon_id,
        is_closed: row.is_closed,
    })
}

fn schedule_from_row(row: ScheduleRow) -> Result<StaffSchedule, CatalogError> {
    Ok(StaffSchedule {
        day: parse_day(&row.day)?,
        start_time: parse_time(&row.start_time, "start_time")?,
        end_time: parse_time(&row.end_time, "end_time")?,
        staff_id: row.staff_id,
        salon_id: row.salon_id,
    })
}

fn parse_day(value: &str) -> Result<DayOfWeek, CatalogError> {
    match value {
        "monday" => Ok(DayOfWeek::Monday),
        "tuesday" => Ok(DayOfWeek::Tuesday),
        "wednesday" => Ok(DayOfWeek::Wednesday),
        "thursday" => Ok(DayOfWeek::Thursday),
        "friday" => Ok(DayOfWeek::Friday),
        "saturday" => Ok(DayOfWeek::Saturday),
        "sunday" => Ok(DayOfWeek::Sunday),
        other => Err(CatalogError::Data {
            message: format!("unknown weekday '{other}'").into(),
            context: None,
        }),
    }
}

fn parse_time(value: &str, field: &'static str) -> Result<NaiveTime, CatalogError> {
    parse_hhmm(value).ok_or_else(|| CatalogError::Data {
        message: format!("invalid time '{value}'").into(),
        context: Some(field.into()),
    })
}
