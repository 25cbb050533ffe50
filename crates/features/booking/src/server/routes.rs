use crate::availability::DayBoard;
use crate::error::BookingError;
use crate::repo::BookingFilter;
use crate::reservations::{BookingView, NewBooking};
use crate::Booking;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bloom_derive::{api_handler, api_model};
use bloom_domain::constants::{AVAILABILITY_TAG, BOOKING_TAG};
use bloom_domain::scheduling::{format_hhmm, parse_hhmm, AppointmentStatus};
use bloom_kernel::prelude::ApiState;
use chrono::{NaiveDate, NaiveTime};
use std::collections::BTreeMap;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn booking_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(check_availability_handler))
        .routes(routes!(availability_calendar_handler))
        .routes(routes!(capacity_handler))
        .routes(routes!(list_bookings_handler, create_booking_handler))
        .routes(routes!(patch_booking_handler, cancel_booking_handler))
        .routes(routes!(reschedule_booking_handler))
}

// --- Wire models ---

#[api_model]
/// Availability check request
pub struct AvailabilityRequest {
    /// Salon public id
    pub salon_id: String,
    /// Staff public id
    pub staff_id: String,
    /// Day to check, `YYYY-MM-DD`
    pub date: String,
    /// Requested services; durations add up
    pub service_ids: Vec<String>,
    /// Optional specific start time to verify, `HH:MM`
    #[serde(default)]
    pub time: Option<String>,
}

#[api_model]
/// Availability check response
pub struct AvailabilityResponse {
    /// Verdict for the requested time, or whether the day has any free slot
    pub available: bool,
    /// Why the requested time (or day) is unavailable
    pub reason: Option<String>,
    /// Free slot start times, `HH:MM`
    pub available_slots: Vec<String>,
    /// First free start time of the day
    pub next_available: Option<String>,
}

#[api_model]
#[derive(utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
/// Availability calendar query
pub struct CalendarQuery {
    pub salon_id: String,
    pub staff_id: String,
    /// Inclusive range start, `YYYY-MM-DD`
    pub start_date: String,
    /// Inclusive range end, `YYYY-MM-DD`
    pub end_date: String,
}

#[api_model]
/// Working hours of one day
pub struct WorkingHoursView {
    pub start: String,
    pub end: String,
}

#[api_model]
/// Booked interval of one day
pub struct BookedSlotView {
    pub start: String,
    pub end: String,
}

#[api_model]
/// One day in the availability calendar
pub struct DayAvailabilityView {
    pub available: bool,
    pub reason: Option<String>,
    pub working_hours: Option<WorkingHoursView>,
    pub booked_slots: Option<Vec<BookedSlotView>>,
}

#[api_model]
/// Availability calendar response
pub struct CalendarResponse {
    /// Per-date availability, keyed `YYYY-MM-DD`
    pub availability: BTreeMap<String, DayAvailabilityView>,
}

#[api_model]
#[derive(utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
/// Capacity query
pub struct CapacityQuery {
    pub salon_id: String,
    /// Day to report, `YYYY-MM-DD`
    pub date: String,
}

#[api_model]
/// Capacity snapshot for one salon day
pub struct CapacityView {
    pub date: String,
    pub total_slots: u32,
    pub booked_slots: u32,
    pub available_slots: u32,
    pub utilization_percentage: f64,
}

#[api_model]
/// Booking creation request
pub struct BookingRequest {
    pub salon_id: String,
    pub staff_id: String,
    /// Customer identity as established by the gateway
    pub customer_id: String,
    pub service_ids: Vec<String>,
    /// Day, `YYYY-MM-DD`
    pub date: String,
    /// Start time, `HH:MM`
    pub time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[api_model]
#[derive(utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
/// Booking list query
pub struct BookingListQuery {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub salon_id: Option<String>,
    #[serde(default)]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[api_model]
/// Status transition request
pub struct StatusPatch {
    /// Target status (back-office transitions; not `cancelled`)
    pub status: String,
}

#[api_model]
#[derive(utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
/// Cancellation query
pub struct CancelQuery {
    /// Owner of the appointment; required unless `hardDelete` is set
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Permanently remove the record instead of soft-cancelling
    #[serde(default)]
    pub hard_delete: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[api_model]
/// Reschedule request
pub struct RescheduleRequest {
    pub customer_id: String,
    /// New day, `YYYY-MM-DD`
    pub date: String,
    /// New start time, `HH:MM`
    pub time: String,
}

#[api_model]
/// Appointment as returned by the API
pub struct AppointmentView {
    pub id: String,
    pub salon_id: String,
    pub staff_id: String,
    pub customer_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub total_price: f64,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub can_cancel: bool,
    pub can_reschedule: bool,
}

#[api_model]
/// Booking list response
pub struct BookingListResponse {
    pub bookings: Vec<AppointmentView>,
}

#[api_model]
/// Booking mutation response
pub struct BookingResponse {
    pub success: bool,
    pub appointment: Option<AppointmentView>,
    pub message: String,
}

// --- Handlers ---

#[api_handler(
    post,
    path = "/api/availability",
    request_body = AvailabilityRequest,
    responses((status = OK, description = "Availability verdict and free slots", body = AvailabilityResponse)),
    tag = AVAILABILITY_TAG,
)]
async fn check_availability_handler(
    State(state): State<ApiState>,
    Json(request): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, BookingRejection> {
    let booking = slice(&state)?;
    let date = parse_date(&request.date)?;

    let duration = booking
        .service
        .availability()
        .total_duration(&request.salon_id, &request.service_ids)
        .await?;
    let board = booking
        .service
        .availability()
        .day_slots_for_duration(&request.salon_id, &request.staff_id, date, duration)
        .await?;

    let available_slots: Vec<String> = board
        .slots
        .iter()
        .filter(|slot| slot.available)
        .map(|slot| format_hhmm(slot.range.start))
        .collect();

    if let Some(time) = &request.time {
        let start = parse_time(time)?;
        let verdict = booking
            .service
            .availability()
            .check_slot(&request.salon_id, &request.staff_id, date, start, duration)
            .await?;
        return Ok(Json(AvailabilityResponse {
            available: verdict.available,
            reason: verdict.denial.map(|denial| denial.reason().to_owned()),
            next_available: first_slot(&board),
            available_slots,
        }));
    }

    Ok(Json(AvailabilityResponse {
        available: !available_slots.is_empty(),
        reason: board.denial.map(|denial| denial.reason().to_owned()),
        next_available: first_slot(&board),
        available_slots,
    }))
}

#[api_handler(
    get,
    path = "/api/availability",
    params(CalendarQuery),
    responses((status = OK, description = "Per-day availability over a date range", body = CalendarResponse)),
    tag = AVAILABILITY_TAG,
)]
async fn availability_calendar_handler(
    State(state): State<ApiState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarResponse>, BookingRejection> {
    let booking = slice(&state)?;
    let from = parse_date(&query.start_date)?;
    let to = parse_date(&query.end_date)?;

    let outlook =
        booking.service.availability().calendar(&query.salon_id, &query.staff_id, from, to).await?;

    let availability = outlook
        .into_iter()
        .map(|(date, day)| {
            let view = day.working.map_or_else(
                || DayAvailabilityView {
                    available: false,
                    reason: Some("Staff not working".to_owned()),
                    working_hours: None,
                    booked_slots: None,
                },
                |window| DayAvailabilityView {
                    available: true,
                    reason: None,
                    working_hours: Some(WorkingHoursView {
                        start: format_hhmm(window.start),
                        end: format_hhmm(window.end),
                    }),
                    booked_slots: Some(
                        day.booked
                            .iter()
                            .map(|slot| BookedSlotView {
                                start: format_hhmm(slot.start),
                                end: format_hhmm(slot.end),
                            })
                            .collect(),
                    ),
                },
            );
            (date.to_string(), view)
        })
        .collect();

    Ok(Json(CalendarResponse { availability }))
}

#[api_handler(
    get,
    path = "/api/capacity",
    params(CapacityQuery),
    responses((status = OK, description = "Salon-day utilization", body = CapacityView)),
    tag = AVAILABILITY_TAG,
)]
async fn capacity_handler(
    State(state): State<ApiState>,
    Query(query): Query<CapacityQuery>,
) -> Result<Json<CapacityView>, BookingRejection> {
    let booking = slice(&state)?;
    let date = parse_date(&query.date)?;

    let capacity = booking.service.availability().capacity(&query.salon_id, date).await?;
    Ok(Json(CapacityView {
        date: capacity.date.to_string(),
        total_slots: capacity.total_slots,
        booked_slots: capacity.booked_slots,
        available_slots: capacity.available_slots,
        utilization_percentage: capacity.utilization_pct,
    }))
}

#[api_handler(
    get,
    path = "/api/bookings",
    params(BookingListQuery),
    responses((status = OK, description = "Appointments, newest first", body = BookingListResponse)),
    tag = BOOKING_TAG,
)]
async fn list_bookings_handler(
    State(state): State<ApiState>,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<BookingListResponse>, BookingRejection> {
    let booking = slice(&state)?;

    let status = query
        .status
        .as_deref()
        .map(|value| {
            AppointmentStatus::parse(value).ok_or_else(|| {
                BookingRejection::bad_request(format!("Invalid status '{value}'"))
            })
        })
        .transpose()?;
    let date = query.date.as_deref().map(parse_date).transpose()?;

    let filter = BookingFilter {
        customer_id: query.customer_id,
        salon_id: query.salon_id,
        staff_id: query.staff_id,
        status,
        date,
    };

    let bookings = booking.service.list(&filter).await?;
    Ok(Json(BookingListResponse { bookings: bookings.iter().map(view_from).collect() }))
}

#[api_handler(
    post,
    path = "/api/bookings",
    request_body = BookingRequest,
    responses(
        (status = OK, description = "Booking created", body = BookingResponse),
        (status = CONFLICT, description = "Requested slot is not bookable"),
    ),
    tag = BOOKING_TAG,
)]
async fn create_booking_handler(
    State(state): State<ApiState>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<BookingResponse>, BookingRejection> {
    let booking = slice(&state)?;

    if request.service_ids.is_empty() {
        return Err(BookingRejection::bad_request("Missing required fields".to_owned()));
    }

    let new_booking = NewBooking {
        salon_id: request.salon_id,
        staff_id: request.staff_id,
        customer_id: request.customer_id,
        service_ids: request.service_ids,
        date: parse_date(&request.date)?,
        start: parse_time(&request.time)?,
        notes: request.notes,
    };

    let appointment = booking.service.create(new_booking).await?;
    let view = booking.service.get(&appointment.id).await?;

    Ok(Json(BookingResponse {
        success: true,
        appointment: Some(view_from(&view)),
        message: "Booking created successfully".to_owned(),
    }))
}

#[api_handler(
    patch,
    path = "/api/bookings/{appointment_id}",
    params(("appointment_id" = String, Path, description = "Appointment public id")),
    request_body = StatusPatch,
    responses((status = OK, description = "Booking updated", body = BookingResponse)),
    tag = BOOKING_TAG,
)]
async fn patch_booking_handler(
    State(state): State<ApiState>,
    Path(appointment_id): Path<String>,
    Json(patch): Json<StatusPatch>,
) -> Result<Json<BookingResponse>, BookingRejection> {
    let booking = slice(&state)?;

    let status = AppointmentStatus::parse(&patch.status)
        .ok_or_else(|| BookingRejection::bad_request(format!("Invalid status '{}'", patch.status)))?;

    booking.service.set_status(&appointment_id, status).await?;
    let view = booking.service.get(&appointment_id).await?;

    Ok(Json(BookingResponse {
        success: true,
        appointment: Some(view_from(&view)),
        message: "Booking updated successfully".to_owned(),
    }))
}

#[api_handler(
    delete,
    path = "/api/bookings/{appointment_id}",
    params(
        ("appointment_id" = String, Path, description = "Appointment public id"),
        CancelQuery,
    ),
    responses((status = OK, description = "Booking cancelled or deleted", body = BookingResponse)),
    tag = BOOKING_TAG,
)]
async fn cancel_booking_handler(
    State(state): State<ApiState>,
    Path(appointment_id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> Result<Json<BookingResponse>, BookingRejection> {
    let booking = slice(&state)?;

    if query.hard_delete {
        booking.service.delete(&appointment_id).await?;
        return Ok(Json(BookingResponse {
            success: true,
            appointment: None,
            message: "Booking deleted permanently".to_owned(),
        }));
    }

    let customer_id = query.customer_id.ok_or_else(|| {
        BookingRejection::bad_request("customerId is required to cancel".to_owned())
    })?;

    booking.service.cancel(&appointment_id, &customer_id, query.reason).await?;
    let view = booking.service.get(&appointment_id).await?;

    Ok(Json(BookingResponse {
        success: true,
        appointment: Some(view_from(&view)),
        message: "Booking cancelled successfully".to_owned(),
    }))
}

#[api_handler(
    post,
    path = "/api/bookings/{appointment_id}/reschedule",
    params(("appointment_id" = String, Path, description = "Appointment public id")),
    request_body = RescheduleRequest,
    responses(
        (status = OK, description = "Booking rescheduled", body = BookingResponse),
        (status = CONFLICT, description = "Target slot is not bookable"),
    ),
    tag = BOOKING_TAG,
)]
async fn reschedule_booking_handler(
    State(state): State<ApiState>,
    Path(appointment_id): Path<String>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<BookingResponse>, BookingRejection> {
    let booking = slice(&state)?;

    let date = parse_date(&request.date)?;
    let time = parse_time(&request.time)?;

    booking.service.reschedule(&appointment_id, &request.customer_id, date, time).await?;
    let view = booking.service.get(&appointment_id).await?;

    Ok(Json(BookingResponse {
        success: true,
        appointment: Some(view_from(&view)),
        message: "Booking rescheduled successfully".to_owned(),
    }))
}

// --- Helpers ---

fn slice(state: &ApiState) -> Result<&Booking, BookingRejection> {
    state.try_get_slice::<Booking>().map_err(|e| BookingRejection::internal(&e))
}

fn first_slot(board: &DayBoard) -> Option<String> {
    board.next_available().map(|range| format_hhmm(range.start))
}

fn parse_date(value: &str) -> Result<NaiveDate, BookingRejection> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| BookingRejection::bad_request(format!("Invalid date '{value}'")))
}

fn parse_time(value: &str) -> Result<NaiveTime, BookingRejection> {
    parse_hhmm(value)
        .ok_or_else(|| BookingRejection::bad_request(format!("Invalid time '{value}'")))
}

fn view_from(view: &BookingView) -> AppointmentView {
    let appointment = &view.appointment;
    AppointmentView {
        id: appointment.id.clone(),
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
        can_cancel: view.can_cancel,
        can_reschedule: view.can_reschedule,
    }
}

/// Maps booking errors onto HTTP responses with a JSON error body.
#[derive(Debug)]
pub struct BookingRejection {
    status: StatusCode,
    message: String,
}

impl BookingRejection {
    fn bad_request(message: String) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message }
    }

    fn internal(err: &dyn std::error::Error) -> Self {
        tracing::error!(error = %err, "Booking handler failure");
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: "Internal error".to_owned() }
    }
}

impl From<BookingError> for BookingRejection {
    fn from(err: BookingError) -> Self {
        let status = match &err {
            BookingError::Validation { .. } => StatusCode::BAD_REQUEST,
            BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
            BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            BookingError::SlotUnavailable { .. } => StatusCode::CONFLICT,
            BookingError::Policy { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Catalog { source, .. } => {
                return match source {
                    bloom_catalog::CatalogError::NotFound { message, .. } => Self {
                        status: StatusCode::NOT_FOUND,
                        message: format!("Not found: {message}"),
                    },
                    _ => Self::internal(&err),
                };
            },
            _ => return Self::internal(&err),
        };
        Self { status, message: err.to_string() }
    }
}

impl IntoResponse for BookingRejection {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}
