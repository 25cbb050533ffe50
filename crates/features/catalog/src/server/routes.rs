use crate::{Catalog, CatalogError};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bloom_derive::{api_handler, api_model};
use bloom_domain::constants::CATALOG_TAG;
use bloom_domain::scheduling::format_hhmm;
use bloom_kernel::prelude::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub fn catalog_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(booking_data_handler))
}

#[api_model]
/// Everything a booking flow needs to render one salon
pub struct SalonBookingData {
    /// Salon summary
    pub salon: SalonView,
    /// Bookable services
    pub services: Vec<ServiceView>,
    /// Bookable staff members
    pub staff: Vec<StaffView>,
    /// Weekly opening hours
    pub operating_hours: Vec<HoursView>,
}

#[api_model]
/// Salon summary
pub struct SalonView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_accepting_bookings: bool,
    pub rating: f64,
    pub review_count: u32,
}

#[api_model]
/// Bookable service
pub struct ServiceView {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub base_price: f64,
}

#[api_model]
/// Bookable staff member
pub struct StaffView {
    pub id: String,
    pub name: String,
    pub title: String,
}

#[api_model]
/// Opening hours for one weekday
pub struct HoursView {
    pub day: String,
    pub open: String,
    pub close: String,
    pub is_closed: bool,
}

#[api_handler(
    get,
    path = "/api/salons/{salon_id}/booking-data",
    params(("salon_id" = String, Path, description = "Salon public id")),
    responses(
        (status = OK, description = "Salon booking data", body = SalonBookingData),
        (status = NOT_FOUND, description = "Unknown or inactive salon"),
    ),
    tag = CATALOG_TAG,
)]
async fn booking_data_handler(
    State(state): State<ApiState>,
    Path(salon_id): Path<String>,
) -> Result<Json<SalonBookingData>, CatalogRejection> {
    let catalog = state.try_get_slice::<Catalog>().map_err(|e| CatalogRejection::internal(&e))?;

    let salon = catalog.repo.salon(&salon_id).await?;
    let services = catalog.repo.active_services(&salon_id).await?;
    let staff = catalog.repo.staff_roster(&salon_id).await?;
    let hours = catalog.repo.week_hours(&salon_id).await?;

    Ok(Json(SalonBookingData {
        salon: SalonView {
            id: salon.id,
            name: salon.name,
            slug: salon.slug,
            description: salon.description,
            is_accepting_bookings: salon.is_accepting_bookings,
            rating: salon.rating_average,
            review_count: salon.rating_count,
        },
        services: services
            .into_iter()
            .map(|s| ServiceView {
                id: s.id,
                name: s.name,
                duration_minutes: s.duration_minutes,
                base_price: s.base_price,
            })
            .collect(),
        staff: staff
            .into_iter()
            .map(|s| StaffView { id: s.id, name: s.display_name, title: s.title })
            .collect(),
        operating_hours: hours
            .into_iter()
            .map(|h| HoursView {
                day: h.day.as_str().to_owned(),
                open: format_hhmm(h.open_time),
                close: format_hhmm(h.close_time),
                is_closed: h.is_closed,
            })
            .collect(),
    }))
}

/// Maps catalog errors onto HTTP responses with a JSON error body.
#[derive(Debug)]
pub struct CatalogRejection {
    status: StatusCode,
    message: String,
}

impl CatalogRejection {
    fn internal(err: &dyn std::error::Error) -> Self {
        tracing::error!(error = %err, "Catalog handler failure");
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: "Internal error".to_owned() }
    }
}

impl From<CatalogError> for CatalogRejection {
    fn from(err: CatalogError) -> Self {
        match &err {
            CatalogError::NotFound { message, .. } => Self {
                status: StatusCode::NOT_FOUND,
                message: format!("Salon data not found: {message}"),
            },
            _ => Self::internal(&err),
        }
    }
}

impl IntoResponse for CatalogRejection {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}
