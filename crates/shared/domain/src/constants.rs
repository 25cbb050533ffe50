//! Entity table names and `OpenAPI` tags shared across slices.

// Record tables.
pub const SALON: &str = "salon";
pub const SERVICE: &str = "service";
pub const STAFF: &str = "staff";
pub const APPOINTMENT: &str = "appointment";
pub const APPOINTMENT_SERVICE: &str = "appointment_service";
pub const OPERATING_HOURS: &str = "operating_hours";
pub const STAFF_SCHEDULE: &str = "staff_schedule";

// OpenAPI tags.
pub const SYSTEM_TAG: &str = "System";
pub const BOOKING_TAG: &str = "Booking";
pub const AVAILABILITY_TAG: &str = "Availability";
pub const CATALOG_TAG: &str = "Catalog";
pub const FEED_TAG: &str = "Live Feed";
