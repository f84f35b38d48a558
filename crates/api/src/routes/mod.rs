pub mod bookings;
pub mod categories;
pub mod events;
pub mod health;
pub mod metrics;

use std::str::FromStr;

use domain::RegistrationServices;
use projections::EventQueries;
use store::RegistrationStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RegistrationStore> {
    pub services: RegistrationServices<S>,
    pub queries: EventQueries<S>,
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {what}: {raw}")))
}
