//! Registration, registration status and attendee list endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::EventId;
use domain::{Registration, RegistrationState};
use projections::EventAttendee;
use serde::Serialize;
use store::RegistrationStore;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::identity::Identity;

#[derive(Serialize)]
pub struct RegistrationStatusResponse {
    pub event_id: EventId,
    pub register_state: RegistrationState,
}

/// POST /events/{id}/bookings: register the caller for a free event.
#[tracing::instrument(skip(state))]
pub async fn register<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(attendee): Identity,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Registration>), ApiError> {
    let event_id = parse_id(&id, "event id")?;
    let registration = state.services.bookings.register(event_id, attendee).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

/// GET /events/{id}/bookings: confirmed attendees; creator only.
#[tracing::instrument(skip(state))]
pub async fn attendees<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<EventAttendee>>, ApiError> {
    let event_id = parse_id(&id, "event id")?;
    let attendees = state
        .queries
        .attendees_for_event(event_id, requester)
        .await?;
    Ok(Json(attendees))
}

/// GET /events/{id}/registration: the caller's registration state.
#[tracing::instrument(skip(state))]
pub async fn status<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(attendee): Identity,
    Path(id): Path<String>,
) -> Result<Json<RegistrationStatusResponse>, ApiError> {
    let event_id = parse_id(&id, "event id")?;
    let register_state = state
        .services
        .bookings
        .status_for_event(event_id, attendee)
        .await?;
    Ok(Json(RegistrationStatusResponse {
        event_id,
        register_state,
    }))
}
