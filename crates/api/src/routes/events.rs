//! Event creation, detail, update and listing endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CategoryId, EventId};
use domain::{CreateEventRequest, EventView, UpdateEventRequest};
use projections::{AttendeeBooking, EventSummary};
use serde::Deserialize;
use store::RegistrationStore;

use super::{AppState, parse_id};
use crate::error::ApiError;
use crate::identity::Identity;

#[derive(Debug, Deserialize)]
pub struct ListEventsParams {
    pub category_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RegisteredEventsParams {
    /// Comma-separated event ids.
    pub event_ids: Option<String>,
}

/// POST /events: create an event; the caller becomes its first attendee.
#[tracing::instrument(skip(state, request))]
pub async fn create<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(creator_id): Identity,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventView>), ApiError> {
    let view = state
        .services
        .events
        .create_event(&request, creator_id)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /events: upcoming events, optionally of one category.
#[tracing::instrument(skip(state))]
pub async fn list<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(_caller): Identity,
    Query(params): Query<ListEventsParams>,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let events = match params.category_id {
        Some(id) => {
            state
                .queries
                .events_in_category(CategoryId::new(id))
                .await?
        }
        None => state.queries.upcoming_events().await?,
    };
    Ok(Json(events))
}

/// GET /events/created: events the caller created, latest start first.
#[tracing::instrument(skip(state))]
pub async fn created<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let events = state.queries.events_created_by(caller).await?;
    Ok(Json(events))
}

/// GET /events/registered: the caller's confirmed bookings.
#[tracing::instrument(skip(state))]
pub async fn registered<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(caller): Identity,
    Query(params): Query<RegisteredEventsParams>,
) -> Result<Json<Vec<AttendeeBooking>>, ApiError> {
    let event_ids = params
        .event_ids
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .filter(|id| !id.trim().is_empty())
                .map(|id| parse_id::<EventId>(id, "event id"))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    let bookings = state
        .queries
        .bookings_for_attendee(caller, event_ids.as_deref())
        .await?;
    Ok(Json(bookings))
}

/// GET /events/{id}: one event as the caller sees it.
#[tracing::instrument(skip(state))]
pub async fn get<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(viewer): Identity,
    Path(id): Path<String>,
) -> Result<Json<EventView>, ApiError> {
    let event_id = parse_id(&id, "event id")?;
    let view = state
        .services
        .events
        .get_event_by_id(event_id, viewer)
        .await?;
    Ok(Json(view))
}

/// PATCH /events/{id}: partial update of the descriptive fields.
#[tracing::instrument(skip(state, request))]
pub async fn update<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(requester): Identity,
    Path(id): Path<String>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventView>, ApiError> {
    let event_id = parse_id(&id, "event id")?;
    let view = state
        .services
        .events
        .update_event(event_id, &request, requester)
        .await?;
    Ok(Json(view))
}
