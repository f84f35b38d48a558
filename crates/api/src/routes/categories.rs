//! Category listing and batch creation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::CategoryRequest;
use store::{Category, RegistrationStore};

use super::AppState;
use crate::error::ApiError;
use crate::identity::Identity;

/// GET /categories: every category, in id order.
#[tracing::instrument(skip(state))]
pub async fn list<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(_caller): Identity,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.services.categories.list().await?;
    Ok(Json(categories))
}

/// POST /categories: create a batch of categories atomically.
#[tracing::instrument(skip(state, requests), fields(count = requests.len()))]
pub async fn create<S: RegistrationStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Identity(_caller): Identity,
    Json(requests): Json<Vec<CategoryRequest>>,
) -> Result<(StatusCode, Json<Vec<Category>>), ApiError> {
    let created = state.services.categories.create(&requests).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
