//! `/users/` endpoints. Each handler is a thin adapter over
//! [`quickstart_core::UserViewSet`]; status codes and the `Location` header are
//! decided here.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use quickstart_core::UserRepresentation;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult, MSG_NOT_FOUND},
};

/// Path of a single user resource, as advertised in `Location`.
pub fn user_location(id: Uuid) -> String {
    format!("/users/{id}/")
}

/// Identifiers that are not UUIDs cannot name a document.
fn parse_lookup(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        debug!(lookup = raw, "rejecting malformed user id");
        AppError::not_found(MSG_NOT_FOUND)
    })
}

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserRepresentation>>> {
    let users = state.viewset().list().await?;
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    let (id, user) = state.viewset().create(&payload).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, user_location(id))],
        Json(user),
    )
        .into_response())
}

pub async fn retrieve_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<UserRepresentation>> {
    let id = parse_lookup(&id)?;
    Ok(Json(state.viewset().retrieve(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<UserRepresentation>> {
    let id = parse_lookup(&id)?;
    let Json(payload) = payload?;
    Ok(Json(state.viewset().update(id, &payload).await?))
}

pub async fn partial_update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<UserRepresentation>> {
    let id = parse_lookup(&id)?;
    let Json(payload) = payload?;
    Ok(Json(state.viewset().partial_update(id, &payload).await?))
}

pub async fn destroy_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_lookup(&id)?;
    state.viewset().destroy(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_uses_trailing_slash() {
        let id = Uuid::nil();
        assert_eq!(user_location(id), "/users/00000000-0000-0000-0000-000000000000/");
    }

    #[test]
    fn malformed_ids_are_not_found() {
        let err = parse_lookup("507f1f77bcf86cd799439011").unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(parse_lookup("0190a4c2-7b1e-7c3a-9f00-1234567890ab").is_ok());
    }
}
