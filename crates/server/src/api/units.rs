//! Organizational unit API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use mailwright_core::{AuditEvent, OrganizationalUnit, ProvisioningError, UnitGroupSync};

use super::handlers::{record_error, ErrorResponse};
use super::middleware::AuthUser;
use crate::state::AppState;

/// Request body for creating a unit
#[derive(Debug, Deserialize)]
pub struct CreateUnitBody {
    pub name: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

/// Create a new organizational unit
pub async fn create_unit(
    State(state): State<Arc<AppState>>,
    AuthUser(operator): AuthUser,
    Json(body): Json<CreateUnitBody>,
) -> ApiResult<(StatusCode, Json<OrganizationalUnit>)> {
    let unit = state.records().create_unit(&body.name).map_err(record_error)?;

    state.audit().try_emit(AuditEvent::UnitCreated {
        unit_id: unit.id.clone(),
        name: unit.name.clone(),
        created_by: operator,
    });

    Ok((StatusCode::CREATED, Json(unit)))
}

/// Get a unit by ID
pub async fn get_unit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<OrganizationalUnit>> {
    match state.records().get_unit(&id).map_err(record_error)? {
        Some(unit) => Ok(Json(unit)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Organizational unit not found: {}", id))),
        )),
    }
}

/// Resolve and record the unit's distribution list.
///
/// Directory failures are reported in the notification with a 200; only an
/// unknown unit or a store failure is an error status.
pub async fn sync_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UnitGroupSync>> {
    match state.orchestrator().sync_unit_group(&id).await {
        Ok(sync) => Ok(Json(sync)),
        Err(ProvisioningError::InvalidRecord(message)) => {
            Err((StatusCode::NOT_FOUND, Json(ErrorResponse::new(message))))
        }
        Err(ProvisioningError::Store(e)) => Err(record_error(e)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )),
    }
}
