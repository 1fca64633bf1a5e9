//! Personnel API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use mailwright_core::{
    AuditEvent, CreatePersonnelRequest, Notification, PersonnelRecord, ProvisioningError,
    ProvisioningReport, ProvisioningTrigger, RecordEvent,
};

use super::handlers::{record_error, ErrorResponse};
use super::middleware::AuthUser;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a personnel record
#[derive(Debug, Deserialize)]
pub struct CreatePersonnelBody {
    pub display_name: String,
    pub unit_id: Option<String>,
}

/// Error response for a failed provisioning run
#[derive(Debug, Serialize)]
pub struct ProvisionErrorResponse {
    pub error: String,
    /// `ProvisioningError::kind()`
    pub kind: String,
    pub notification: Notification,
}

impl From<&ProvisioningError> for ProvisionErrorResponse {
    fn from(err: &ProvisioningError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
            notification: Notification::from(err),
        }
    }
}

/// HTTP status for a failed provisioning run.
fn provision_status(err: &ProvisioningError) -> StatusCode {
    match err {
        ProvisioningError::CredentialsMissing { .. } => StatusCode::SERVICE_UNAVAILABLE,
        ProvisioningError::InvalidRecord(_) | ProvisioningError::AddressExhausted { .. } => {
            StatusCode::CONFLICT
        }
        ProvisioningError::TokenAcquisitionFailed(_)
        | ProvisioningError::DirectoryLookupError(_)
        | ProvisioningError::AccountCreationFailed(_)
        | ProvisioningError::MembershipLinkFailed(_)
        | ProvisioningError::GroupNotFound { .. } => StatusCode::BAD_GATEWAY,
        ProvisioningError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a personnel record and hand it to the provisioning handler
pub async fn create_personnel(
    State(state): State<Arc<AppState>>,
    AuthUser(operator): AuthUser,
    Json(body): Json<CreatePersonnelBody>,
) -> Result<(StatusCode, Json<PersonnelRecord>), (StatusCode, Json<ErrorResponse>)> {
    let record = state
        .records()
        .create_personnel(CreatePersonnelRequest {
            display_name: body.display_name,
            unit_id: body.unit_id,
        })
        .map_err(record_error)?;

    state.audit().try_emit(AuditEvent::PersonnelCreated {
        record_id: record.id.clone(),
        display_name: record.display_name.clone(),
        unit_id: record.unit_id.clone(),
        created_by: operator,
    });

    state
        .publisher()
        .publish(RecordEvent::PersonnelCreated {
            record_id: record.id.clone(),
        })
        .await;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Get a personnel record by ID
pub async fn get_personnel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PersonnelRecord>, (StatusCode, Json<ErrorResponse>)> {
    match state.records().get_personnel(&id).map_err(record_error)? {
        Some(record) => Ok(Json(record)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("Personnel record not found: {}", id))),
        )),
    }
}

/// Re-run provisioning for a record (operator trigger)
pub async fn provision(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ProvisioningReport>, (StatusCode, Json<ProvisionErrorResponse>)> {
    match state.records().get_personnel(&id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            let err = ProvisioningError::InvalidRecord(format!("personnel record {} not found", id));
            return Err((StatusCode::NOT_FOUND, Json(ProvisionErrorResponse::from(&err))));
        }
        Err(e) => {
            let err = ProvisioningError::Store(e);
            return Err((provision_status(&err), Json(ProvisionErrorResponse::from(&err))));
        }
    }

    state
        .orchestrator()
        .provision(&id, ProvisioningTrigger::Manual)
        .await
        .map(Json)
        .map_err(|e| (provision_status(&e), Json(ProvisionErrorResponse::from(&e))))
}
