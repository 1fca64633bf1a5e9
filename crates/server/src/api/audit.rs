//! Audit trail query handler.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use mailwright_core::{AuditFilter, AuditRecord};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Maximum allowed limit for audit queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for audit queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for audit endpoint
#[derive(Debug, Default, Deserialize)]
pub struct AuditQueryParams {
    /// Personnel record or unit ID
    pub record_id: Option<String>,
    pub event_type: Option<String>,
    /// Only events at or after this instant (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Only events at or before this instant (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQueryParams {
    /// Filter without pagination, shared by the page query and the count.
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            record_id: self.record_id.clone(),
            event_type: self.event_type.clone(),
            ..AuditFilter::new()
        }
        .between(self.from, self.to)
    }

    fn page(&self) -> (i64, i64) {
        (
            self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// Response for audit query endpoint
#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    /// Newest first
    pub events: Vec<AuditRecord>,
    /// Number of matching events ignoring pagination
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query audit events
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let base = params.filter();
    let (limit, offset) = params.page();

    let internal = |what: &str, e: mailwright_core::AuditError| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!("Failed to {} audit events: {}", what, e))),
        )
    };

    let events = state
        .audit_store()
        .query(&base.clone().page(limit, offset))
        .map_err(|e| internal("query", e))?;
    let total = state
        .audit_store()
        .count(&base)
        .map_err(|e| internal("count", e))?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_is_clamped() {
        let params = AuditQueryParams {
            limit: Some(5000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(params.page(), (MAX_LIMIT, 0));
        assert_eq!(AuditQueryParams::default().page(), (DEFAULT_LIMIT, 0));
    }

    #[test]
    fn test_filter_carries_record_and_type() {
        let params = AuditQueryParams {
            record_id: Some("p-1".to_string()),
            event_type: Some("account_provisioned".to_string()),
            ..Default::default()
        };
        let filter = params.filter();
        assert_eq!(filter.record_id.as_deref(), Some("p-1"));
        assert_eq!(filter.event_type.as_deref(), Some("account_provisioned"));
        assert!(filter.from.is_none());
    }
}
