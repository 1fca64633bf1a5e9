//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use mailwright_core::{AuthError, AuthRequest, Operator};

use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Lowercased header map handed to the authenticator.
fn header_map(request: &Request<Body>) -> HashMap<String, String> {
    request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            let value = value.to_str().ok()?;
            Some((name.as_str().to_lowercase(), value.to_string()))
        })
        .collect()
}

/// Metric label and response status for a failed authentication.
fn rejection(error: &AuthError) -> (&'static str, StatusCode) {
    match error {
        AuthError::NotAuthenticated => ("not_authenticated", StatusCode::UNAUTHORIZED),
        AuthError::InvalidCredentials(_) => ("invalid_credentials", StatusCode::UNAUTHORIZED),
        AuthError::ConfigurationError(_) => ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Runs the configured authenticator on every protected request.
///
/// The resulting [`Operator`] is stored in the request extensions for
/// [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_request = AuthRequest {
        headers: header_map(&request),
    };

    let operator = state
        .authenticator()
        .authenticate(&auth_request)
        .await
        .map_err(|e| {
            let (label, status) = rejection(&e);
            tracing::debug!(reason = label, "Rejected request: {}", e);
            AUTH_FAILURES_TOTAL.with_label_values(&[label]).inc();
            status
        })?;

    request.extensions_mut().insert::<Operator>(operator);
    Ok(next.run(request).await)
}

/// Extractor for the acting operator's name.
///
/// Falls back to "anonymous" if no operator is present.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let name = parts
            .extensions
            .get::<Operator>()
            .map(|op| op.name.clone())
            .unwrap_or_else(|| Operator::anonymous().name);
        std::future::ready(Ok(AuthUser(name)))
    }
}
