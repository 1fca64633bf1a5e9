//! OAuth2 client-credentials exchange against the tenant's token endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::{DirectoryConfig, DirectoryCredentials};
use crate::directory::{build_http_client, DirectoryError};
use crate::error::ProvisioningError;

use super::{BearerToken, TokenSource};

/// Token source that performs a client-credentials grant.
pub struct ClientCredentialsTokenSource {
    client: Client,
    login_url: String,
    scope: String,
}

impl ClientCredentialsTokenSource {
    /// Create a token source from directory settings.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            login_url: config.login_url.trim_end_matches('/').to_string(),
            scope: config.scope.clone(),
        })
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_url,
            urlencoding::encode(tenant_id)
        )
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsTokenSource {
    async fn acquire(
        &self,
        credentials: &DirectoryCredentials,
    ) -> Result<BearerToken, ProvisioningError> {
        let url = self.token_url(&credentials.tenant_id);
        debug!("Requesting directory token for tenant {}", credentials.tenant_id);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                ProvisioningError::TokenAcquisitionFailed(e.to_string())
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenResponse>(&body)
                .ok()
                .and_then(|r| r.error_description.or(r.error))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            error!("Token endpoint returned {}: {}", status, detail);
            return Err(ProvisioningError::TokenAcquisitionFailed(detail));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            ProvisioningError::TokenAcquisitionFailed(format!(
                "Failed to parse token response: {}",
                e
            ))
        })?;

        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(BearerToken::new(token)),
            _ => {
                error!("Token response did not contain an access_token");
                Err(ProvisioningError::TokenAcquisitionFailed(
                    "response did not contain an access_token".to_string(),
                ))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}
