//! Microsoft Graph directory client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DirectoryConfig;
use crate::token::BearerToken;

use super::{
    build_http_client, Directory, DirectoryAccount, DirectoryError, DirectoryGroup, NewAccount,
    PrincipalLookup,
};

/// Graph v1.0 client.
pub struct GraphDirectory {
    client: Client,
    graph_url: String,
}

impl GraphDirectory {
    /// Create a new Graph client.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resource URL of an account, as used in `@odata.id` references.
    pub fn account_url(&self, account_id: &str) -> String {
        format!("{}/users/{}", self.graph_url, urlencoding::encode(account_id))
    }
}

/// OData string literals escape a single quote by doubling it.
fn odata_quote(value: &str) -> String {
    value.replace('\'', "''")
}

#[async_trait]
impl Directory for GraphDirectory {
    async fn lookup_principal(
        &self,
        token: &BearerToken,
        principal_name: &str,
    ) -> Result<PrincipalLookup, DirectoryError> {
        let url = self.account_url(principal_name);
        debug!("Graph lookup: {}", principal_name);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .send()
            .await?;

        Ok(PrincipalLookup::from_status(response.status().as_u16()))
    }

    async fn create_account(
        &self,
        token: &BearerToken,
        account: &NewAccount,
    ) -> Result<DirectoryAccount, DirectoryError> {
        let url = format!("{}/users", self.graph_url);
        debug!("Graph create account: {}", account.user_principal_name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(account)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 201 {
            let body = response.text().await.unwrap_or_default();
            let message = graph_error_message(&body).unwrap_or_else(|| "Unknown error".to_string());
            warn!("Graph create account returned {}: {}", status, message);
            return Err(DirectoryError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<DirectoryAccount>().await.map_err(|e| {
            DirectoryError::ParseError(format!("Failed to parse created account: {}", e))
        })
    }

    async fn find_groups_by_mail(
        &self,
        token: &BearerToken,
        mail: &str,
    ) -> Result<Vec<DirectoryGroup>, DirectoryError> {
        let url = format!("{}/groups", self.graph_url);
        let filter = format!("mail eq '{}'", odata_quote(mail));
        debug!("Graph group search: {}", filter);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .query(&[("$filter", filter.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::ApiError {
                status: status.as_u16(),
                message: graph_error_message(&body).unwrap_or(body),
            });
        }

        let page: GraphCollection<DirectoryGroup> = response.json().await.map_err(|e| {
            DirectoryError::ParseError(format!("Failed to parse group search: {}", e))
        })?;

        Ok(page.value)
    }

    async fn add_group_member(
        &self,
        token: &BearerToken,
        group_id: &str,
        account_id: &str,
    ) -> Result<u16, DirectoryError> {
        let url = format!(
            "{}/groups/{}/members/$ref",
            self.graph_url,
            urlencoding::encode(group_id)
        );
        let body = serde_json::json!({ "@odata.id": self.account_url(account_id) });
        debug!("Graph add member: group={} account={}", group_id, account_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

/// Extract `error.message` from a Graph error body.
fn graph_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<GraphErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
}

// ============================================================================
// Graph API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphCollection<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    error: Option<GraphErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    #[serde(default)]
    message: Option<String>,
}
