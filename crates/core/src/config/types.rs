use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::error::ProvisioningError;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Operator API authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when `method = "api_key"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mailwright.db")
}

/// Directory (Microsoft Graph) connection settings.
///
/// The four identity values are optional at parse time so that a partially
/// configured deployment still starts; every provisioning operation checks
/// them through [`DirectoryConfig::credentials`] before touching the network.
#[derive(Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Mail domain accounts and distribution lists live under (e.g. "techcarrot.ae").
    #[serde(default)]
    pub domain: Option<String>,
    /// Token authority base URL.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// Graph API base URL, including the version segment.
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    /// OAuth scope requested in the client-credentials exchange.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_login_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_graph_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_scope() -> String {
    "https://graph.microsoft.com/.default".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("domain", &self.domain)
            .field("login_url", &self.login_url)
            .field("graph_url", &self.graph_url)
            .field("scope", &self.scope)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            domain: None,
            login_url: default_login_url(),
            graph_url: default_graph_url(),
            scope: default_scope(),
            timeout_secs: default_timeout(),
        }
    }
}

/// The four values every directory operation needs, all known to be present.
#[derive(Clone)]
pub struct DirectoryCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub domain: String,
}

impl std::fmt::Debug for DirectoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("domain", &self.domain)
            .finish()
    }
}

impl DirectoryConfig {
    /// Resolve the credential set, failing with `CredentialsMissing` naming
    /// every absent or blank key.
    pub fn credentials(&self) -> Result<DirectoryCredentials, ProvisioningError> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let tenant_id = present(&self.tenant_id);
        let client_id = present(&self.client_id);
        let client_secret = present(&self.client_secret);
        let domain = present(&self.domain);

        let mut missing = Vec::new();
        if tenant_id.is_none() {
            missing.push("tenant_id".to_string());
        }
        if client_id.is_none() {
            missing.push("client_id".to_string());
        }
        if client_secret.is_none() {
            missing.push("client_secret".to_string());
        }
        if domain.is_none() {
            missing.push("domain".to_string());
        }

        match (tenant_id, client_id, client_secret, domain) {
            (Some(tenant_id), Some(client_id), Some(client_secret), Some(domain)) => {
                Ok(DirectoryCredentials {
                    tenant_id,
                    client_id,
                    client_secret,
                    domain,
                })
            }
            _ => Err(ProvisioningError::CredentialsMissing { missing }),
        }
    }
}

/// Fixed values stamped onto every account and the naming rules used
/// for address allocation and distribution list lookup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvisioningConfig {
    /// ISO country code set as the account's usage location.
    #[serde(default = "default_usage_location")]
    pub usage_location: String,
    /// Initial password; users must change it at first sign-in.
    #[serde(default = "default_initial_password")]
    pub initial_password: String,
    /// Highest numeric suffix tried before giving up (suffixes start at 2).
    #[serde(default = "default_max_suffix")]
    pub max_suffix: u32,
    /// Prefix of distribution list addresses (e.g. "DL_Finance@...").
    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,
}

fn default_usage_location() -> String {
    "AE".to_string()
}

fn default_initial_password() -> String {
    "Welcome@123".to_string()
}

fn default_max_suffix() -> u32 {
    100
}

fn default_group_prefix() -> String {
    "DL_".to_string()
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            usage_location: default_usage_location(),
            initial_password: default_initial_password(),
            max_suffix: default_max_suffix(),
            group_prefix: default_group_prefix(),
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub directory: SanitizedDirectoryConfig,
    pub provisioning: SanitizedProvisioningConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
}

/// Directory settings with the client secret hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDirectoryConfig {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret_configured: bool,
    pub domain: Option<String>,
    pub login_url: String,
    pub graph_url: String,
    pub timeout_secs: u32,
    /// True when all four credential values are present.
    pub ready: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProvisioningConfig {
    pub usage_location: String,
    pub initial_password_configured: bool,
    pub max_suffix: u32,
    pub group_prefix: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let directory = &config.directory;
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
            },
            server: config.server.clone(),
            database: config.database.clone(),
            directory: SanitizedDirectoryConfig {
                tenant_id: directory.tenant_id.clone(),
                client_id: directory.client_id.clone(),
                client_secret_configured: directory
                    .client_secret
                    .as_deref()
                    .is_some_and(|s| !s.trim().is_empty()),
                domain: directory.domain.clone(),
                login_url: directory.login_url.clone(),
                graph_url: directory.graph_url.clone(),
                timeout_secs: directory.timeout_secs,
                ready: directory.credentials().is_ok(),
            },
            provisioning: SanitizedProvisioningConfig {
                usage_location: config.provisioning.usage_location.clone(),
                initial_password_configured: !config.provisioning.initial_password.is_empty(),
                max_suffix: config.provisioning.max_suffix,
                group_prefix: config.provisioning.group_prefix.clone(),
            },
        }
    }
}
