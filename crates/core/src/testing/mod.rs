//! Testing utilities and mock implementations.
//!
//! Mocks for the two external seams (token endpoint and directory) so the
//! allocator, linker and orchestrator can be exercised without a tenant.
//!
//! # Example
//!
//! ```rust,ignore
//! use mailwright_core::testing::{fixtures, MockDirectory, MockTokenSource};
//!
//! let directory = MockDirectory::new();
//! directory.add_principal("lalith.kumar@techcarrot.ae").await;
//!
//! let orchestrator = ProvisioningOrchestrator::new(
//!     fixtures::directory_config(),
//!     ProvisioningConfig::default(),
//!     Arc::new(MockTokenSource::new()),
//!     Arc::new(directory),
//!     records,
//!     None,
//! );
//! ```

mod mock_directory;
mod mock_token_source;

pub use mock_directory::{MockDirectory, RecordedDirectoryCall};
pub use mock_token_source::MockTokenSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{Config, DirectoryConfig};

    /// Mail domain used throughout the fixtures.
    pub const DOMAIN: &str = "techcarrot.ae";

    /// Directory settings with every credential present.
    pub fn directory_config() -> DirectoryConfig {
        DirectoryConfig {
            tenant_id: Some("tenant-1".to_string()),
            client_id: Some("client-1".to_string()),
            client_secret: Some("secret-1".to_string()),
            domain: Some(DOMAIN.to_string()),
            ..Default::default()
        }
    }

    /// A full configuration with open auth, credentials and an in-memory database path.
    pub fn config() -> Config {
        let mut config: Config = toml::from_str(
            r#"
            [auth]
            method = "none"
            "#,
        )
        .expect("fixture config parses");
        config.directory = directory_config();
        config.database.path = ":memory:".into();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures;

    #[test]
    fn test_fixture_credentials_are_complete() {
        let credentials = fixtures::directory_config().credentials().unwrap();
        assert_eq!(credentials.domain, fixtures::DOMAIN);
    }
}
