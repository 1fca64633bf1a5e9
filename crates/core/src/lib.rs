pub mod allocator;
pub mod audit;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod group;
pub mod metrics;
pub mod notification;
pub mod orchestrator;
pub mod records;
pub mod testing;
pub mod token;

pub use allocator::{derive_mailbox_base, AddressAllocator, MailboxBase, ProvisionedAccount};
pub use audit::{
    create_audit_system, AuditError, AuditEvent, AuditFilter, AuditHandle, AuditRecord,
    AuditStore, AuditWriter, SqliteAuditStore,
};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator,
    NoneAuthenticator, Operator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, DatabaseConfig, DirectoryConfig, DirectoryCredentials, ProvisioningConfig,
    SanitizedConfig, ServerConfig,
};
pub use directory::{Directory, DirectoryError, GraphDirectory};
pub use error::ProvisioningError;
pub use group::{is_already_member_response, GroupLinker, MembershipOutcome, ResolvedGroup};
pub use notification::{Notification, NotificationLevel};
pub use orchestrator::{
    create_provisioning_handler, LinkResult, ProvisioningHandler, ProvisioningOrchestrator,
    ProvisioningReport, ProvisioningStage, ProvisioningTrigger, RecordEvent, RecordEventPublisher,
    UnitGroupSync,
};
pub use records::{
    CreatePersonnelRequest, OrganizationalUnit, PersonnelRecord, RecordError, RecordStore,
    SqliteRecordStore,
};
pub use token::{BearerToken, ClientCredentialsTokenSource, TokenSource};
