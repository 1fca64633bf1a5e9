//! Operator-facing notifications.
//!
//! Every operator action ends in a [`Notification`]: a severity level and a
//! message. Credential misconfiguration gets a fixed, actionable message;
//! remote failures echo the directory's error text.

use serde::{Deserialize, Serialize};

use crate::error::ProvisioningError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Danger,
            message: message.into(),
        }
    }
}

impl From<&ProvisioningError> for Notification {
    fn from(err: &ProvisioningError) -> Self {
        match err {
            ProvisioningError::CredentialsMissing { .. } => {
                Notification::danger("Directory credentials missing in configuration")
            }
            ProvisioningError::GroupNotFound { tried } => Notification::warning(format!(
                "DL not found. Tried: {}",
                tried.join(" and ")
            )),
            ProvisioningError::TokenAcquisitionFailed(msg)
            | ProvisioningError::DirectoryLookupError(msg)
            | ProvisioningError::AccountCreationFailed(msg)
            | ProvisioningError::MembershipLinkFailed(msg)
            | ProvisioningError::InvalidRecord(msg) => Notification::danger(format!("Error: {}", msg)),
            other => Notification::danger(format!("Error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_missing_is_actionable() {
        let err = ProvisioningError::CredentialsMissing {
            missing: vec!["client_secret".to_string()],
        };
        let notification = Notification::from(&err);
        assert_eq!(notification.level, NotificationLevel::Danger);
        assert_eq!(
            notification.message,
            "Directory credentials missing in configuration"
        );
    }

    #[test]
    fn test_remote_error_echoes_message() {
        let err = ProvisioningError::AccountCreationFailed(
            "Another object with the same value for property userPrincipalName already exists."
                .to_string(),
        );
        let notification = Notification::from(&err);
        assert_eq!(notification.level, NotificationLevel::Danger);
        assert!(notification.message.contains("userPrincipalName already exists"));
    }

    #[test]
    fn test_group_not_found_is_warning() {
        let err = ProvisioningError::GroupNotFound {
            tried: vec![
                "DL_Ops@techcarrot.ae".to_string(),
                "DL_ops@techcarrot.ae".to_string(),
            ],
        };
        let notification = Notification::from(&err);
        assert_eq!(notification.level, NotificationLevel::Warning);
        assert_eq!(
            notification.message,
            "DL not found. Tried: DL_Ops@techcarrot.ae and DL_ops@techcarrot.ae"
        );
    }

    #[test]
    fn test_serializes_snake_case_level() {
        let json = serde_json::to_value(Notification::success("Linked")).unwrap();
        assert_eq!(json["level"], "success");
        assert_eq!(json["message"], "Linked");
    }
}
