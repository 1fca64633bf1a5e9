use serde::{Deserialize, Serialize};

/// Outcome of a lookup-by-principal-name call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalLookup {
    /// 200: an account already holds this principal name.
    Present,
    /// 404: the principal name is free.
    Absent,
    /// Any other status.
    Unexpected { status: u16 },
}

impl PrincipalLookup {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => PrincipalLookup::Present,
            404 => PrincipalLookup::Absent,
            status => PrincipalLookup::Unexpected { status },
        }
    }
}

/// Body of a create-account request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub account_enabled: bool,
    pub display_name: String,
    pub mail_nickname: String,
    pub user_principal_name: String,
    pub usage_location: String,
    pub password_profile: PasswordProfile,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordProfile {
    pub force_change_password_next_sign_in: bool,
    pub password: String,
}

impl std::fmt::Debug for PasswordProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordProfile")
            .field(
                "force_change_password_next_sign_in",
                &self.force_change_password_next_sign_in,
            )
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An account as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryAccount {
    pub id: String,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A distribution group as returned by a mail search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryGroup {
    pub id: String,
    #[serde(default)]
    pub mail: Option<String>,
}
