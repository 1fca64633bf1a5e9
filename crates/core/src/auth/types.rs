use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Header an operator may send to name themselves in the audit trail.
pub const OPERATOR_HEADER: &str = "x-operator";

/// Request information for authentication.
///
/// Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
}

impl AuthRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The self-declared operator name, if non-blank.
    pub fn declared_operator(&self) -> Option<&str> {
        self.header(OPERATOR_HEADER)
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// The authenticated caller of an API request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Recorded as `created_by` on audit events.
    pub name: String,
    pub method: String,
}

impl Operator {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            method: "none".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_operator_ignores_blank() {
        let mut request = AuthRequest::default();
        assert_eq!(request.declared_operator(), None);

        request
            .headers
            .insert(OPERATOR_HEADER.to_string(), "  ".to_string());
        assert_eq!(request.declared_operator(), None);

        request
            .headers
            .insert(OPERATOR_HEADER.to_string(), " hr-admin ".to_string());
        assert_eq!(request.declared_operator(), Some("hr-admin"));
    }
}
