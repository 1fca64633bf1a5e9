use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Operator};

/// Accepts every request. Must be selected explicitly with `method = "none"`.
#[derive(Debug, Default)]
pub struct NoneAuthenticator;

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Operator, AuthError> {
        let mut operator = Operator::anonymous();
        if let Some(name) = request.declared_operator() {
            operator.name = name.to_string();
        }
        Ok(operator)
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
