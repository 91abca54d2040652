use async_trait::async_trait;
use depositflow_contract::{PaymentState, TransactionCode};
use http::StatusCode;
use thiserror::Error;

/// Credentials of the signed-in user, threaded explicitly into every backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub access_token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCheck {
    Found(PaymentState),
    NotFound,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("backend request timed out")]
    Timeout,
    #[error("backend returned {0}")]
    Status(StatusCode),
    #[error("backend rejected credentials")]
    Unauthorized,
    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
    #[error("backend response did not carry a wallet code")]
    MissingCode,
    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),
}

#[async_trait]
pub trait WalletBackend: Send + Sync {
    async fn issue_wallet_code(&self, auth: &AuthContext) -> Result<TransactionCode, BackendError>;

    async fn check_payment(
        &self,
        auth: &AuthContext,
        code: &TransactionCode,
    ) -> Result<PaymentCheck, BackendError>;
}
