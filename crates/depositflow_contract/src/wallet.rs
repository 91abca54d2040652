use serde::{Deserialize, Serialize};

use crate::code::{CodeError, TransactionCode};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletCodeResponse {
    #[serde(default)]
    pub wallet_code: Option<String>,
}

impl WalletCodeResponse {
    pub fn transaction_code(&self) -> Result<TransactionCode, CodeError> {
        TransactionCode::parse(self.wallet_code.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    Confirmed,
    Failed,
    Pending,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentCheckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl PaymentCheckResponse {
    pub fn classify(&self) -> PaymentState {
        let status = self.status.as_deref().map(str::trim);
        if status.is_some_and(|s| s.eq_ignore_ascii_case("success")) || self.success == Some(true)
        {
            PaymentState::Confirmed
        } else if status.is_some_and(|s| s.eq_ignore_ascii_case("failed")) {
            PaymentState::Failed
        } else {
            PaymentState::Pending
        }
    }

    pub fn from_state(state: PaymentState) -> Self {
        let (status, success) = match state {
            PaymentState::Confirmed => ("success", true),
            PaymentState::Failed => ("failed", false),
            PaymentState::Pending => ("pending", false),
        };
        Self {
            status: Some(status.to_string()),
            success: Some(success),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxPaymentUpdate {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::{PaymentCheckResponse, PaymentState, WalletCodeResponse};

    fn decode(body: &str) -> PaymentCheckResponse {
        serde_json::from_str(body).expect("decode")
    }

    #[test]
    fn success_flag_alone_confirms() {
        assert_eq!(decode(r#"{"success":true}"#).classify(), PaymentState::Confirmed);
    }

    #[test]
    fn status_strings_classify() {
        assert_eq!(
            decode(r#"{"status":"SUCCESS"}"#).classify(),
            PaymentState::Confirmed
        );
        assert_eq!(
            decode(r#"{"status":"failed","success":false}"#).classify(),
            PaymentState::Failed
        );
        assert_eq!(decode(r#"{"status":"pending"}"#).classify(), PaymentState::Pending);
    }

    #[test]
    fn unknown_or_empty_bodies_stay_pending() {
        assert_eq!(decode("{}").classify(), PaymentState::Pending);
        assert_eq!(
            decode(r#"{"status":"processing"}"#).classify(),
            PaymentState::Pending
        );
    }

    #[test]
    fn missing_wallet_code_is_rejected() {
        let body: WalletCodeResponse = serde_json::from_str("{}").expect("decode");
        assert!(body.transaction_code().is_err());

        let body: WalletCodeResponse =
            serde_json::from_str(r#"{"wallet_code":"ABC123"}"#).expect("decode");
        assert_eq!(body.transaction_code().expect("code").as_str(), "ABC123");
    }
}
