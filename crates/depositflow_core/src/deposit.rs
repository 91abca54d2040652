use std::sync::Arc;
use std::time::Duration;

use depositflow_backend::{AuthContext, BackendError, WalletBackend};
use depositflow_contract::TransactionCode;
use thiserror::Error;
use tracing::{info, warn};

use crate::ui::{FlowUi, Notice, Route};

pub const CODE_UNAVAILABLE_MESSAGE: &str =
    "We could not start your deposit right now. Please try again.";

#[derive(Debug, Error)]
pub enum DepositError {
    #[error("could not obtain a wallet transaction code: {0}")]
    Backend(#[from] BackendError),
}

/// Asks the wallet service for the one-time code that tags a bank transfer.
#[derive(Clone)]
pub struct CodeGenerator {
    backend: Arc<dyn WalletBackend>,
    auth: AuthContext,
    request_timeout: Duration,
}

impl CodeGenerator {
    pub fn new(backend: Arc<dyn WalletBackend>, auth: AuthContext, request_timeout: Duration) -> Self {
        Self {
            backend,
            auth,
            request_timeout,
        }
    }

    pub async fn generate(&self) -> Result<TransactionCode, DepositError> {
        let request = self.backend.issue_wallet_code(&self.auth);
        let code = tokio::time::timeout(self.request_timeout, request)
            .await
            .map_err(|_| BackendError::Timeout)??;
        Ok(code)
    }

    /// On success the user is sent to the confirmation screen for the new
    /// code; on failure they stay put with an error notice.
    pub async fn begin(&self, ui: &dyn FlowUi) -> Result<TransactionCode, DepositError> {
        match self.generate().await {
            Ok(code) => {
                info!(code = %code, "wallet transaction code issued");
                ui.navigate(Route::Confirmation(code.clone()));
                Ok(code)
            }
            Err(error) => {
                warn!(error = %error, "wallet transaction code unavailable");
                ui.notify(Notice::error(CODE_UNAVAILABLE_MESSAGE));
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeGenerator, DepositError, CODE_UNAVAILABLE_MESSAGE};
    use crate::ui::{Notice, RecordingUi, Route, UiCall};
    use depositflow_backend::{AuthContext, BackendError, ScriptedWalletBackend};
    use depositflow_contract::TransactionCode;
    use std::sync::Arc;
    use std::time::Duration;

    fn generator(backend: ScriptedWalletBackend) -> CodeGenerator {
        CodeGenerator::new(
            Arc::new(backend),
            AuthContext::bearer("token"),
            Duration::from_secs(10),
        )
    }

    #[tokio::test]
    async fn issued_code_opens_confirmation_screen() {
        let code = TransactionCode::parse("ABC123").expect("code");
        let ui = RecordingUi::new();

        let issued = generator(ScriptedWalletBackend::new().with_code(code.clone()))
            .begin(&ui)
            .await
            .expect("code");

        assert_eq!(issued, code);
        assert_eq!(ui.calls(), vec![UiCall::Navigate(Route::Confirmation(code))]);
    }

    #[tokio::test]
    async fn missing_code_stays_on_entry_with_error() {
        let ui = RecordingUi::new();

        let err = generator(ScriptedWalletBackend::new().with_code_error(BackendError::MissingCode))
            .begin(&ui)
            .await
            .unwrap_err();

        assert!(matches!(err, DepositError::Backend(BackendError::MissingCode)));
        assert_eq!(
            ui.calls(),
            vec![UiCall::Notify(Notice::error(CODE_UNAVAILABLE_MESSAGE))]
        );
    }

    #[tokio::test]
    async fn rejected_credentials_surface_as_errors() {
        let ui = RecordingUi::new();
        let generator = CodeGenerator::new(
            Arc::new(ScriptedWalletBackend::new().requiring_token("other")),
            AuthContext::bearer("token"),
            Duration::from_secs(10),
        );

        let err = generator.begin(&ui).await.unwrap_err();
        assert!(matches!(err, DepositError::Backend(BackendError::Unauthorized)));
        assert!(ui.navigations().is_empty());
    }
}
