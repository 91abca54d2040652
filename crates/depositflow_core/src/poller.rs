use std::sync::Arc;
use std::time::Duration;

use depositflow_backend::{AuthContext, PaymentCheck, WalletBackend};
use depositflow_contract::{PaymentState, TransactionCode};
use serde::Serialize;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    Success,
    Failed,
    Pending,
    /// The backend has no record of the code yet; keep polling.
    NotFoundYet,
    /// Transport error or timeout; keep polling.
    Unavailable,
}

#[derive(Clone)]
pub struct PaymentPoller {
    backend: Arc<dyn WalletBackend>,
    auth: AuthContext,
    code: TransactionCode,
    interval: Duration,
    request_timeout: Duration,
}

impl PaymentPoller {
    pub fn new(
        backend: Arc<dyn WalletBackend>,
        auth: AuthContext,
        code: TransactionCode,
        interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            auth,
            code,
            interval,
            request_timeout,
        }
    }

    pub fn code(&self) -> &TransactionCode {
        &self.code
    }

    /// Ticks immediately, then once per poll interval. A tick that lands while
    /// a check is still running is pushed back rather than bunched up.
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    pub async fn check(&self) -> PollOutcome {
        let request = self.backend.check_payment(&self.auth, &self.code);
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(PaymentCheck::Found(PaymentState::Confirmed))) => PollOutcome::Success,
            Ok(Ok(PaymentCheck::Found(PaymentState::Failed))) => PollOutcome::Failed,
            Ok(Ok(PaymentCheck::Found(PaymentState::Pending))) => PollOutcome::Pending,
            Ok(Ok(PaymentCheck::NotFound)) => {
                debug!(code = %self.code, "transaction not registered yet");
                PollOutcome::NotFoundYet
            }
            Ok(Err(error)) => {
                warn!(code = %self.code, error = %error, "payment check failed, will retry");
                PollOutcome::Unavailable
            }
            Err(_) => {
                warn!(
                    code = %self.code,
                    timeout_ms = self.request_timeout.as_millis() as u64,
                    "payment check timed out, will retry"
                );
                PollOutcome::Unavailable
            }
        }
    }
}
