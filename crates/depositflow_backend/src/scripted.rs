use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use depositflow_contract::{PaymentState, TransactionCode};
use tracing::debug;
use uuid::Uuid;

use crate::backend::{AuthContext, BackendError, PaymentCheck, WalletBackend};

type CheckResult = Result<PaymentCheck, BackendError>;

/// Backend double that replays queued answers. Once the check queue drains the
/// last answer keeps repeating; with nothing queued every check is `NotFound`.
#[derive(Debug, Default)]
pub struct ScriptedWalletBackend {
    state: Mutex<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    codes: VecDeque<Result<TransactionCode, BackendError>>,
    checks: VecDeque<CheckResult>,
    last_check: Option<CheckResult>,
    check_delay: Option<Duration>,
    require_token: Option<String>,
    codes_issued: usize,
    checks_served: usize,
}

impl ScriptedWalletBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(self, code: TransactionCode) -> Self {
        self.lock().codes.push_back(Ok(code));
        self
    }

    pub fn with_code_error(self, error: BackendError) -> Self {
        self.lock().codes.push_back(Err(error));
        self
    }

    pub fn with_checks<I>(self, checks: I) -> Self
    where
        I: IntoIterator<Item = CheckResult>,
    {
        self.lock().checks.extend(checks);
        self
    }

    pub fn with_states<I>(self, states: I) -> Self
    where
        I: IntoIterator<Item = PaymentState>,
    {
        self.with_checks(states.into_iter().map(|s| Ok(PaymentCheck::Found(s))))
    }

    pub fn with_check_delay(self, delay: Duration) -> Self {
        self.lock().check_delay = Some(delay);
        self
    }

    pub fn requiring_token(self, token: impl Into<String>) -> Self {
        self.lock().require_token = Some(token.into());
        self
    }

    pub fn codes_issued(&self) -> usize {
        self.lock().codes_issued
    }

    pub fn checks_served(&self) -> usize {
        self.lock().checks_served
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn authorize(&self, auth: &AuthContext) -> Result<(), BackendError> {
        match &self.lock().require_token {
            Some(expected) if auth.bearer_token() != Some(expected.as_str()) => {
                Err(BackendError::Unauthorized)
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl WalletBackend for ScriptedWalletBackend {
    async fn issue_wallet_code(&self, auth: &AuthContext) -> Result<TransactionCode, BackendError> {
        self.authorize(auth)?;

        let mut state = self.lock();
        state.codes_issued += 1;
        match state.codes.pop_front() {
            Some(queued) => queued,
            None => generated_code(),
        }
    }

    async fn check_payment(
        &self,
        auth: &AuthContext,
        code: &TransactionCode,
    ) -> Result<PaymentCheck, BackendError> {
        self.authorize(auth)?;

        let delay = self.lock().check_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.checks_served += 1;
        let answer = match state.checks.pop_front() {
            Some(next) => {
                state.last_check = Some(next.clone());
                next
            }
            None => state
                .last_check
                .clone()
                .unwrap_or(Ok(PaymentCheck::NotFound)),
        };
        debug!(code = %code, answer = ?answer, "scripted payment check");
        answer
    }
}

fn generated_code() -> Result<TransactionCode, BackendError> {
    let id = Uuid::now_v7().simple().to_string();
    let tail = &id[id.len() - 10..];
    TransactionCode::parse(&format!("DP{}", tail.to_ascii_uppercase()))
        .map_err(|_| BackendError::MissingCode)
}
