use std::time::Duration;

use depositflow_contract::TransactionCode;
use serde::Serialize;
use tracing::{debug, info};

use crate::poller::PollOutcome;
use crate::ui::{Notice, Route};

pub const SUCCESS_MESSAGE: &str = "Payment received, your wallet has been topped up.";
pub const FAILED_MESSAGE: &str = "The payment failed. Please try the deposit again.";
pub const EXPIRED_MESSAGE: &str =
    "The payment window expired before a transfer was confirmed. Please start a new deposit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        self != PaymentStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    Countdown(u64),
    TimerExpired,
    Poll(PollOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify(Notice),
    NavigateAfter { route: Route, delay: Duration },
    OfferRetry(Route),
}

/// Sole owner of a session's status. Countdown and poll results arrive as
/// events; anything delivered after a terminal state is dropped.
#[derive(Debug, Clone)]
pub struct ConfirmationMachine {
    code: TransactionCode,
    status: PaymentStatus,
    remaining_seconds: u64,
    success_redirect_delay: Duration,
    expired_redirect_delay: Duration,
}

impl ConfirmationMachine {
    pub fn new(
        code: TransactionCode,
        session_max_seconds: u64,
        success_redirect_delay: Duration,
        expired_redirect_delay: Duration,
    ) -> Self {
        Self {
            code,
            status: PaymentStatus::Pending,
            remaining_seconds: session_max_seconds,
            success_redirect_delay,
            expired_redirect_delay,
        }
    }

    pub fn code(&self) -> &TransactionCode {
        &self.code
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn apply(&mut self, event: FlowEvent) -> Vec<Effect> {
        if self.status.is_terminal() {
            debug!(code = %self.code, status = ?self.status, event = ?event, "event after terminal state ignored");
            return Vec::new();
        }

        match event {
            FlowEvent::Countdown(0) | FlowEvent::TimerExpired => self.expire(),
            FlowEvent::Countdown(remaining) => {
                self.remaining_seconds = self.remaining_seconds.min(remaining);
                Vec::new()
            }
            FlowEvent::Poll(PollOutcome::Success) => self.enter(PaymentStatus::Success),
            FlowEvent::Poll(PollOutcome::Failed) => self.enter(PaymentStatus::Failed),
            FlowEvent::Poll(
                PollOutcome::Pending | PollOutcome::NotFoundYet | PollOutcome::Unavailable,
            ) => Vec::new(),
        }
    }

    fn expire(&mut self) -> Vec<Effect> {
        self.remaining_seconds = 0;
        self.enter(PaymentStatus::Expired)
    }

    fn enter(&mut self, status: PaymentStatus) -> Vec<Effect> {
        self.status = status;
        info!(
            code = %self.code,
            status = ?status,
            remaining_seconds = self.remaining_seconds,
            "payment session settled"
        );

        match status {
            PaymentStatus::Success => vec![
                Effect::Notify(Notice::success(SUCCESS_MESSAGE)),
                Effect::NavigateAfter {
                    route: Route::Wallet,
                    delay: self.success_redirect_delay,
                },
            ],
            PaymentStatus::Failed => vec![
                Effect::Notify(Notice::error(FAILED_MESSAGE)),
                Effect::OfferRetry(Route::DepositEntry),
            ],
            PaymentStatus::Expired => vec![
                Effect::Notify(Notice::error(EXPIRED_MESSAGE)),
                Effect::NavigateAfter {
                    route: Route::DepositEntry,
                    delay: self.expired_redirect_delay,
                },
            ],
            PaymentStatus::Pending => Vec::new(),
        }
    }
}
