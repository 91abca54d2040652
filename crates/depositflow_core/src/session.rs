use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use depositflow_backend::{AuthContext, WalletBackend};
use depositflow_contract::{CodeError, TransactionCode};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval, Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ConfigError, FlowConfig};
use crate::countdown::{Countdown, CountdownTick};
use crate::machine::{ConfirmationMachine, Effect, FlowEvent, PaymentStatus};
use crate::poller::{PaymentPoller, PollOutcome};
use crate::qr::{build_qr_url, QrError};
use crate::ui::{FlowUi, Notice, Route};

pub const INVALID_CODE_MESSAGE: &str =
    "This deposit link has no valid transaction code. Please start a new deposit.";
pub const QR_UNAVAILABLE_MESSAGE: &str =
    "The payment QR code could not be prepared. Please start a new deposit.";
pub const SESSION_UNAVAILABLE_MESSAGE: &str =
    "Payment confirmation is misconfigured. Please start a new deposit.";

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid transaction code: {0}")]
    InvalidCode(#[from] CodeError),
    #[error("cannot build payment QR: {0}")]
    Qr(#[from] QrError),
    #[error("invalid session config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("payment session task failed: {0}")]
    Task(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionUpdate {
    pub status: PaymentStatus,
    pub remaining_seconds: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub code: TransactionCode,
    pub qr_url: String,
    pub status: PaymentStatus,
    pub remaining_seconds: u64,
    pub checks_started: u32,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

type InFlightCheck = BoxFuture<'static, PollOutcome>;

/// Timers and the outstanding status check of one session. `dispose` runs
/// once, whichever of settle, cancel or drop gets there first.
struct Schedule {
    session_id: Uuid,
    countdown: Countdown,
    countdown_ticks: Interval,
    poll_ticks: Interval,
    in_flight: Option<InFlightCheck>,
    checks_started: u32,
    disposed: bool,
}

impl Schedule {
    fn start(config: &FlowConfig, poller: &PaymentPoller, session_id: Uuid) -> Self {
        let mut countdown_ticks = interval(config.countdown_interval);
        countdown_ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            session_id,
            countdown: Countdown::start(config.session_max, Instant::now()),
            countdown_ticks,
            poll_ticks: poller.ticker(),
            in_flight: None,
            checks_started: 0,
            disposed: false,
        }
    }

    fn launch_check(&mut self, poller: &PaymentPoller) {
        if self.in_flight.is_some() {
            debug!("previous payment check still running, skipping tick");
            return;
        }

        let poller = poller.clone();
        self.checks_started += 1;
        self.in_flight = Some(async move { poller.check().await }.boxed());
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.countdown.stop();
        let dropped_check = self.in_flight.take().is_some();
        debug!(
            session_id = %self.session_id,
            dropped_check,
            "payment session timers disposed"
        );
    }
}

impl Drop for Schedule {
    fn drop(&mut self) {
        self.dispose();
    }
}

enum Exit {
    Settled(Vec<Effect>),
    Cancelled,
}

pub struct ConfirmationSession {
    session_id: Uuid,
    config: FlowConfig,
    qr_url: String,
    machine: ConfirmationMachine,
    poller: PaymentPoller,
    ui: Arc<dyn FlowUi>,
    cancel_rx: watch::Receiver<bool>,
    updates_tx: watch::Sender<SessionUpdate>,
    started_at: DateTime<Utc>,
}

impl ConfirmationSession {
    /// Starts confirming `code` on the current Tokio runtime. A missing or
    /// malformed code never starts a session: the user is told and sent back
    /// to deposit entry.
    pub fn mount(
        code: Option<&str>,
        config: &FlowConfig,
        backend: Arc<dyn WalletBackend>,
        auth: AuthContext,
        ui: Arc<dyn FlowUi>,
    ) -> Result<SessionHandle, SetupError> {
        let (code, qr_url) = match prepare(code, config) {
            Ok(prepared) => prepared,
            Err(error) => {
                warn!(error = %error, "payment session not started");
                let message = match error {
                    SetupError::InvalidCode(_) => INVALID_CODE_MESSAGE,
                    SetupError::Qr(_) => QR_UNAVAILABLE_MESSAGE,
                    SetupError::InvalidConfig(_) => SESSION_UNAVAILABLE_MESSAGE,
                };
                ui.notify(Notice::error(message));
                ui.navigate(Route::DepositEntry);
                return Err(error);
            }
        };

        let session_id = Uuid::now_v7();
        let machine = ConfirmationMachine::new(
            code.clone(),
            config.session_max_seconds(),
            config.success_redirect_delay,
            config.expired_redirect_delay,
        );
        let poller = PaymentPoller::new(
            backend,
            auth,
            code.clone(),
            config.poll_interval,
            config.request_timeout,
        );

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (updates_tx, updates_rx) = watch::channel(SessionUpdate {
            status: machine.status(),
            remaining_seconds: machine.remaining_seconds(),
        });

        let session = Self {
            session_id,
            config: config.clone(),
            qr_url: qr_url.clone(),
            machine,
            poller,
            ui,
            cancel_rx,
            updates_tx,
            started_at: Utc::now(),
        };

        let span = info_span!("payment_session", session_id = %session_id, code = %code);
        let task = tokio::spawn(session.run().instrument(span));

        Ok(SessionHandle {
            session_id,
            code,
            qr_url,
            cancel_tx,
            updates: updates_rx,
            task,
        })
    }

    async fn run(mut self) -> SessionReport {
        info!(
            qr_url = %self.qr_url,
            max_seconds = self.config.session_max_seconds(),
            "payment session started"
        );

        let mut schedule = Schedule::start(&self.config, &self.poller, self.session_id);

        let exit = loop {
            let effects = tokio::select! {
                biased;

                _ = cancel_requested(&mut self.cancel_rx) => break Exit::Cancelled,
                outcome = next_outcome(&mut schedule.in_flight), if schedule.in_flight.is_some() => {
                    schedule.in_flight = None;
                    self.machine.apply(FlowEvent::Poll(outcome))
                }
                _ = schedule.countdown_ticks.tick() => {
                    match schedule.countdown.tick(Instant::now()) {
                        CountdownTick::Remaining(left) => self.machine.apply(FlowEvent::Countdown(left)),
                        CountdownTick::Expired => self.machine.apply(FlowEvent::TimerExpired),
                        CountdownTick::Stopped => Vec::new(),
                    }
                }
                _ = schedule.poll_ticks.tick() => {
                    schedule.launch_check(&self.poller);
                    Vec::new()
                }
            };

            self.publish();
            if self.machine.status().is_terminal() {
                break Exit::Settled(effects);
            }
        };

        let checks_started = schedule.checks_started;
        schedule.dispose();
        drop(schedule);

        let cancelled = match exit {
            Exit::Cancelled => {
                info!(status = ?self.machine.status(), "payment session unmounted");
                true
            }
            Exit::Settled(effects) => !self.perform(effects).await,
        };

        SessionReport {
            session_id: self.session_id,
            code: self.machine.code().clone(),
            qr_url: self.qr_url,
            status: self.machine.status(),
            remaining_seconds: self.machine.remaining_seconds(),
            checks_started,
            cancelled,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    /// Returns false when the session was unmounted before a delayed
    /// navigation could happen.
    async fn perform(&mut self, effects: Vec<Effect>) -> bool {
        for effect in effects {
            match effect {
                Effect::Notify(notice) => self.ui.notify(notice),
                Effect::OfferRetry(route) => self.ui.offer_retry(route),
                Effect::NavigateAfter { route, delay } => {
                    if !self.navigate_after(route, delay).await {
                        return false;
                    }
                }
            }
        }
        true
    }

    async fn navigate_after(&mut self, route: Route, delay: Duration) -> bool {
        tokio::select! {
            biased;

            _ = cancel_requested(&mut self.cancel_rx) => {
                info!(route = ?route, "session unmounted before redirect");
                false
            }
            _ = tokio::time::sleep(delay) => {
                self.ui.navigate(route);
                true
            }
        }
    }

    fn publish(&self) {
        self.updates_tx.send_replace(SessionUpdate {
            status: self.machine.status(),
            remaining_seconds: self.machine.remaining_seconds(),
        });
    }
}

fn prepare(code: Option<&str>, config: &FlowConfig) -> Result<(TransactionCode, String), SetupError> {
    config.validate()?;
    let code = TransactionCode::parse(code.unwrap_or_default())?;
    let qr_url = build_qr_url(&config.qr, &config.bank_account, code.as_str())?;
    Ok((code, qr_url))
}

async fn cancel_requested(cancel_rx: &mut watch::Receiver<bool>) {
    // A dropped sender means the handle is gone, which counts as unmount.
    let _ = cancel_rx.wait_for(|cancelled| *cancelled).await;
}

async fn next_outcome(in_flight: &mut Option<InFlightCheck>) -> PollOutcome {
    match in_flight {
        Some(check) => check.await,
        None => std::future::pending().await,
    }
}

/// Owner side of a mounted session. Dropping the handle drops `cancel_tx`,
/// which the session treats as unmount.
pub struct SessionHandle {
    session_id: Uuid,
    code: TransactionCode,
    qr_url: String,
    cancel_tx: watch::Sender<bool>,
    updates: watch::Receiver<SessionUpdate>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    pub fn code(&self) -> &TransactionCode {
        &self.code
    }

    pub fn qr_url(&self) -> &str {
        &self.qr_url
    }

    pub fn snapshot(&self) -> SessionUpdate {
        *self.updates.borrow()
    }

    /// Latest state first, then every change until the session finishes.
    pub fn updates(&self) -> WatchStream<SessionUpdate> {
        WatchStream::new(self.updates.clone())
    }

    pub fn cancel(&self) {
        if !self.cancel_tx.send_replace(true) {
            debug!(session_id = %self.session_id, "payment session cancel requested");
        }
    }

    pub async fn join(self) -> Result<SessionReport, SessionError> {
        Ok(self.task.await?)
    }
}
