use std::sync::Mutex;

use depositflow_contract::TransactionCode;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "screen", content = "code")]
pub enum Route {
    DepositEntry,
    Wallet,
    Confirmation(TransactionCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Presentation side of the flow: notifications and screen changes.
pub trait FlowUi: Send + Sync {
    fn notify(&self, notice: Notice);

    fn navigate(&self, route: Route);

    fn offer_retry(&self, route: Route);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    Notify(Notice),
    Navigate(Route),
    OfferRetry(Route),
}

#[derive(Debug, Default)]
pub struct RecordingUi {
    calls: Mutex<Vec<UiCall>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<UiCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Notify(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> Vec<Route> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Navigate(route) => Some(route),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: UiCall) {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(call),
            Err(poisoned) => poisoned.into_inner().push(call),
        }
    }
}

impl FlowUi for RecordingUi {
    fn notify(&self, notice: Notice) {
        self.record(UiCall::Notify(notice));
    }

    fn navigate(&self, route: Route) {
        self.record(UiCall::Navigate(route));
    }

    fn offer_retry(&self, route: Route) {
        self.record(UiCall::OfferRetry(route));
    }
}
