use std::time::Duration;

use thiserror::Error;

use crate::qr::QrTemplate;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowConfig {
    pub session_max: Duration,
    pub countdown_interval: Duration,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub success_redirect_delay: Duration,
    pub expired_redirect_delay: Duration,
    pub bank_account: String,
    pub qr: QrTemplate,
}

impl FlowConfig {
    pub fn new(bank_account: impl Into<String>) -> Self {
        Self {
            bank_account: bank_account.into(),
            ..Self::default()
        }
    }

    /// Session window in whole seconds, rounded up like the countdown.
    pub fn session_max_seconds(&self) -> u64 {
        self.session_max.as_secs() + u64::from(self.session_max.subsec_nanos() > 0)
    }

    /// Redirect delays may be zero; every other timing drives a timer and may not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timings = [
            ("session_max", self.session_max),
            ("countdown_interval", self.countdown_interval),
            ("poll_interval", self.poll_interval),
            ("request_timeout", self.request_timeout),
        ];
        match timings.into_iter().find(|(_, value)| value.is_zero()) {
            Some((name, _)) => Err(ConfigError::ZeroDuration(name)),
            None => Ok(()),
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            session_max: Duration::from_secs(180),
            countdown_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            success_redirect_delay: Duration::from_secs(2),
            expired_redirect_delay: Duration::from_secs(3),
            bank_account: String::new(),
            qr: QrTemplate::default(),
        }
    }
}
