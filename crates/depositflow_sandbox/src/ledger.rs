use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use depositflow_contract::{PaymentState, TransactionCode};
use serde::Serialize;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub auth_token: Option<String>,
    /// How long a freshly issued code stays invisible to `check-payment`.
    pub reveal_after: Duration,
    pub auto_settle_after: Option<Duration>,
    pub code_prefix: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            reveal_after: Duration::ZERO,
            auto_settle_after: None,
            code_prefix: "DP".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub code: TransactionCode,
    pub state: PaymentState,
    pub issued_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    issued: Instant,
}

#[derive(Debug, Default)]
pub struct PaymentLedger {
    entries: HashMap<TransactionCode, LedgerEntry>,
}

impl PaymentLedger {
    pub fn issue(&mut self, prefix: &str) -> TransactionCode {
        loop {
            let id = Uuid::now_v7().simple().to_string();
            let raw = format!("{}{}", prefix, id[id.len() - 10..].to_ascii_uppercase());
            let Ok(code) = TransactionCode::parse(&raw) else {
                continue;
            };
            if self.entries.contains_key(&code) {
                continue;
            }

            self.entries.insert(
                code.clone(),
                LedgerEntry {
                    code: code.clone(),
                    state: PaymentState::Pending,
                    issued_at: Utc::now(),
                    settled_at: None,
                    issued: Instant::now(),
                },
            );
            info!(code = %code, "sandbox wallet code issued");
            return code;
        }
    }

    /// Current state as the status endpoint reports it; `None` while the code
    /// is unknown or not yet revealed.
    pub fn observe(&mut self, code: &TransactionCode, config: &SandboxConfig) -> Option<PaymentState> {
        let entry = self.entries.get_mut(code)?;
        let age = entry.issued.elapsed();
        if age < config.reveal_after {
            return None;
        }

        if entry.state == PaymentState::Pending {
            if let Some(after) = config.auto_settle_after {
                if age >= after {
                    entry.state = PaymentState::Confirmed;
                    entry.settled_at = Some(Utc::now());
                    info!(code = %code, "sandbox payment auto-settled");
                }
            }
        }
        Some(entry.state)
    }

    pub fn settle(&mut self, code: &TransactionCode, state: PaymentState) -> Option<LedgerEntry> {
        let entry = self.entries.get_mut(code)?;
        entry.state = state;
        entry.settled_at = match state {
            PaymentState::Pending => None,
            _ => Some(Utc::now()),
        };
        info!(code = %code, state = ?state, "sandbox payment settled");
        Some(entry.clone())
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        let mut items: Vec<LedgerEntry> = self.entries.values().cloned().collect();
        items.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::{PaymentLedger, SandboxConfig};
    use depositflow_contract::{PaymentState, TransactionCode};
    use std::time::Duration;

    #[test]
    fn issued_codes_are_unique_and_prefixed() {
        let mut ledger = PaymentLedger::default();
        let first = ledger.issue("DP");
        let second = ledger.issue("DP");

        assert_ne!(first, second);
        assert!(first.as_str().starts_with("DP"));
        assert_eq!(ledger.entries().len(), 2);
    }

    #[test]
    fn unknown_codes_are_not_observed() {
        let mut ledger = PaymentLedger::default();
        let code = TransactionCode::parse("NOPE").expect("code");
        assert_eq!(ledger.observe(&code, &SandboxConfig::default()), None);
        assert!(ledger.settle(&code, PaymentState::Failed).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn codes_reveal_then_auto_settle() {
        let config = SandboxConfig {
            reveal_after: Duration::from_secs(2),
            auto_settle_after: Some(Duration::from_secs(6)),
            ..SandboxConfig::default()
        };
        let mut ledger = PaymentLedger::default();
        let code = ledger.issue(&config.code_prefix);

        assert_eq!(ledger.observe(&code, &config), None);
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(ledger.observe(&code, &config), Some(PaymentState::Pending));
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(ledger.observe(&code, &config), Some(PaymentState::Confirmed));
    }

    #[test]
    fn manual_settlement_wins_over_auto_settle() {
        let config = SandboxConfig {
            auto_settle_after: Some(Duration::ZERO),
            ..SandboxConfig::default()
        };
        let mut ledger = PaymentLedger::default();
        let code = ledger.issue("DP");

        let entry = ledger.settle(&code, PaymentState::Failed).expect("entry");
        assert!(entry.settled_at.is_some());
        assert_eq!(ledger.observe(&code, &config), Some(PaymentState::Failed));
    }
}
