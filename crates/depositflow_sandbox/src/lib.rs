pub mod app;
pub mod ledger;

pub use app::{build_router, serve, SandboxState};
pub use ledger::{LedgerEntry, PaymentLedger, SandboxConfig};
