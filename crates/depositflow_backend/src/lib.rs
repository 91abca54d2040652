pub mod backend;
pub mod http;
pub mod scripted;

pub use backend::{AuthContext, BackendError, PaymentCheck, WalletBackend};
pub use http::{HttpBackendConfig, HttpWalletBackend, DEFAULT_REQUEST_TIMEOUT};
pub use scripted::ScriptedWalletBackend;
