pub mod code;
pub mod wallet;

pub use code::{CodeError, TransactionCode};
pub use wallet::{
    PaymentCheckResponse, PaymentState, SandboxPaymentUpdate, WalletCodeResponse,
};
