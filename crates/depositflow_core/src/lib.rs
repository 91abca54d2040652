pub mod config;
pub mod countdown;
pub mod deposit;
pub mod machine;
pub mod poller;
pub mod qr;
pub mod session;
pub mod ui;

pub use config::{ConfigError, FlowConfig};
pub use countdown::{Countdown, CountdownTick};
pub use deposit::{CodeGenerator, DepositError};
pub use machine::{ConfirmationMachine, Effect, FlowEvent, PaymentStatus};
pub use poller::{PaymentPoller, PollOutcome};
pub use qr::{build_qr_url, QrError, QrTemplate};
pub use session::{
    ConfirmationSession, SessionError, SessionHandle, SessionReport, SessionUpdate, SetupError,
};
pub use ui::{FlowUi, Notice, NoticeLevel, RecordingUi, Route, UiCall};
