use depositflow_core::{FlowUi, Notice, NoticeLevel, Route};
use tracing::info;

/// Prints what a browser would show as toasts and screen changes.
#[derive(Debug, Default)]
pub struct TerminalUi;

impl FlowUi for TerminalUi {
    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Error => "error",
        };
        println!("[{tag}] {}", notice.message);
    }

    fn navigate(&self, route: Route) {
        info!(route = ?route, "navigate");
        match route {
            Route::Wallet => println!("-> back to wallet"),
            Route::DepositEntry => println!("-> back to deposit entry"),
            Route::Confirmation(code) => println!("-> confirming transfer {code}"),
        }
    }

    fn offer_retry(&self, route: Route) {
        info!(route = ?route, "retry offered");
        println!("Run `depositflow deposit` to start a new deposit.");
    }
}
