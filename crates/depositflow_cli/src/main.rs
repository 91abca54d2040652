use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use depositflow_backend::{
    AuthContext, HttpBackendConfig, HttpWalletBackend, PaymentCheck, ScriptedWalletBackend,
    WalletBackend,
};
use depositflow_contract::PaymentState;
use depositflow_core::{
    build_qr_url, CodeGenerator, ConfirmationSession, FlowConfig, PaymentStatus, QrTemplate,
    SessionHandle, SessionUpdate,
};
use depositflow_sandbox::{SandboxConfig, SandboxState};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};

mod terminal;

use terminal::TerminalUi;

const ACCESS_TOKEN_ENV: &str = "DEPOSITFLOW_ACCESS_TOKEN";

#[derive(Debug, Parser)]
#[command(author, version, about = "Bank-transfer wallet deposit confirmation client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Request a new transaction code and wait for the transfer to land.
    Deposit {
        #[arg(long, default_value = "config/depositflow.toml")]
        config: PathBuf,
        /// Replay a canned backend instead of calling the wallet service.
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Wait for a transfer tagged with an existing transaction code.
    Watch {
        #[arg(long, default_value = "config/depositflow.toml")]
        config: PathBuf,
        #[arg(long)]
        code: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the payment QR URL for a transaction code.
    Qr {
        #[arg(long, default_value = "config/depositflow.toml")]
        config: PathBuf,
        #[arg(long)]
        code: String,
    },
    /// Run a local stand-in for the wallet service.
    Sandbox {
        #[arg(long, default_value = "127.0.0.1:8088")]
        bind: String,
        #[arg(long)]
        auth_token: Option<String>,
        #[arg(long, default_value_t = 0)]
        reveal_after_secs: u64,
        #[arg(long)]
        auto_settle_after_secs: Option<u64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct RuntimeConfig {
    backend: BackendSection,
    bank: BankSection,
    #[serde(default)]
    session: SessionSection,
}

#[derive(Debug, Clone, Deserialize)]
struct BackendSection {
    base_url: String,
    access_token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct BankSection {
    account_number: String,
    bank: Option<String>,
    memo_prefix: Option<String>,
    qr_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SessionSection {
    max_seconds: u64,
    poll_interval_secs: u64,
    success_redirect_delay_secs: u64,
    expired_redirect_delay_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = FlowConfig::default();
        Self {
            max_seconds: defaults.session_max.as_secs(),
            poll_interval_secs: defaults.poll_interval.as_secs(),
            success_redirect_delay_secs: defaults.success_redirect_delay.as_secs(),
            expired_redirect_delay_secs: defaults.expired_redirect_delay.as_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    FlowConfig::default().request_timeout.as_secs()
}

impl RuntimeConfig {
    fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&source).with_context(|| format!("invalid config TOML at {}", path.display()))
    }

    fn parse(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config
            .flow_config()
            .validate()
            .context("unusable [session] or [backend] timings")?;
        Ok(config)
    }

    fn flow_config(&self) -> FlowConfig {
        let defaults = QrTemplate::default();
        FlowConfig {
            session_max: Duration::from_secs(self.session.max_seconds),
            poll_interval: Duration::from_secs(self.session.poll_interval_secs),
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
            success_redirect_delay: Duration::from_secs(self.session.success_redirect_delay_secs),
            expired_redirect_delay: Duration::from_secs(self.session.expired_redirect_delay_secs),
            bank_account: self.bank.account_number.clone(),
            qr: QrTemplate {
                base_url: self.bank.qr_base_url.clone().unwrap_or(defaults.base_url),
                bank: self.bank.bank.clone().unwrap_or(defaults.bank),
                memo_prefix: self.bank.memo_prefix.clone().unwrap_or(defaults.memo_prefix),
            },
            ..FlowConfig::default()
        }
    }

    fn auth_context(&self) -> AuthContext {
        AuthContext {
            access_token: std::env::var(ACCESS_TOKEN_ENV)
                .ok()
                .or_else(|| self.backend.access_token.clone()),
        }
    }

    fn http_backend(&self) -> Result<HttpWalletBackend> {
        HttpWalletBackend::new(&HttpBackendConfig {
            base_url: self.backend.base_url.clone(),
            request_timeout: Duration::from_secs(self.backend.request_timeout_secs),
        })
        .context("failed to build wallet backend client")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Deposit {
            config,
            dry_run,
            json,
        } => deposit(config, dry_run, json).await,
        Command::Watch { config, code, json } => watch(config, code, json).await,
        Command::Qr { config, code } => qr(config, &code),
        Command::Sandbox {
            bind,
            auth_token,
            reveal_after_secs,
            auto_settle_after_secs,
        } => {
            sandbox(
                bind,
                SandboxConfig {
                    auth_token,
                    reveal_after: Duration::from_secs(reveal_after_secs),
                    auto_settle_after: auto_settle_after_secs.map(Duration::from_secs),
                    ..SandboxConfig::default()
                },
            )
            .await
        }
    }
}

async fn deposit(config_path: PathBuf, dry_run: bool, json: bool) -> Result<()> {
    let config = RuntimeConfig::load(&config_path)?;
    let flow = config.flow_config();
    let auth = config.auth_context();
    let backend: Arc<dyn WalletBackend> = if dry_run {
        warn!("dry run: using a canned wallet backend");
        Arc::new(rehearsal_backend())
    } else {
        Arc::new(config.http_backend()?)
    };

    let ui = Arc::new(TerminalUi::default());
    let code = CodeGenerator::new(backend.clone(), auth.clone(), flow.request_timeout)
        .begin(ui.as_ref())
        .await?;

    let handle = ConfirmationSession::mount(Some(code.as_str()), &flow, backend, auth, ui)?;
    follow(handle, json).await
}

async fn watch(config_path: PathBuf, code: String, json: bool) -> Result<()> {
    let config = RuntimeConfig::load(&config_path)?;
    let flow = config.flow_config();
    let backend: Arc<dyn WalletBackend> = Arc::new(config.http_backend()?);

    let handle = ConfirmationSession::mount(
        Some(&code),
        &flow,
        backend,
        config.auth_context(),
        Arc::new(TerminalUi::default()),
    )?;
    follow(handle, json).await
}

fn qr(config_path: PathBuf, code: &str) -> Result<()> {
    let config = RuntimeConfig::load(&config_path)?;
    let flow = config.flow_config();
    let url = build_qr_url(&flow.qr, &flow.bank_account, code)?;
    println!("{url}");
    Ok(())
}

async fn sandbox(bind: String, config: SandboxConfig) -> Result<()> {
    let socket: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid socket address {bind}"))?;
    let listener = tokio::net::TcpListener::bind(socket)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    if config.auth_token.is_none() {
        warn!("sandbox running without bearer auth");
    }

    depositflow_sandbox::serve(listener, SandboxState::new(config), async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
    })
    .await
}

async fn follow(handle: SessionHandle, json: bool) -> Result<()> {
    println!("Scan to pay: {}", handle.qr_url());
    println!("Transfer memo must include code {}", handle.code());

    let mut updates = handle.updates();
    let mut last_shown: Option<SessionUpdate> = None;
    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(update) => {
                    if should_show(last_shown, update) {
                        println!("{}", render_update(update));
                        last_shown = Some(update);
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, closing payment session");
                handle.cancel();
            }
        }
    }

    let report = handle.join().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    match report.status {
        PaymentStatus::Success => Ok(()),
        PaymentStatus::Pending if report.cancelled => {
            info!(code = %report.code, "payment session closed before settlement");
            Ok(())
        }
        PaymentStatus::Pending => Err(anyhow!("payment session ended while still pending")),
        PaymentStatus::Failed => Err(anyhow!("payment {} failed", report.code)),
        PaymentStatus::Expired => Err(anyhow!(
            "payment window for {} expired without confirmation",
            report.code
        )),
    }
}

fn should_show(last: Option<SessionUpdate>, update: SessionUpdate) -> bool {
    match last {
        None => true,
        Some(last) if last.status != update.status => true,
        Some(last) => {
            last.remaining_seconds != update.remaining_seconds
                && (update.remaining_seconds % 15 == 0 || update.remaining_seconds <= 10)
        }
    }
}

fn render_update(update: SessionUpdate) -> String {
    let minutes = update.remaining_seconds / 60;
    let seconds = update.remaining_seconds % 60;
    let label = match update.status {
        PaymentStatus::Pending => "waiting for transfer",
        PaymentStatus::Success => "payment received",
        PaymentStatus::Failed => "payment failed",
        PaymentStatus::Expired => "payment window expired",
    };
    format!("[{minutes:02}:{seconds:02}] {label}")
}

fn rehearsal_backend() -> ScriptedWalletBackend {
    ScriptedWalletBackend::new().with_checks([
        Ok(PaymentCheck::NotFound),
        Ok(PaymentCheck::Found(PaymentState::Pending)),
        Ok(PaymentCheck::Found(PaymentState::Confirmed)),
    ])
}

#[cfg(test)]
mod tests {
    use super::{render_update, should_show, RuntimeConfig};
    use depositflow_core::{PaymentStatus, SessionUpdate};
    use std::time::Duration;

    const SAMPLE: &str = r#"
        [backend]
        base_url = "https://api.example.com/api/wallet"
        access_token = "token"

        [bank]
        account_number = "1029118580"
        memo_prefix = "TOPUP"

        [session]
        max_seconds = 120
    "#;

    fn pending(remaining_seconds: u64) -> SessionUpdate {
        SessionUpdate {
            status: PaymentStatus::Pending,
            remaining_seconds,
        }
    }

    #[test]
    fn config_fills_defaults() {
        let config = RuntimeConfig::parse(SAMPLE).expect("config");
        let flow = config.flow_config();

        assert_eq!(flow.session_max, Duration::from_secs(120));
        assert_eq!(flow.poll_interval, Duration::from_secs(5));
        assert_eq!(flow.request_timeout, Duration::from_secs(10));
        assert_eq!(flow.qr.memo_prefix, "TOPUP");
        assert_eq!(flow.qr.bank, "Vietcombank");
        assert_eq!(flow.bank_account, "1029118580");
    }

    #[test]
    fn zero_session_window_is_rejected() {
        let source = SAMPLE.replace("max_seconds = 120", "max_seconds = 0");
        assert!(RuntimeConfig::parse(&source).is_err());
    }

    #[test]
    fn zero_request_timeout_is_rejected() {
        let source = SAMPLE.replace(
            "access_token = \"token\"",
            "access_token = \"token\"\nrequest_timeout_secs = 0",
        );
        let err = RuntimeConfig::parse(&source).expect_err("zero timeout");
        assert!(format!("{err:#}").contains("request_timeout"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let source = SAMPLE.replace("max_seconds = 120", "max_seconds = 120\npoll_interval_secs = 0");
        assert!(RuntimeConfig::parse(&source).is_err());
    }

    #[test]
    fn countdown_lines_are_throttled() {
        assert!(should_show(None, pending(180)));
        assert!(!should_show(Some(pending(180)), pending(179)));
        assert!(should_show(Some(pending(179)), pending(165)));
        assert!(should_show(Some(pending(11)), pending(10)));
        assert!(should_show(
            Some(pending(100)),
            SessionUpdate {
                status: PaymentStatus::Success,
                remaining_seconds: 100,
            }
        ));
    }

    #[test]
    fn renders_minutes_and_seconds() {
        assert_eq!(render_update(pending(125)), "[02:05] waiting for transfer");
    }
}
