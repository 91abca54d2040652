use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use depositflow_backend::{
    AuthContext, BackendError, HttpBackendConfig, HttpWalletBackend, PaymentCheck, WalletBackend,
};
use depositflow_contract::{PaymentState, TransactionCode};
use depositflow_core::{
    CodeGenerator, ConfirmationSession, FlowConfig, PaymentStatus, RecordingUi, Route, UiCall,
};
use depositflow_sandbox::{build_router, SandboxConfig, SandboxState};

async fn spawn_sandbox(config: SandboxConfig) -> (SocketAddr, SandboxState) {
    let state = SandboxState::new(config);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    (addr, state)
}

fn http_backend(addr: SocketAddr) -> HttpWalletBackend {
    HttpWalletBackend::new(&HttpBackendConfig {
        base_url: format!("http://{addr}/"),
        request_timeout: Duration::from_secs(2),
    })
    .expect("backend")
}

fn secured() -> SandboxConfig {
    SandboxConfig {
        auth_token: Some("secret".to_string()),
        ..SandboxConfig::default()
    }
}

#[tokio::test]
async fn issues_codes_and_reports_status() {
    let (addr, state) = spawn_sandbox(secured()).await;
    let backend = http_backend(addr);
    let auth = AuthContext::bearer("secret");

    let code = backend.issue_wallet_code(&auth).await.expect("code");
    assert!(code.as_str().starts_with("DP"));

    assert_eq!(
        backend.check_payment(&auth, &code).await,
        Ok(PaymentCheck::Found(PaymentState::Pending))
    );

    state
        .settle(&code, PaymentState::Failed)
        .await
        .expect("settled");
    assert_eq!(
        backend.check_payment(&auth, &code).await,
        Ok(PaymentCheck::Found(PaymentState::Failed))
    );
}

#[tokio::test]
async fn unknown_codes_are_not_found_rather_than_errors() {
    let (addr, _state) = spawn_sandbox(SandboxConfig::default()).await;
    let backend = http_backend(addr);
    let code = TransactionCode::parse("NEVER-ISSUED").expect("code");

    assert_eq!(
        backend.check_payment(&AuthContext::anonymous(), &code).await,
        Ok(PaymentCheck::NotFound)
    );
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let (addr, _state) = spawn_sandbox(secured()).await;
    let backend = http_backend(addr);

    let err = backend
        .issue_wallet_code(&AuthContext::bearer("guess"))
        .await
        .unwrap_err();
    assert_eq!(err, BackendError::Unauthorized);
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = http_backend(addr)
        .issue_wallet_code(&AuthContext::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_) | BackendError::Timeout));
}

#[tokio::test]
async fn deposit_flow_confirms_against_live_sandbox() {
    let (addr, _state) = spawn_sandbox(SandboxConfig {
        reveal_after: Duration::from_millis(120),
        auto_settle_after: Some(Duration::from_millis(300)),
        ..secured()
    })
    .await;
    let backend: Arc<dyn WalletBackend> = Arc::new(http_backend(addr));
    let auth = AuthContext::bearer("secret");
    let ui = Arc::new(RecordingUi::new());

    let config = FlowConfig {
        session_max: Duration::from_secs(10),
        countdown_interval: Duration::from_millis(50),
        poll_interval: Duration::from_millis(50),
        request_timeout: Duration::from_secs(2),
        success_redirect_delay: Duration::from_millis(20),
        ..FlowConfig::new("1029118580")
    };

    let code = CodeGenerator::new(backend.clone(), auth.clone(), config.request_timeout)
        .begin(ui.as_ref())
        .await
        .expect("code");

    let handle = ConfirmationSession::mount(
        Some(code.as_str()),
        &config,
        backend,
        auth,
        ui.clone(),
    )
    .expect("mount");
    let report = handle.join().await.expect("join");

    assert_eq!(report.status, PaymentStatus::Success);
    assert!(report.checks_started >= 2);
    assert_eq!(
        ui.navigations(),
        vec![Route::Confirmation(code), Route::Wallet]
    );
    assert!(matches!(ui.calls()[1], UiCall::Notify(_)));
}
