use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use depositflow_contract::{
    PaymentCheckResponse, PaymentState, SandboxPaymentUpdate, TransactionCode, WalletCodeResponse,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::ledger::{LedgerEntry, PaymentLedger, SandboxConfig};

type ApiError = (StatusCode, Json<Value>);

#[derive(Clone)]
pub struct SandboxState {
    pub config: Arc<SandboxConfig>,
    pub ledger: Arc<RwLock<PaymentLedger>>,
}

impl SandboxState {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config: Arc::new(config),
            ledger: Arc::new(RwLock::new(PaymentLedger::default())),
        }
    }

    pub async fn settle(&self, code: &TransactionCode, state: PaymentState) -> Option<LedgerEntry> {
        self.ledger.write().await.settle(code, state)
    }
}

pub fn build_router(state: SandboxState) -> Router {
    Router::new()
        .route("/health/live", get(health_live))
        .route("/get-wallet-code", post(issue_wallet_code))
        .route("/check-payment/{code}", get(check_payment))
        .route("/sandbox/payments", get(list_payments))
        .route("/sandbox/payments/{code}", post(settle_payment))
        .with_state(state)
}

pub async fn serve(
    listener: TcpListener,
    state: SandboxState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let local = listener.local_addr().context("sandbox listener has no address")?;
    info!(bind = %local, "deposit sandbox listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("sandbox server failed")
}

async fn health_live() -> impl IntoResponse {
    Json(json!({
        "status": "live",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn issue_wallet_code(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;

    let code = state.ledger.write().await.issue(&state.config.code_prefix);
    Ok((
        StatusCode::OK,
        Json(WalletCodeResponse {
            wallet_code: Some(code.into_inner()),
        }),
    ))
}

async fn check_payment(
    State(state): State<SandboxState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;

    let code = TransactionCode::parse(&code).map_err(|_| not_found())?;
    let observed = state.ledger.write().await.observe(&code, &state.config);
    match observed {
        Some(payment) => Ok((
            StatusCode::OK,
            Json(PaymentCheckResponse::from_state(payment)),
        )),
        None => Err(not_found()),
    }
}

async fn list_payments(State(state): State<SandboxState>) -> impl IntoResponse {
    let items = state.ledger.read().await.entries();
    Json(json!({ "payments": items }))
}

async fn settle_payment(
    State(state): State<SandboxState>,
    Path(code): Path<String>,
    Json(payload): Json<SandboxPaymentUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let target = parse_state(&payload.status).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_status", "detail": payload.status })),
        )
    })?;
    let code = TransactionCode::parse(&code).map_err(|_| not_found())?;

    match state.settle(&code, target).await {
        Some(entry) => Ok((StatusCode::OK, Json(entry))),
        None => Err(not_found()),
    }
}

fn parse_state(raw: &str) -> Option<PaymentState> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "success" | "confirmed" => Some(PaymentState::Confirmed),
        "failed" => Some(PaymentState::Failed),
        "pending" => Some(PaymentState::Pending),
        _ => None,
    }
}

fn authorize(state: &SandboxState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(token) = state.config.auth_token.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if provided == format!("Bearer {token}") {
        Ok(())
    } else {
        warn!("sandbox request rejected: bad bearer token");
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_or_missing_bearer_token"})),
        ))
    }
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error":"transaction_not_found"})),
    )
}

#[cfg(test)]
mod tests {
    use super::parse_state;
    use depositflow_contract::PaymentState;

    #[test]
    fn settlement_status_parsing() {
        assert_eq!(parse_state("SUCCESS"), Some(PaymentState::Confirmed));
        assert_eq!(parse_state(" failed "), Some(PaymentState::Failed));
        assert_eq!(parse_state("pending"), Some(PaymentState::Pending));
        assert_eq!(parse_state("refunded"), None);
    }
}
