use std::time::Duration;

use async_trait::async_trait;
use depositflow_contract::{PaymentCheckResponse, TransactionCode, WalletCodeResponse};
use http::StatusCode;
use reqwest::RequestBuilder;
use tracing::debug;
use url::Url;

use crate::backend::{AuthContext, BackendError, PaymentCheck, WalletBackend};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl HttpBackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpWalletBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpWalletBackend {
    pub fn new(config: &HttpBackendConfig) -> Result<Self, BackendError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| BackendError::InvalidConfig(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidConfig(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::InvalidConfig(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidConfig("base URL has no path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(request: RequestBuilder, auth: &AuthContext) -> RequestBuilder {
        match auth.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl WalletBackend for HttpWalletBackend {
    async fn issue_wallet_code(&self, auth: &AuthContext) -> Result<TransactionCode, BackendError> {
        let url = self.endpoint(&["get-wallet-code"])?;
        debug!(url = %url, "requesting wallet code");

        let response = Self::authorize(self.client.post(url), auth)
            .send()
            .await
            .map_err(transport_error)?;
        reject_status(response.status())?;

        let body: WalletCodeResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        body.transaction_code()
            .map_err(|_| BackendError::MissingCode)
    }

    async fn check_payment(
        &self,
        auth: &AuthContext,
        code: &TransactionCode,
    ) -> Result<PaymentCheck, BackendError> {
        let url = self.endpoint(&["check-payment", code.as_str()])?;

        let response = Self::authorize(self.client.get(url), auth)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PaymentCheck::NotFound);
        }
        reject_status(response.status())?;

        let body: PaymentCheckResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        Ok(PaymentCheck::Found(body.classify()))
    }
}

fn reject_status(status: StatusCode) -> Result<(), BackendError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Unauthorized),
        s if s.is_success() => Ok(()),
        s => Err(BackendError::Status(s)),
    }
}

fn transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout
    } else {
        BackendError::Transport(error.to_string())
    }
}
