use thiserror::Error;
use url::Url;

pub const DEFAULT_QR_BASE_URL: &str = "https://qr.sepay.vn/img";
pub const DEFAULT_BANK: &str = "Vietcombank";
pub const DEFAULT_MEMO_PREFIX: &str = "NAPTIEN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrError {
    #[error("bank account number is missing")]
    EmptyAccount,
    #[error("bank account number must contain digits only")]
    InvalidAccount,
    #[error("transaction code is missing")]
    EmptyCode,
    #[error("invalid QR service URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrTemplate {
    pub base_url: String,
    pub bank: String,
    pub memo_prefix: String,
}

impl Default for QrTemplate {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_QR_BASE_URL.to_string(),
            bank: DEFAULT_BANK.to_string(),
            memo_prefix: DEFAULT_MEMO_PREFIX.to_string(),
        }
    }
}

impl QrTemplate {
    /// Transfer memo the bank app pre-fills, `"<PREFIX> <code>"`.
    pub fn memo(&self, code: &str) -> String {
        let prefix = self.memo_prefix.trim();
        if prefix.is_empty() {
            code.to_string()
        } else {
            format!("{prefix} {code}")
        }
    }
}

pub fn build_qr_url(template: &QrTemplate, account: &str, code: &str) -> Result<String, QrError> {
    let account = account.trim();
    if account.is_empty() {
        return Err(QrError::EmptyAccount);
    }
    if !account.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(QrError::InvalidAccount);
    }

    let code = code.trim();
    if code.is_empty() {
        return Err(QrError::EmptyCode);
    }

    let memo = template.memo(code);
    let url = Url::parse_with_params(
        &template.base_url,
        [
            ("acc", account),
            ("bank", template.bank.as_str()),
            ("des", memo.as_str()),
        ],
    )
    .map_err(|e| QrError::InvalidBaseUrl {
        url: template.base_url.clone(),
        reason: e.to_string(),
    })?;

    Ok(url.into())
}
