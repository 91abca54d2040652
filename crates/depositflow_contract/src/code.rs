use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("transaction code is missing")]
    Empty,
    #[error("transaction code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// One-time token identifying a single pending deposit attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionCode(String);

impl TransactionCode {
    pub fn parse(raw: &str) -> Result<Self, CodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CodeError::Empty);
        }

        if let Some(bad) = trimmed
            .chars()
            .find(|ch| ch.is_whitespace() || ch.is_control())
        {
            return Err(CodeError::InvalidCharacter(bad));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TransactionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransactionCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TransactionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TransactionCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeError, TransactionCode};

    #[test]
    fn parse_trims_surrounding_whitespace() {
        let code = TransactionCode::parse("  ABC123 \n").expect("parse");
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn parse_rejects_blank_input() {
        assert_eq!(TransactionCode::parse(""), Err(CodeError::Empty));
        assert_eq!(TransactionCode::parse("   "), Err(CodeError::Empty));
    }

    #[test]
    fn parse_rejects_inner_whitespace() {
        assert_eq!(
            TransactionCode::parse("ABC 123"),
            Err(CodeError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn deserialize_validates() {
        let code: TransactionCode = serde_json::from_str("\"DP42\"").expect("decode");
        assert_eq!(code.to_string(), "DP42");

        let err = serde_json::from_str::<TransactionCode>("\"\"").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
