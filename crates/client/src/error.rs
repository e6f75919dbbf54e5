//! Client-side error taxonomy.

use std::fmt;

use tidemark_core::error::CoreError;

use crate::store::StoreError;

/// Machine-readable reason the backend gave for refusing an auth request.
///
/// Callers route on these: a taken nickname sends the user to login, a
/// legacy account without a password to set-password, and so on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectCode {
    NicknameTaken,
    NicknameNotFound,
    PasswordNotSet,
    PasswordAlreadySet,
    InvalidCredentials,
    /// A code this client does not know, preserved verbatim.
    Other(String),
}

impl RejectCode {
    pub fn from_code(code: &str) -> Self {
        match code {
            "NICKNAME_TAKEN" => Self::NicknameTaken,
            "NICKNAME_NOT_FOUND" => Self::NicknameNotFound,
            "PASSWORD_NOT_SET" => Self::PasswordNotSet,
            "PASSWORD_ALREADY_SET" => Self::PasswordAlreadySet,
            "INVALID_CREDENTIALS" => Self::InvalidCredentials,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NicknameTaken => "NICKNAME_TAKEN",
            Self::NicknameNotFound => "NICKNAME_NOT_FOUND",
            Self::PasswordNotSet => "PASSWORD_NOT_SET",
            Self::PasswordAlreadySet => "PASSWORD_ALREADY_SET",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the REST client, the sync engine and the session.
///
/// None of these are fatal: after a failed flush the pending buffer and its
/// backup are intact and the next trigger resends them.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Input rejected locally before any request was sent.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Missing credential, or the backend answered 401/403.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backend refused an auth request with a known reason.
    #[error("Rejected ({code}): {message}")]
    Rejected { code: RejectCode, message: String },

    /// Any other non-2xx response.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// The reject code, if this is a backend rejection.
    pub fn reject_code(&self) -> Option<&RejectCode> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
