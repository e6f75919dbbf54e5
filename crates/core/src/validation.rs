//! Nickname and password rules applied before any auth request is sent.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

pub const NICKNAME_MIN_CHARS: usize = 2;
pub const NICKNAME_MAX_CHARS: usize = 20;
pub const PASSWORD_MIN_CHARS: usize = 8;
/// Upper bound imposed by the backend's password hash input limit.
pub const PASSWORD_MAX_CHARS: usize = 72;

/// Hangul syllables, ASCII letters, digits and underscore.
static NICKNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[가-힣a-zA-Z0-9_]+$").expect("valid regex"));

/// Validate a nickname for registration or password setup.
///
/// Returns the trimmed nickname on success.
pub fn validate_nickname(nickname: &str) -> Result<String, CoreError> {
    let nickname = nickname.trim();
    let len = nickname.chars().count();
    if len < NICKNAME_MIN_CHARS {
        return Err(CoreError::Validation(format!(
            "Nickname must be at least {NICKNAME_MIN_CHARS} characters long"
        )));
    }
    if len > NICKNAME_MAX_CHARS {
        return Err(CoreError::Validation(format!(
            "Nickname must be at most {NICKNAME_MAX_CHARS} characters long"
        )));
    }
    if !NICKNAME_RE.is_match(nickname) {
        return Err(CoreError::Validation(
            "Nickname may only contain Hangul, letters, digits and underscores".into(),
        ));
    }
    Ok(nickname.to_string())
}

/// Validate a nickname for the legacy nickname-only identity, which only
/// ever enforced the minimum length.
pub fn validate_legacy_nickname(nickname: &str) -> Result<String, CoreError> {
    let nickname = nickname.trim();
    if nickname.chars().count() < NICKNAME_MIN_CHARS {
        return Err(CoreError::Validation(format!(
            "Nickname must be at least {NICKNAME_MIN_CHARS} characters long"
        )));
    }
    Ok(nickname.to_string())
}

/// Validate password strength: length bounds plus at least one letter and
/// one digit.
pub fn validate_password(password: &str) -> Result<(), CoreError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_CHARS {
        return Err(CoreError::Validation(format!(
            "Password must be at least {PASSWORD_MIN_CHARS} characters long"
        )));
    }
    if len > PASSWORD_MAX_CHARS {
        return Err(CoreError::Validation(format!(
            "Password must be at most {PASSWORD_MAX_CHARS} characters long"
        )));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return Err(CoreError::Validation(
            "Password must contain both letters and digits".into(),
        ));
    }
    Ok(())
}

/// Full check for register and set-password flows.
pub fn validate_new_credentials(
    nickname: &str,
    password: &str,
    confirmation: &str,
) -> Result<String, CoreError> {
    let nickname = validate_nickname(nickname)?;
    validate_password(password)?;
    if password != confirmation {
        return Err(CoreError::Validation("Passwords do not match".into()));
    }
    Ok(nickname)
}

/// Login only requires both fields to be present; the backend decides the rest.
pub fn validate_login(nickname: &str, password: &str) -> Result<String, CoreError> {
    let nickname = nickname.trim();
    if nickname.is_empty() || password.is_empty() {
        return Err(CoreError::Validation(
            "Nickname and password are required".into(),
        ));
    }
    Ok(nickname.to_string())
}
