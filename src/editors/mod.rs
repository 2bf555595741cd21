//! A3 editors — state managers for module content.
//!
//! DESIGN
//! ======
//! Each editor owns one plain serde document and exposes synchronous
//! mutation methods that validate input and return `EditorError` on guard
//! failures. Editors never touch the stores; the module service applies
//! them while holding the entity lock. Editors do not interact with each
//! other.

pub mod five_why;
pub mod indicators;
pub mod ishikawa;
pub mod stats;
pub mod vsm;

use axum::http::StatusCode;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ErrorCode;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("item not found: {0}")]
    NotFound(Uuid),
    #[error("why chain cannot be deeper than {max} levels")]
    DepthExceeded { max: usize },
    #[error("category already exists: {0}")]
    DuplicateCategory(String),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: &'static str },
    #[error("an element cannot flow into itself")]
    SelfLoop,
    #[error("flow already exists from {from} to {to}")]
    DuplicateFlow { from: Uuid, to: Uuid },
    #[error("material flow contains a cycle")]
    FlowCycle,
}

impl ErrorCode for EditorError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Blank(_) => "E_BLANK",
            Self::NotFound(_) => "E_ITEM_NOT_FOUND",
            Self::DepthExceeded { .. } => "E_DEPTH_EXCEEDED",
            Self::DuplicateCategory(_) => "E_DUPLICATE_CATEGORY",
            Self::InvalidValue { .. } => "E_INVALID_VALUE",
            Self::SelfLoop => "E_SELF_LOOP",
            Self::DuplicateFlow { .. } => "E_DUPLICATE_FLOW",
            Self::FlowCycle => "E_FLOW_CYCLE",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::DuplicateCategory(_) | Self::DuplicateFlow { .. } => StatusCode::CONFLICT,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Trim `text` and reject it when nothing remains.
pub(crate) fn require_text(text: &str, field: &'static str) -> Result<String, EditorError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EditorError::Blank(field));
    }
    Ok(trimmed.to_owned())
}

/// Reject negative or non-finite numbers.
pub(crate) fn require_non_negative(value: f64, field: &'static str) -> Result<f64, EditorError> {
    if !value.is_finite() {
        return Err(EditorError::InvalidValue { field, reason: "must be a finite number" });
    }
    if value < 0.0 {
        return Err(EditorError::InvalidValue { field, reason: "must not be negative" });
    }
    Ok(value)
}

/// Deserialize a patch field where a missing key means "keep" and an
/// explicit `null` means "clear". Pair with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
