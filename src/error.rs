//! Error taxonomy for gateway calls.
//!
//! Every call into a backend (real or mocked) resolves to exactly one
//! [`ApiError`] variant before any UI-facing state is updated; raw transport
//! errors never cross this boundary. `Forbidden` is the one variant that is
//! not recoverable in place and must navigate away instead of rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single rejected field in a create/update payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Field-level rejection; recoverable inline by fixing the fields.
    #[error("validation failed: {} field(s) rejected", violations.len())]
    ValidationFailed { violations: Vec<FieldViolation> },

    /// Missing capability. Never rendered inline; the caller redirects.
    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// Transport or server failure. Rendered with a retry affordance.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The export has not reached a downloadable state.
    #[error("export is not ready for download")]
    NotReady,

    /// The download link is past its expiry.
    #[error("download link expired")]
    Expired,

    /// Malformed payload or response.
    #[error("invalid data: {0}")]
    Invalid(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Body shape the backend uses for 422 responses.
#[derive(Debug, Deserialize)]
struct ViolationsBody {
    violations: Vec<FieldViolation>,
}

impl ApiError {
    /// Classify an HTTP response status (plus its body) into the taxonomy.
    ///
    /// `409` and `410` are the export contract's NotReady/Expired answers;
    /// everything unrecognized is `Unavailable` so the UI renders a retry.
    pub fn from_status(status: u16, body: &str) -> ApiError {
        match status {
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            409 => ApiError::NotReady,
            410 => ApiError::Expired,
            422 => match serde_json::from_str::<ViolationsBody>(body) {
                Ok(parsed) => ApiError::ValidationFailed {
                    violations: parsed.violations,
                },
                Err(_) => ApiError::Invalid(format!("unparseable validation response: {body}")),
            },
            _ => ApiError::Unavailable(format!("backend returned status {status}")),
        }
    }

    /// Whether the UI should offer an in-place retry for this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Unavailable(_) | ApiError::Invalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_covers_the_contract() {
        assert_eq!(ApiError::from_status(403, ""), ApiError::Forbidden);
        assert_eq!(ApiError::from_status(404, ""), ApiError::NotFound);
        assert_eq!(ApiError::from_status(409, ""), ApiError::NotReady);
        assert_eq!(ApiError::from_status(410, ""), ApiError::Expired);
        assert!(matches!(
            ApiError::from_status(500, ""),
            ApiError::Unavailable(_)
        ));
        assert!(matches!(
            ApiError::from_status(418, ""),
            ApiError::Unavailable(_)
        ));
    }

    #[test]
    fn validation_body_is_parsed_into_violations() {
        let body = r#"{"violations":[{"field":"email","message":"malformed"}]}"#;
        match ApiError::from_status(422, body) {
            ApiError::ValidationFailed { violations } => {
                assert_eq!(violations.len(), 1);
                assert_eq!(violations[0].field, "email");
            }
            other => panic!("expected ValidationFailed, got {other:?}"),
        }
    }

    #[test]
    fn garbage_validation_body_degrades_to_invalid() {
        assert!(matches!(
            ApiError::from_status(422, "not json"),
            ApiError::Invalid(_)
        ));
    }

    #[test]
    fn retryable_split_matches_ui_behavior() {
        assert!(ApiError::Unavailable("down".into()).is_retryable());
        assert!(!ApiError::Forbidden.is_retryable());
        assert!(!ApiError::NotReady.is_retryable());
    }
}
