use thiserror::Error;

use crate::session::SessionState;

/// Failures while turning raw model text into a [`crate::ModelCommand`].
///
/// These never escape the extractor; they travel alongside the fallback
/// command so the handler can describe what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("No valid JSON found")]
    NoJsonFound,
    #[error("JSON parse error: {0}")]
    MalformedJson(String),
    #[error("Missing required field \"{0}\"")]
    MissingRequiredField(&'static str),
    #[error("No response from model")]
    EmptyResponse,
}

/// A field that could not be normalized. Absorbed into a default by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not normalize {field} from {value:?}")]
pub struct NormalizationFailure {
    pub field: &'static str,
    pub value: String,
}

impl NormalizationFailure {
    pub(crate) fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Errors raised by [`crate::ModelSession`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Session is {found}, expected {expected}")]
    InvalidState {
        expected: SessionState,
        found: SessionState,
    },
    #[error("Completion failed: {0}")]
    Inference(String),
}

/// Errors reported by device-capability collaborators.
///
/// The `Display` text is what handlers surface to the user, so variants carry
/// the collaborator's own message where one exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    NoCompatibleApp(String),
    #[error("App \"{0}\" is not installed on this device.")]
    NotInstalled(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    PlatformUnsupported(String),
    #[error("{0}")]
    Failed(String),
}
