//! Editor error taxonomy.
//!
//! Validation problems are not errors: they are computed state, see
//! [`crate::validation::ValidationResult`].

use thiserror::Error;

use crate::api::error::ApiError;
use crate::templates::schema::{StepId, StepType};

/// Errors returned by store, draft and navigation operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error("step '{0}' not found")]
    StepNotFound(StepId),

    #[error("feed '{0}' not found")]
    FeedNotFound(String),

    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    #[error("index {index} is out of bounds for {len} item(s)")]
    InvalidIndex { index: usize, len: usize },

    #[error("content for {found} cannot be stored on a {expected} step")]
    ContentMismatch { expected: StepType, found: StepType },

    #[error("field '{field}' does not exist on {step_type} steps")]
    FieldNotApplicable {
        field: &'static str,
        step_type: StepType,
    },

    #[error("no step draft is open")]
    NoDraftOpen,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("template settings are incomplete; fill the title first")]
    SettingsIncomplete,

    #[error("nothing is waiting for confirmation")]
    NoPendingAction,

    #[error("another action is waiting for confirmation")]
    ConfirmationPending,

    #[error("collaborator call failed: {0}")]
    Collaborator(String),

    #[error("failed to render trigger snippet: {0}")]
    Snippet(String),
}

impl EditorError {
    /// Wrap a collaborator failure outside of submission (loads, uploads, feeds)
    pub fn collaborator(err: ApiError) -> Self {
        EditorError::Collaborator(err.to_string())
    }
}

impl From<ApiError> for EditorError {
    fn from(err: ApiError) -> Self {
        EditorError::SubmissionFailed(err.to_string())
    }
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;
