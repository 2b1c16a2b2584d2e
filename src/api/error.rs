//! Collaborator error types

use std::fmt;

/// Errors reported by external collaborators (persistence, feeds, assets)
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Requested record does not exist
    NotFound {
        collaborator: String,
        resource: String,
    },
    /// Collaborator answered with an error status
    HttpError {
        collaborator: String,
        status: u16,
        message: String,
    },
    /// Network or timeout error
    NetworkError {
        collaborator: String,
        message: String,
    },
    /// Local storage failure (file store)
    StorageError {
        collaborator: String,
        message: String,
    },
    /// Collaborator missing a prerequisite (credentials, branding, ...)
    NotConfigured { collaborator: String },
}

impl ApiError {
    /// Get the collaborator name for this error
    pub fn collaborator_name(&self) -> &str {
        match self {
            ApiError::NotFound { collaborator, .. } => collaborator,
            ApiError::HttpError { collaborator, .. } => collaborator,
            ApiError::NetworkError { collaborator, .. } => collaborator,
            ApiError::StorageError { collaborator, .. } => collaborator,
            ApiError::NotConfigured { collaborator } => collaborator,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn not_found(collaborator: impl Into<String>, resource: impl Into<String>) -> Self {
        ApiError::NotFound {
            collaborator: collaborator.into(),
            resource: resource.into(),
        }
    }

    pub fn http(collaborator: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        ApiError::HttpError {
            collaborator: collaborator.into(),
            status,
            message: message.into(),
        }
    }

    pub fn network(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::NetworkError {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn storage(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::StorageError {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }

    pub fn not_configured(collaborator: impl Into<String>) -> Self {
        ApiError::NotConfigured {
            collaborator: collaborator.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound {
                collaborator,
                resource,
            } => write!(f, "{}: {} not found", collaborator, resource),
            ApiError::HttpError {
                collaborator,
                status,
                message,
            } => write!(f, "{}: HTTP {} - {}", collaborator, status, message),
            ApiError::NetworkError {
                collaborator,
                message,
            } => write!(f, "{}: Network error - {}", collaborator, message),
            ApiError::StorageError {
                collaborator,
                message,
            } => write!(f, "{}: Storage error - {}", collaborator, message),
            ApiError::NotConfigured { collaborator } => {
                write!(f, "{}: Not configured", collaborator)
            }
        }
    }
}

impl std::error::Error for ApiError {}
