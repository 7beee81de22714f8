//! Error taxonomy shared by every engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SocialError {
    /// Malformed identifier or missing required content. Raised before any
    /// store access.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// The requester is not the owner of the resource being mutated.
    #[error("{0}")]
    PermissionDenied(String),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl SocialError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Turns any error into `Internal`, keeping it as the cause of `context`.
    /// Used where a failure can only mean the store is broken, such as a row
    /// missing right after its insert.
    pub(crate) fn into_internal(self, context: &'static str) -> Self {
        let err = match self {
            Self::Internal(err) => err,
            other => anyhow::Error::new(other),
        };
        Self::Internal(err.context(context))
    }
}

impl From<rusqlite::Error> for SocialError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Internal(anyhow::Error::new(err).context("database query failed"))
    }
}

pub type SocialResult<T> = Result<T, SocialError>;

/// Rejects content that is empty once surrounding whitespace is removed.
pub(crate) fn require_content(content: &str, message: &str) -> SocialResult<()> {
    if content.trim().is_empty() {
        return Err(SocialError::invalid(message));
    }
    Ok(())
}
