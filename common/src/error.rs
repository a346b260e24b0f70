use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("\"{0}\" is not a valid pathname")]
    IllegalName(String),
    #[error("\"{0}\" already exists")]
    NameExists(String),
    #[error("\"{0}\" does not exist")]
    NamespaceDoesNotExist(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal inconsistency: {0}")]
    InternalInconsistency(String),
    #[error("content span covers {expected} characters but stored text has {actual}")]
    ContentSpanMismatch { expected: usize, actual: usize },
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// True for errors the caller can fix by correcting the request.
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::IllegalName(_)
                | Self::NameExists(_)
                | Self::NamespaceDoesNotExist(_)
                | Self::NotFound(_)
                | Self::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_the_offending_pathname() {
        let err = AppError::NameExists("acme:kb1".into());
        assert_eq!(err.to_string(), "\"acme:kb1\" already exists");

        let err = AppError::NamespaceDoesNotExist("acme.sub".into());
        assert_eq!(err.to_string(), "\"acme.sub\" does not exist");

        let err = AppError::IllegalName("bad name".into());
        assert_eq!(err.to_string(), "\"bad name\" is not a valid pathname");
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(AppError::NameExists("a".into()).is_user_error());
        assert!(AppError::IllegalName("a".into()).is_user_error());
        assert!(!AppError::InternalInconsistency("broken".into()).is_user_error());
        assert!(!AppError::ContentSpanMismatch {
            expected: 4,
            actual: 2
        }
        .is_user_error());
    }
}
