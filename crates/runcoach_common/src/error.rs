//! Error taxonomy for result ingestion.

use crate::llm_client::AnalysisError;

/// Storage engine unreachable or a transaction failed.
#[derive(Debug, thiserror::Error)]
#[error("{0:#}")]
pub struct PersistenceError(anyhow::Error);

impl From<anyhow::Error> for PersistenceError {
    fn from(e: anyhow::Error) -> Self {
        PersistenceError(e)
    }
}

/// Why a submission ended in the failed state.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Client-supplied data violates a precondition. Never retried.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Analysis unavailable: {0}")]
    AnalysisUnavailable(#[from] AnalysisError),
}

impl IngestError {
    pub fn invalid(message: impl Into<String>) -> Self {
        IngestError::InvalidInput(message.into())
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_displays_bare_message() {
        let err = IngestError::invalid("stageClearTimes must have 6 elements.");
        assert_eq!(err.to_string(), "stageClearTimes must have 6 elements.");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_persistence_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("disk I/O error").context("Failed to insert result row");
        let err = IngestError::from(PersistenceError::from(inner));
        let text = err.to_string();
        assert!(text.contains("Failed to insert result row"));
        assert!(text.contains("disk I/O error"));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_analysis_error_converts() {
        let err: IngestError = AnalysisError::EmptyResponse.into();
        assert!(matches!(err, IngestError::AnalysisUnavailable(_)));
    }
}
