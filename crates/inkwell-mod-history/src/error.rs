/// Error taxonomy for the history engine.
use crate::codec::PatchMismatchError;

/// Result alias used across the history crate.
pub type Result<T, E = HistoryError> = std::result::Result<T, E>;

/// Errors surfaced by the version log, the reconstructor and the service.
///
/// Lookup failures are recoverable and map to "not found" responses.
/// Corruption failures mean an invariant of the stored log was broken; they
/// are never retried or repaired.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("version {timestamp} not found for document {doc_id}")]
    VersionNotFound { doc_id: String, timestamp: u64 },

    #[error("document {0} has no history")]
    DocumentNotFound(String),

    #[error("invalid document id {0:?}: must be non-empty and must not contain '#'")]
    InvalidDocumentId(String),

    #[error("timestamp {attempted} is not after latest version {latest} of document {doc_id}")]
    OutOfOrderTimestamp {
        doc_id: String,
        attempted: u64,
        latest: u64,
    },

    #[error("history of document {doc_id} is corrupted at version {timestamp}")]
    HistoryCorrupted {
        doc_id: String,
        timestamp: u64,
        #[source]
        source: PatchMismatchError,
    },

    #[error("no snapshot at or before version {timestamp} of document {doc_id}")]
    NoAnchorSnapshot { doc_id: String, timestamp: u64 },

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl HistoryError {
    /// Whether the caller asked for something that doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::VersionNotFound { .. } | Self::DocumentNotFound(_)
        )
    }

    /// Whether the stored log violates one of its invariants.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::HistoryCorrupted { .. } | Self::NoAnchorSnapshot { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = HistoryError::VersionNotFound {
            doc_id: "post".to_string(),
            timestamp: 7,
        };
        assert!(err.is_not_found());
        assert!(!err.is_corruption());
        assert_eq!(err.to_string(), "version 7 not found for document post");

        assert!(HistoryError::DocumentNotFound("post".to_string()).is_not_found());
    }

    #[test]
    fn test_corruption_classification() {
        let err = HistoryError::HistoryCorrupted {
            doc_id: "post".to_string(),
            timestamp: 3,
            source: PatchMismatchError::BaseChecksum,
        };
        assert!(err.is_corruption());
        assert!(!err.is_not_found());
        assert!(std::error::Error::source(&err).is_some());

        let err = HistoryError::NoAnchorSnapshot {
            doc_id: "post".to_string(),
            timestamp: 3,
        };
        assert!(err.is_corruption());
    }

    #[test]
    fn test_invalid_document_id_is_neither() {
        let err = HistoryError::InvalidDocumentId("a#b".to_string());
        assert!(!err.is_not_found());
        assert!(!err.is_corruption());
        assert!(err.to_string().contains("\"a#b\""));
    }

    #[test]
    fn test_storage_error_from_anyhow() {
        let err: HistoryError = anyhow::anyhow!("disk full").into();
        assert!(!err.is_not_found());
        assert!(!err.is_corruption());
        assert!(err.to_string().contains("disk full"));
    }
}
