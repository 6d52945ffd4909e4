//! Error types for the exuvia-backend crate.
//!
//! A [`BackendError`] never reaches callers of the selector: every remote
//! failure is logged and answered by the local backend instead.

/// Failures of the remote kernel path.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The remote service could not be reached, timed out, or answered badly.
    #[error("backend {backend} unavailable: {reason}")]
    Unavailable {
        /// Name of the backend that failed.
        backend: String,
        /// Description of the failure.
        reason: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying reqwest error.
        #[from]
        source: reqwest::Error,
    },
}

impl BackendError {
    pub(crate) fn unavailable(backend: &str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            backend: backend.to_owned(),
            reason: reason.into(),
        }
    }
}
