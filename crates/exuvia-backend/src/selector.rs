//! Backend dispatch and lazy selection.
//!
//! [`Backend`] is an enum over the two execution paths; [`BackendSelector`]
//! resolves which one is active on first use and keeps that decision for
//! its lifetime. The remote path is never fatal: any failure is logged and
//! the same pair is recomputed by the local simulator.

use std::sync::Arc;

use exuvia_kernel::{KernelError, KernelEstimator};
use exuvia_types::{BackendInfo, BackendKind};
use tokio::sync::OnceCell;

use crate::config::RemoteConfig;
use crate::remote::RemoteBackend;

/// Name reported for the in-process simulator.
pub const LOCAL_BACKEND_NAME: &str = "local-statevector";

/// In-process state-vector simulator backed by a shared [`KernelEstimator`].
#[derive(Debug, Clone)]
pub struct LocalBackend {
    estimator: Arc<KernelEstimator>,
}

impl LocalBackend {
    /// Wrap a shared estimator.
    pub const fn new(estimator: Arc<KernelEstimator>) -> Self {
        Self { estimator }
    }

    /// Compute `K(a, b)` through the memoizing estimator.
    ///
    /// # Errors
    ///
    /// Propagates [`KernelError`] for oversized, mismatched, or non-finite input.
    pub fn kernel(&self, a: &[f64], b: &[f64]) -> Result<f64, KernelError> {
        self.estimator.kernel(a, b)
    }
}

/// The active kernel backend.
#[derive(Debug)]
pub enum Backend {
    /// Local simulation only.
    Local(LocalBackend),
    /// Remote service with local fallback on per-call failure.
    Remote {
        /// HTTP client for the remote service.
        client: RemoteBackend,
        /// Simulator used whenever a remote call fails.
        fallback: LocalBackend,
    },
}

impl Backend {
    /// Which kind of backend this is.
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Local(_) => BackendKind::Local,
            Self::Remote { .. } => BackendKind::Remote,
        }
    }

    /// Human-readable name for logging.
    pub fn name(&self) -> &str {
        match self {
            Self::Local(_) => LOCAL_BACKEND_NAME,
            Self::Remote { client, .. } => client.name(),
        }
    }

    /// Compute `K(a, b)` on this backend.
    ///
    /// Input is validated before any network traffic so that malformed
    /// features fail identically on both paths.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError`] only for invalid input. Remote failures are
    /// absorbed by the local fallback.
    pub async fn execute_kernel(&self, a: &[f64], b: &[f64]) -> Result<f64, KernelError> {
        match self {
            Self::Local(local) => local.kernel(a, b),
            Self::Remote { client, fallback } => {
                fallback.estimator.validate_pair(a, b)?;
                match client.kernel(a, b).await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        tracing::warn!(
                            backend = client.name(),
                            error = %e,
                            "Remote kernel call failed, falling back to local simulation"
                        );
                        fallback.kernel(a, b)
                    }
                }
            }
        }
    }
}

/// Lazily resolves and holds the active [`Backend`].
///
/// The first caller of [`get_backend`](Self::get_backend) runs the health
/// probe (if a remote endpoint is configured); concurrent first callers wait
/// on that single probe and observe the same result.
#[derive(Debug)]
pub struct BackendSelector {
    estimator: Arc<KernelEstimator>,
    remote: Option<RemoteConfig>,
    resolved: OnceCell<Backend>,
}

impl BackendSelector {
    /// Create a selector. No probing happens until first use.
    pub fn new(estimator: Arc<KernelEstimator>, remote: Option<RemoteConfig>) -> Self {
        Self {
            estimator,
            remote,
            resolved: OnceCell::new(),
        }
    }

    /// A selector that always uses the local simulator.
    pub fn local(estimator: Arc<KernelEstimator>) -> Self {
        Self::new(estimator, None)
    }

    /// The shared estimator used by the local path.
    pub const fn estimator(&self) -> &Arc<KernelEstimator> {
        &self.estimator
    }

    /// Resolve the active backend, probing the remote service on first call.
    pub async fn get_backend(&self) -> &Backend {
        self.resolved.get_or_init(|| self.resolve()).await
    }

    /// Compute `K(a, b)` on the active backend.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError`] for invalid input.
    pub async fn execute_kernel(&self, a: &[f64], b: &[f64]) -> Result<f64, KernelError> {
        self.get_backend().await.execute_kernel(a, b).await
    }

    /// Report the active backend, resolving it if needed.
    pub async fn backend_info(&self) -> BackendInfo {
        let backend = self.get_backend().await;
        BackendInfo {
            active: backend.kind(),
            name: backend.name().to_owned(),
        }
    }

    async fn resolve(&self) -> Backend {
        let local = LocalBackend::new(Arc::clone(&self.estimator));
        let Some(config) = &self.remote else {
            tracing::info!(backend = LOCAL_BACKEND_NAME, "No remote endpoint configured");
            return Backend::Local(local);
        };

        let client = match RemoteBackend::new(config, self.estimator.encoder().repetitions()) {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Remote client setup failed, using local simulation");
                return Backend::Local(local);
            }
        };

        match client.probe().await {
            Ok(()) => {
                tracing::info!(
                    backend = client.name(),
                    endpoint = config.base_url(),
                    "Remote kernel backend selected"
                );
                Backend::Remote {
                    client,
                    fallback: local,
                }
            }
            Err(e) => {
                tracing::warn!(
                    endpoint = config.base_url(),
                    error = %e,
                    "Remote kernel backend unavailable, using local simulation"
                );
                Backend::Local(local)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]

    use super::*;

    #[tokio::test]
    async fn local_selector_reports_local() {
        let selector = BackendSelector::local(Arc::new(KernelEstimator::default()));
        let info = selector.backend_info().await;
        assert_eq!(info.active, BackendKind::Local);
        assert_eq!(info.name, LOCAL_BACKEND_NAME);
    }

    #[tokio::test]
    async fn local_self_kernel_is_one() {
        let selector = BackendSelector::local(Arc::new(KernelEstimator::default()));
        let value = selector.execute_kernel(&[0.3, 0.7], &[0.3, 0.7]).await.unwrap();
        assert_eq!(value, 1.0);
    }

    #[tokio::test]
    async fn local_rejects_oversized_input() {
        let selector = BackendSelector::local(Arc::new(KernelEstimator::default()));
        let big = vec![0.1; 11];
        let result = selector.execute_kernel(&big, &big).await;
        assert!(matches!(result, Err(KernelError::InputTooLarge { .. })));
    }
}
