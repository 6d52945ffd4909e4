//! Kernel execution backends for Exuvia.
//!
//! The engine always talks to a [`BackendSelector`]. Without a remote
//! endpoint it answers from the in-process simulator. With one, the first
//! kernel request probes the service's health endpoint; if that succeeds
//! the remote service is used for the selector's lifetime, with per-call
//! fallback to the simulator.

pub mod config;
pub mod error;
pub mod remote;
pub mod selector;

pub use config::{DEFAULT_REMOTE_TIMEOUT_MS, RemoteConfig};
pub use error::BackendError;
pub use remote::RemoteBackend;
pub use selector::{Backend, BackendSelector, LOCAL_BACKEND_NAME, LocalBackend};
