//! HTTP client for the optional remote kernel service.
//!
//! The service exposes two endpoints:
//!
//! - `GET  {endpoint}/health` -- any 2xx means the service is usable
//! - `POST {endpoint}/kernel` -- body `{"a": [...], "b": [...], "repetitions": r}`,
//!   response `{"value": f}` with `f` in `[0, 1]`
//!
//! Every request is bounded by the configured timeout via
//! [`tokio::time::timeout`]; a timeout is reported like any other failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RemoteConfig;
use crate::error::BackendError;

/// Request body for `POST /kernel`.
#[derive(Debug, Serialize)]
struct KernelRequest<'a> {
    a: &'a [f64],
    b: &'a [f64],
    repetitions: u32,
}

/// Response body for `POST /kernel`.
#[derive(Debug, Deserialize)]
struct KernelResponse {
    value: f64,
}

/// Client for a remote, hardware-backed kernel service.
#[derive(Debug)]
pub struct RemoteBackend {
    client: reqwest::Client,
    base_url: String,
    name: String,
    timeout: Duration,
    repetitions: u32,
}

impl RemoteBackend {
    /// Create a client. No network traffic happens here.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Client`] if the HTTP client cannot be built.
    pub fn new(config: &RemoteConfig, repetitions: u32) -> Result<Self, BackendError> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url().to_owned(),
            name: config.name.clone(),
            timeout,
            repetitions,
        })
    }

    /// Human-readable name for logging and `backend_info`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check that the service answers its health endpoint in time.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] on transport failure, timeout, or
    /// a non-2xx status.
    pub async fn probe(&self) -> Result<(), BackendError> {
        let url = format!("{}/health", self.base_url);
        let response = tokio::time::timeout(self.timeout, self.client.get(&url).send())
            .await
            .map_err(|elapsed| {
                BackendError::unavailable(&self.name, format!("health probe {elapsed}"))
            })?
            .map_err(|e| BackendError::unavailable(&self.name, format!("health probe failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::unavailable(
                &self.name,
                format!("health probe returned {status}"),
            ))
        }
    }

    /// Ask the service for `K(a, b)`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] on transport failure, timeout, a
    /// non-2xx status, an unparseable body, or a value outside `[0, 1]`.
    pub async fn kernel(&self, a: &[f64], b: &[f64]) -> Result<f64, BackendError> {
        let url = format!("{}/kernel", self.base_url);
        let body = KernelRequest {
            a,
            b,
            repetitions: self.repetitions,
        };

        let round_trip = async {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| format!("kernel request failed: {e}"))?;

            let status = response.status();
            if !status.is_success() {
                return Err(format!("kernel request returned {status}"));
            }

            response
                .json::<KernelResponse>()
                .await
                .map_err(|e| format!("kernel response parse failed: {e}"))
        };

        let parsed = tokio::time::timeout(self.timeout, round_trip)
            .await
            .map_err(|elapsed| {
                BackendError::unavailable(&self.name, format!("kernel request {elapsed}"))
            })?
            .map_err(|reason| BackendError::unavailable(&self.name, reason))?;

        validate_value(&self.name, parsed.value)
    }
}

fn validate_value(name: &str, value: f64) -> Result<f64, BackendError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(BackendError::unavailable(
            name,
            format!("kernel value {value} outside [0, 1]"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_expected_shape() {
        let body = KernelRequest {
            a: &[0.1, 0.2],
            b: &[0.3, 0.4],
            repetitions: 2,
        };
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["repetitions"], serde_json::json!(2));
        assert_eq!(json["a"], serde_json::json!([0.1, 0.2]));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(validate_value("r", 0.5).is_ok());
        assert!(validate_value("r", 1.5).is_err());
        assert!(validate_value("r", -0.1).is_err());
        assert!(validate_value("r", f64::NAN).is_err());
    }

    #[test]
    fn client_builds_without_network() {
        let config = RemoteConfig::new("http://127.0.0.1:1");
        let backend = RemoteBackend::new(&config, 2);
        assert!(backend.is_ok());
        if let Ok(backend) = backend {
            assert_eq!(backend.name(), "remote");
        }
    }
}
