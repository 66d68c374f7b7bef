//! Rotation service client.
//!
//! [`RotationClient`] speaks the service's two-endpoint protocol (`POST /rotate`, `GET /health`)
//! and folds every failure (disabled config, network errors, timeouts, rejected requests,
//! malformed bodies) into an unsuccessful [`RotationResult`]. The interceptors therefore never
//! handle errors on the hot path. They depend on the [`SecretRotator`] trait so hosts and tests can
//! substitute their own rotation source.

pub mod history;
pub mod singleflight;

pub use history::*;
pub use singleflight::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::header::{CONTENT_TYPE, HeaderValue};
// self
use crate::{_prelude::*, config::RotationConfig, error::ConfigError, obs, secret::SecretValue};

/// Boxed future returned by [`SecretRotator::rotate`].
pub type RotateFuture<'a> = Pin<Box<dyn Future<Output = RotationResult> + 'a + Send>>;

/// Source of replacement credentials.
pub trait SecretRotator
where
	Self: Send + Sync,
{
	/// Requests a fresh value for `secret_name`. Never fails: problems surface as an unsuccessful
	/// [`RotationResult`].
	fn rotate<'a>(&'a self, secret_name: &'a str) -> RotateFuture<'a>;
}

/// Key pool snapshot reported by the rotation service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
	/// Keys in the pool.
	pub total_keys: i64,
	/// Keys ready for use.
	pub available_keys: i64,
	/// Keys currently rate-limited or otherwise exhausted.
	pub exhausted_keys: i64,
	/// Index of the key now in use.
	pub current_index: i64,
}

/// Outcome of a single rotate call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationResult {
	/// Whether the service produced a replacement.
	pub success: bool,
	/// Replacement credential value.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub new_value: Option<SecretValue>,
	/// Pool snapshot after the rotation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pool_status: Option<PoolStatus>,
	/// Human-readable detail, mostly present on failures.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}
impl RotationResult {
	/// Builds an unsuccessful result carrying `message`.
	pub fn failure(message: impl Into<String>) -> Self {
		Self { success: false, new_value: None, pool_status: None, message: Some(message.into()) }
	}

	/// Builds a successful result carrying `value`.
	pub fn rotated(value: impl Into<SecretValue>) -> Self {
		Self { success: true, new_value: Some(value.into()), pool_status: None, message: None }
	}

	/// Attaches a pool snapshot.
	pub fn with_pool_status(mut self, status: PoolStatus) -> Self {
		self.pool_status = Some(status);

		self
	}

	/// Returns the replacement only when the result is usable for a retry.
	pub fn usable_value(&self) -> Option<&SecretValue> {
		if !self.success {
			return None;
		}

		self.new_value.as_ref().filter(|value| !value.is_empty())
	}
}

#[derive(Serialize)]
struct RotateRequest<'a> {
	secret_name: &'a str,
	env: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	service: Option<&'a str>,
}

/// Stateless client for the local rotation service.
#[derive(Clone, Debug)]
pub struct RotationClient {
	http: ReqwestClient,
	config: Arc<RotationConfig>,
	rotate_url: Url,
	health_url: Url,
}
impl RotationClient {
	/// Upper bound for a rotate call.
	pub const ROTATE_TIMEOUT: StdDuration = StdDuration::from_secs(10);
	/// Upper bound for a health probe.
	pub const HEALTH_TIMEOUT: StdDuration = StdDuration::from_secs(2);

	/// Builds a client with its own reqwest connection pool.
	pub fn new(config: RotationConfig) -> Result<Self> {
		let http = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Self::with_client(config, http)
	}

	/// Builds a client reusing the caller's reqwest client.
	///
	/// Pass a plain client here, never one that is itself wrapped by the rotation layer.
	pub fn with_client(config: RotationConfig, http: ReqwestClient) -> Result<Self> {
		let rotate_url = config.endpoint("rotate")?;
		let health_url = config.endpoint("health")?;

		Ok(Self { http, config: Arc::new(config), rotate_url, health_url })
	}

	/// Resolved configuration backing the client.
	pub fn config(&self) -> &RotationConfig {
		&self.config
	}

	/// Asks the service for a replacement value of `secret_name`.
	pub async fn rotate(&self, secret_name: &str) -> RotationResult {
		let config = self.config.as_ref();

		if !config.enabled {
			obs::debug_event!(config, info, secret = secret_name, "Rotation service disabled; skipping rotation.");

			return RotationResult::failure("service not available");
		}

		let payload = RotateRequest {
			secret_name,
			env: &config.environment,
			service: config.service_name.as_deref(),
		};
		let body = match serde_json::to_vec(&payload) {
			Ok(body) => body,
			Err(e) => return RotationResult::failure(format!("request could not be encoded: {e}")),
		};
		let sent = self
			.http
			.post(self.rotate_url.clone())
			.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
			.body(body)
			.timeout(Self::ROTATE_TIMEOUT)
			.send()
			.await;
		let response = match sent {
			Ok(response) => response,
			Err(e) => {
				obs::debug_event!(config, warn, secret = secret_name, error = %e, "Rotation service unreachable.");

				return RotationResult::failure(format!("service unreachable: {e}"));
			},
		};
		let status = response.status();

		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();

			obs::debug_event!(config, warn, secret = secret_name, status = status.as_u16(), body = %text, "Rotation service rejected the request.");

			return RotationResult::failure(format!("service returned {}: {text}", status.as_u16()));
		}

		let bytes = match response.bytes().await {
			Ok(bytes) => bytes,
			Err(e) => return RotationResult::failure(format!("service unreachable: {e}")),
		};
		let mut de = serde_json::Deserializer::from_slice(&bytes);
		let result: RotationResult = match serde_path_to_error::deserialize(&mut de) {
			Ok(result) => result,
			Err(e) => {
				obs::debug_event!(config, warn, secret = secret_name, error = %e, "Rotation service returned malformed JSON.");

				return RotationResult::failure(format!("service returned a malformed response: {e}"));
			},
		};

		obs::debug_event!(
			config,
			info,
			secret = secret_name,
			success = result.success,
			has_new_value = result.new_value.is_some(),
			pool_status = ?result.pool_status,
			"Rotation service responded."
		);

		result
	}

	/// Probes `GET /health`; any transport error or non-2xx status counts as unhealthy.
	pub async fn check_health(&self) -> bool {
		match self.http.get(self.health_url.clone()).timeout(Self::HEALTH_TIMEOUT).send().await {
			Ok(response) => response.status().is_success(),
			Err(_) => false,
		}
	}
}
impl SecretRotator for RotationClient {
	fn rotate<'a>(&'a self, secret_name: &'a str) -> RotateFuture<'a> {
		Box::pin(RotationClient::rotate(self, secret_name))
	}
}
