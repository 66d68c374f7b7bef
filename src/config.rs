//! Resolved configuration consumed by the rotation layer.
//!
//! How the values are discovered (environment probing, service identity detection, config files)
//! is the host application's business; the layer only consumes the resolved value. The struct
//! deserializes from both `snake_case` and `camelCase` keys so it can be embedded in existing
//! configuration files.

// self
use crate::_prelude::*;

/// Rotation service address used when none is configured.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:9123";
/// Environment label used when none is configured.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Resolved settings for the rotation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
	/// When `false`, rotation requests short-circuit without touching the network.
	pub enabled: bool,
	/// Base URL of the local rotation service.
	#[serde(alias = "serviceUrl")]
	pub service_url: String,
	/// Environment label forwarded as `env` in rotation requests.
	pub environment: String,
	/// Optional service identity forwarded as `service` in rotation requests.
	#[serde(alias = "serviceName")]
	pub service_name: Option<String>,
	/// Emits diagnostic events for every interception decision.
	pub debug: bool,
}
impl RotationConfig {
	/// Overrides the enabled flag.
	pub fn with_enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;

		self
	}

	/// Overrides the rotation service base URL.
	pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
		self.service_url = url.into();

		self
	}

	/// Overrides the environment label.
	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = environment.into();

		self
	}

	/// Sets the service identity.
	pub fn with_service_name(mut self, service: impl Into<String>) -> Self {
		self.service_name = Some(service.into());

		self
	}

	/// Overrides the debug flag.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;

		self
	}

	/// Resolves `path` against the service base URL.
	///
	/// Trailing slashes on the base are ignored so `http://host:9123/` and `http://host:9123`
	/// produce the same endpoints.
	pub fn endpoint(&self, path: &str) -> Result<Url, crate::error::ConfigError> {
		let base = self.service_url.trim_end_matches('/');
		let raw = format!("{base}/{}", path.trim_start_matches('/'));

		Url::parse(&raw).map_err(|source| crate::error::ConfigError::InvalidServiceUrl {
			url: self.service_url.clone(),
			source,
		})
	}
}
impl Default for RotationConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			service_url: DEFAULT_SERVICE_URL.into(),
			environment: DEFAULT_ENVIRONMENT.into(),
			service_name: None,
			debug: false,
		}
	}
}
