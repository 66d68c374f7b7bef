//! Interception layer wiring the tracker and the rotation client into HTTP call primitives.
//!
//! [`RotationLayer`] owns the shared "detect 429 → resolve secret → rotate → retry once" protocol.
//! Two primitives consume it:
//!
//! - [`RotatingTransport`] wraps any [`HttpTransport`], typically the crate's
//!   [`ReqwestTransport`](crate::http::ReqwestTransport);
//! - `RotationMiddleware` (feature `middleware`) hooks the request/response surface of a
//!   `reqwest-middleware` client.
//!
//! Both issue the original call and the single retry through the wrapped implementation, never
//! through themselves, and both hand back the upstream response unchanged whenever rotation is not
//! possible.

#[cfg(feature = "middleware")] pub mod middleware;
pub mod transport;

#[cfg(feature = "middleware")] pub use middleware::*;
pub use transport::*;

// std
use std::time::Duration as StdDuration;
// crates.io
use reqwest::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	config::RotationConfig,
	http::HttpTransport,
	obs::{self, InterceptSpan, Primitive, RotationOutcome},
	rotation::{RotationClient, RotationHistory, SecretRotator, Singleflight},
	secret::SecretValue,
	tracker::{self, MatchKind, SecretTracker},
};

/// Request extension set by the outermost interceptor handling a call.
///
/// Interceptors that find it already present pass the call straight through, so stacking two
/// wrappers (or two middleware hooks) over one client still yields a single tracked call and at
/// most one retry.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Intercepted;

/// Shared state behind every interceptor built from one configuration.
///
/// Cloning is cheap: all state lives behind `Arc`, so clones observe the same tracker and history.
#[derive(Clone)]
pub struct RotationLayer {
	config: Arc<RotationConfig>,
	tracker: Arc<SecretTracker>,
	rotator: Arc<dyn SecretRotator>,
	history: Arc<RotationHistory>,
	settle_delay: StdDuration,
}
impl RotationLayer {
	/// Pause between a successful rotation and the retry.
	pub const DEFAULT_SETTLE_DELAY: StdDuration = StdDuration::from_secs(1);

	/// Builds a layer that rotates through a [`RotationClient`] for `config`.
	pub fn new(config: RotationConfig) -> Result<Self> {
		let client = RotationClient::new(config.clone())?;

		Ok(Self::with_rotator(config, Arc::new(client)))
	}

	/// Builds a layer around a caller-provided rotation source.
	pub fn with_rotator(config: RotationConfig, rotator: Arc<dyn SecretRotator>) -> Self {
		Self {
			config: Arc::new(config),
			tracker: Arc::new(SecretTracker::new()),
			rotator,
			history: Default::default(),
			settle_delay: Self::DEFAULT_SETTLE_DELAY,
		}
	}

	/// Replaces the association tracker.
	pub fn with_tracker(mut self, tracker: Arc<SecretTracker>) -> Self {
		self.tracker = tracker;

		self
	}

	/// Overrides the pause before a retry.
	pub fn with_settle_delay(mut self, delay: StdDuration) -> Self {
		self.settle_delay = delay;

		self
	}

	/// Retains at most `capacity` rotation attempts in [`RotationLayer::history`].
	pub fn with_history_capacity(mut self, capacity: usize) -> Self {
		self.history = Arc::new(RotationHistory::with_capacity(capacity));

		self
	}

	/// Coalesces concurrent rotations of the same secret into one service call.
	pub fn with_singleflight(mut self) -> Self {
		self.rotator = Arc::new(Singleflight::new(self.rotator));

		self
	}

	/// Resolved configuration.
	pub fn config(&self) -> &RotationConfig {
		&self.config
	}

	/// Association tracker shared by every interceptor of this layer.
	pub fn tracker(&self) -> &Arc<SecretTracker> {
		&self.tracker
	}

	/// Recent rotation attempts.
	pub fn history(&self) -> &Arc<RotationHistory> {
		&self.history
	}

	/// Wraps `original` and installs the wrapper.
	pub fn install_transport<T>(&self, original: Arc<T>) -> RotatingTransport<T>
	where
		T: ?Sized + HttpTransport,
	{
		let transport = RotatingTransport::new(self.clone(), original);

		transport.install();

		transport
	}

	/// Records the credential association for an outbound call.
	pub(crate) fn track(&self, url: &str, headers: &HeaderMap) -> Option<MatchKind> {
		let kind = self.tracker.track_request(url, headers);

		obs::debug_event!(self.config, trace, url, matched = ?kind, "Tracked outbound request.");

		kind
	}

	/// Accounts for a `429` that cannot be retried because no secret was associated up front.
	pub(crate) fn skip_unresolved(&self, primitive: Primitive, url: &str) {
		obs::debug_event!(self.config, warn, url, "Could not detect secret name for URL.");
		obs::record_outcome(primitive, RotationOutcome::RateLimited);
		obs::record_outcome(primitive, RotationOutcome::Unresolved);
	}

	/// Runs the rotation half of the protocol after `url` answered `429`.
	///
	/// Returns the credential to retry with, or `None` when the caller should hand back the
	/// original response. The settle delay has already elapsed when a value is returned.
	pub(crate) async fn replacement_for(
		&self,
		primitive: Primitive,
		url: &str,
	) -> Option<SecretValue> {
		let span = InterceptSpan::new(primitive, &tracker::normalized_host(url).unwrap_or_default());
		let recorder = span.clone();
		let tagger = span.clone();
		let settle = move |outcome| {
			recorder.record_outcome(outcome);
			obs::record_outcome(primitive, outcome);
		};

		span.instrument(async move {
			obs::record_outcome(primitive, RotationOutcome::RateLimited);

			let Some(secret_name) = self.tracker.secret_name(url) else {
				obs::debug_event!(self.config, warn, url, "Could not detect secret name for URL.");
				settle(RotationOutcome::Unresolved);

				return None;
			};

			tagger.record_secret(&secret_name);
			obs::debug_event!(self.config, info, secret = %secret_name, "Rate limit hit (429), triggering rotation.");

			let result = self.rotator.rotate(&secret_name).await;
			let credential = result.usable_value().cloned();

			self.history.record(secret_name.as_str(), credential.is_some());

			let Some(credential) = credential else {
				obs::debug_event!(
					self.config,
					warn,
					secret = %secret_name,
					message = ?result.message,
					"Rotation failed or returned no value, returning 429."
				);
				settle(RotationOutcome::Rejected);

				return None;
			};

			obs::debug_event!(self.config, info, secret = %secret_name, key = %credential.hint(), "Rotation successful, retrying with new key.");
			settle(RotationOutcome::Rotated);

			if !self.settle_delay.is_zero() {
				tokio::time::sleep(self.settle_delay).await;
			}

			Some(credential)
		})
		.await
	}
}
impl Debug for RotationLayer {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RotationLayer")
			.field("config", &self.config)
			.field("tracker", &self.tracker)
			.field("settle_delay", &self.settle_delay)
			.finish()
	}
}
