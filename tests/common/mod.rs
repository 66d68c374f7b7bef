#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	io,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use reqwest::{
	StatusCode,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use birch_rotation::{
	RotationConfig, RotationLayer,
	env::StaticEnv,
	error::TransportError,
	http::{HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	rotation::{RotateFuture, RotationResult, SecretRotator},
	tracker::SecretTracker,
};

/// Request as observed by [`RecordingTransport`].
#[derive(Clone, Debug)]
pub struct SeenRequest {
	pub uri: String,
	pub authorization: Option<String>,
	pub body: Vec<u8>,
}

/// Fake transport answering with scripted statuses and recording every call.
///
/// A `None` step fails the call with a network error; an exhausted script answers `200`.
#[derive(Default)]
pub struct RecordingTransport {
	steps: Mutex<VecDeque<Option<u16>>>,
	seen: Mutex<Vec<SeenRequest>>,
}
impl RecordingTransport {
	pub fn scripted(statuses: impl IntoIterator<Item = u16>) -> Self {
		Self { steps: Mutex::new(statuses.into_iter().map(Some).collect()), seen: Mutex::default() }
	}

	/// Appends a step that fails at the network level.
	pub fn then_fail(self) -> Self {
		self.steps.lock().expect("Script lock should not be poisoned.").push_back(None);

		self
	}

	pub fn calls(&self) -> usize {
		self.seen.lock().expect("Recording lock should not be poisoned.").len()
	}

	pub fn seen(&self) -> Vec<SeenRequest> {
		self.seen.lock().expect("Recording lock should not be poisoned.").clone()
	}
}
impl HttpTransport for RecordingTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let authorization = request
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned);

		self.seen.lock().expect("Recording lock should not be poisoned.").push(SeenRequest {
			uri: request.uri().to_string(),
			authorization,
			body: request.body().clone(),
		});

		let step = self
			.steps
			.lock()
			.expect("Script lock should not be poisoned.")
			.pop_front()
			.unwrap_or(Some(200));

		Box::pin(async move {
			let Some(status) = step else {
				return Err(TransportError::network(io::Error::other("connection reset by peer")));
			};
			let mut response = HttpResponse::new(format!("status {status}").into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(status).expect("Scripted status should be valid.");

			Ok(response)
		})
	}
}

/// Fake rotation source returning a fixed result and recording requested secret names.
pub struct ScriptedRotator {
	result: RotationResult,
	calls: AtomicUsize,
	names: Mutex<Vec<String>>,
}
impl ScriptedRotator {
	pub fn new(result: RotationResult) -> Self {
		Self { result, calls: AtomicUsize::new(0), names: Mutex::default() }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn names(&self) -> Vec<String> {
		self.names.lock().expect("Rotator lock should not be poisoned.").clone()
	}
}
impl SecretRotator for ScriptedRotator {
	fn rotate<'a>(&'a self, secret_name: &'a str) -> RotateFuture<'a> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		self.names.lock().expect("Rotator lock should not be poisoned.").push(secret_name.to_owned());

		let result = self.result.clone();

		Box::pin(async move { result })
	}
}

/// Tracker reading the provided variables instead of the process environment.
pub fn tracker_with<const N: usize>(pairs: [(&str, &str); N]) -> Arc<SecretTracker> {
	Arc::new(SecretTracker::with_env(StaticEnv::from_pairs(pairs)))
}

/// Layer with a scripted rotator, the given environment, and no settle delay.
pub fn scripted_layer<const N: usize>(
	pairs: [(&str, &str); N],
	rotator: Arc<ScriptedRotator>,
) -> RotationLayer {
	RotationLayer::with_rotator(RotationConfig::default().with_debug(true), rotator)
		.with_tracker(tracker_with(pairs))
		.with_settle_delay(Duration::ZERO)
}

/// `GET url` carrying `Authorization: Bearer <token>`.
pub fn bearer_request(url: &str, token: &str) -> HttpRequest {
	let mut request = HttpRequest::new(Vec::new());

	*request.uri_mut() = url.parse().expect("Fixture URL should parse as a URI.");
	request.headers_mut().insert(
		AUTHORIZATION,
		HeaderValue::from_str(&format!("Bearer {token}")).expect("Fixture token should be valid."),
	);

	request
}
