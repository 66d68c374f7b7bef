//! Association tracker mapping outbound destinations to the secrets behind their credentials.
//!
//! Every intercepted request is offered to [`SecretTracker::track_request`] before it leaves the
//! process. When a request later fails with `429`, [`SecretTracker::secret_name`] answers which
//! environment variable should be rotated. Associations are keyed by normalized host and the most
//! recent recognized credential wins.

pub mod matcher;

pub use matcher::*;

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap};
// self
use crate::{
	_prelude::*,
	env::{EnvSource, ProcessEnv},
	http,
	secret::SecretValue,
};

/// Recorded link between a destination host and the secret believed to supply its credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedAssociation {
	/// Normalized destination host.
	pub host: String,
	/// Environment variable name.
	pub secret_name: String,
	/// Credential observed on the most recent tracked call.
	pub credential: SecretValue,
	/// Strategy family that resolved the name.
	pub kind: MatchKind,
	/// When the association was recorded.
	pub observed_at: OffsetDateTime,
}

#[derive(Debug)]
struct Entry {
	association: TrackedAssociation,
	tick: u64,
}

/// Thread-safe host → secret association map.
pub struct SecretTracker {
	env: Arc<dyn EnvSource>,
	matchers: Vec<Arc<dyn SecretMatcher>>,
	associations: RwLock<HashMap<String, Entry>>,
	max_hosts: Option<usize>,
	clock: AtomicU64,
}
impl SecretTracker {
	/// Builds a tracker reading the live process environment with the default matchers.
	pub fn new() -> Self {
		Self::with_env(ProcessEnv)
	}

	/// Builds a tracker reading candidates from `env` with the default matchers.
	pub fn with_env(env: impl 'static + EnvSource) -> Self {
		Self {
			env: Arc::new(env),
			matchers: default_matchers(),
			associations: Default::default(),
			max_hosts: None,
			clock: AtomicU64::new(0),
		}
	}

	/// Replaces the ordered matcher list.
	pub fn with_matchers(mut self, matchers: Vec<Arc<dyn SecretMatcher>>) -> Self {
		self.matchers = matchers;

		self
	}

	/// Caps the number of tracked hosts, evicting the least recently tracked host when full.
	pub fn with_max_hosts(mut self, max_hosts: usize) -> Self {
		self.max_hosts = Some(max_hosts.max(1));

		self
	}

	/// Records which secret produced the request's credential.
	///
	/// Requests without an `Authorization` header, with an unparseable URL, or whose credential is
	/// not recognized by any matcher leave the map untouched.
	pub fn track_request(&self, url: &str, headers: &HeaderMap) -> Option<MatchKind> {
		let host = normalized_host(url)?;
		let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
		let (_, credential) = http::split_authorization(raw);

		if credential.is_empty() {
			return None;
		}

		let found = self.resolve(&host, credential)?;
		let kind = found.kind;
		let association = TrackedAssociation {
			host: host.clone(),
			secret_name: found.name,
			credential: SecretValue::new(credential),
			kind,
			observed_at: OffsetDateTime::now_utc(),
		};

		self.insert(host, association);

		Some(kind)
	}

	/// Runs the matcher list against a credential observed for `host`.
	pub fn resolve(&self, host: &str, credential: &str) -> Option<SecretMatch> {
		let ctx = MatchContext { host, credential, env: self.env.as_ref() };

		self.matchers.iter().find_map(|matcher| matcher.match_secret(&ctx))
	}

	/// Returns the secret name recorded for the URL's host.
	pub fn secret_name(&self, url: &str) -> Option<String> {
		self.association(url).map(|association| association.secret_name)
	}

	/// Returns the full association recorded for the URL's host.
	pub fn association(&self, url: &str) -> Option<TrackedAssociation> {
		let host = normalized_host(url)?;

		self.associations.read().get(&host).map(|entry| entry.association.clone())
	}

	/// Drops every association.
	pub fn clear(&self) {
		self.associations.write().clear();
	}

	/// Number of tracked hosts.
	pub fn len(&self) -> usize {
		self.associations.read().len()
	}

	/// Returns `true` when no host is tracked.
	pub fn is_empty(&self) -> bool {
		self.associations.read().is_empty()
	}

	fn insert(&self, host: String, association: TrackedAssociation) {
		let tick = self.clock.fetch_add(1, Ordering::Relaxed);
		let mut guard = self.associations.write();

		let full = self.max_hosts.is_some_and(|limit| guard.len() >= limit);

		if full && !guard.contains_key(&host) {
			let oldest =
				guard.iter().min_by_key(|(_, entry)| entry.tick).map(|(key, _)| key.clone());

			if let Some(oldest) = oldest {
				guard.remove(&oldest);
			}
		}

		guard.insert(host, Entry { association, tick });
	}
}
impl Default for SecretTracker {
	fn default() -> Self {
		Self::new()
	}
}
impl Debug for SecretTracker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecretTracker")
			.field("hosts", &self.len())
			.field("matchers", &self.matchers.len())
			.field("max_hosts", &self.max_hosts)
			.finish()
	}
}

/// Lowercased host of `url`, with `:port` appended when the URL names a non-default port.
pub fn normalized_host(url: &str) -> Option<String> {
	let parsed = Url::parse(url).ok()?;
	let host = parsed.host_str()?.to_ascii_lowercase();

	Some(match parsed.port() {
		Some(port) => format!("{host}:{port}"),
		None => host,
	})
}
