//! Sources of secret candidates.
//!
//! The tracker never caches environment values: every lookup asks the source again so rotations
//! that update the environment are visible without a restart.

// self
use crate::_prelude::*;

/// Environment variable name/value pair considered while resolving a credential.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretCandidate {
	/// Variable name.
	pub name: String,
	/// Current variable value.
	pub value: String,
}
impl Debug for SecretCandidate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SecretCandidate")
			.field("name", &self.name)
			.field("value", &"<redacted>")
			.finish()
	}
}

/// Snapshot provider for environment variables.
pub trait EnvSource
where
	Self: Send + Sync,
{
	/// Returns every variable currently visible to the source.
	fn candidates(&self) -> Vec<SecretCandidate>;
}

/// Reads the live process environment on every call.
///
/// Variables whose name or value is not valid Unicode are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;
impl EnvSource for ProcessEnv {
	fn candidates(&self) -> Vec<SecretCandidate> {
		std::env::vars_os()
			.filter_map(|(name, value)| {
				Some(SecretCandidate { name: name.into_string().ok()?, value: value.into_string().ok()? })
			})
			.collect()
	}
}

/// Mutable in-memory environment, handy for tests and sandboxed hosts.
#[derive(Clone, Debug, Default)]
pub struct StaticEnv(Arc<RwLock<HashMap<String, String>>>);
impl StaticEnv {
	/// Builds a source from name/value pairs.
	pub fn from_pairs<I, K, V>(pairs: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let map = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Inserts or replaces a variable.
	pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
		self.0.write().insert(name.into(), value.into());
	}

	/// Removes a variable.
	pub fn remove(&self, name: &str) {
		self.0.write().remove(name);
	}
}
impl EnvSource for StaticEnv {
	fn candidates(&self) -> Vec<SecretCandidate> {
		self.0
			.read()
			.iter()
			.map(|(name, value)| SecretCandidate { name: name.clone(), value: value.clone() })
			.collect()
	}
}
