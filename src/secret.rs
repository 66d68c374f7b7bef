//! Redacting wrapper for credential values.

// self
use crate::_prelude::*;

/// Credential value that never prints its contents through `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);
impl SecretValue {
	const HINT_LEN: usize = 4;

	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Masked form keeping only the last four characters, e.g. `***a1b2`.
	pub fn hint(&self) -> String {
		let count = self.0.chars().count();

		if count <= Self::HINT_LEN {
			return "***".into();
		}

		let tail = self.0.chars().skip(count - Self::HINT_LEN).collect::<String>();

		format!("***{tail}")
	}

	/// Returns `true` when the wrapped value is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl AsRef<str> for SecretValue {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<String> for SecretValue {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for SecretValue {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl Debug for SecretValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SecretValue").field(&"<redacted>").finish()
	}
}
impl Display for SecretValue {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = SecretValue::new("sk_live_abcdef");

		assert_eq!(format!("{secret:?}"), "SecretValue(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn hint_keeps_only_the_tail() {
		assert_eq!(SecretValue::new("sk_live_abcdef").hint(), "***cdef");
		assert_eq!(SecretValue::new("abcd").hint(), "***");
		assert_eq!(SecretValue::new("").hint(), "***");
	}

	#[test]
	fn serializes_as_plain_string() {
		let secret: SecretValue =
			serde_json::from_str("\"new123\"").expect("Secret should deserialize from a string.");

		assert_eq!(secret.expose(), "new123");
		assert_eq!(
			serde_json::to_string(&secret).expect("Secret should serialize to a string."),
			"\"new123\""
		);
	}
}
