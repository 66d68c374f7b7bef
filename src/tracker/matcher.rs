//! Secret resolution strategies.
//!
//! The tracker runs matchers in order and keeps the first hit. An exact value match is proof of
//! which variable produced a credential; the heuristic matchers are best-effort and may return a
//! name the rotation service does not know.

// self
use crate::{_prelude::*, env::EnvSource};

/// Provider domains and the secret names conventionally used for them.
const HOST_SIGNATURES: &[(&str, &str)] = &[
	("tiktok.com", "TIKTOK_API_KEY"),
	("tiktokapis.com", "TIKTOK_API_KEY"),
	("twitter.com", "TWITTER_API_KEY"),
	("x.com", "TWITTER_API_KEY"),
	("openai.com", "OPENAI_API_KEY"),
	("anthropic.com", "ANTHROPIC_API_KEY"),
	("stripe.com", "STRIPE_SECRET_KEY"),
	("github.com", "GITHUB_TOKEN"),
	("slack.com", "SLACK_BOT_TOKEN"),
	("sendgrid.com", "SENDGRID_API_KEY"),
	("twilio.com", "TWILIO_AUTH_TOKEN"),
	("resend.com", "RESEND_API_KEY"),
	("groq.com", "GROQ_API_KEY"),
	("mistral.ai", "MISTRAL_API_KEY"),
	("googleapis.com", "GOOGLE_API_KEY"),
];

/// Well-known token prefixes. Longer prefixes sharing a stem come first.
const TOKEN_PREFIXES: &[(&str, &str)] = &[
	("sk-ant-", "ANTHROPIC_API_KEY"),
	("sk-proj-", "OPENAI_API_KEY"),
	("sk-", "OPENAI_API_KEY"),
	("sk_live_", "STRIPE_SECRET_KEY"),
	("rk_live_", "STRIPE_SECRET_KEY"),
	("xoxb-", "SLACK_BOT_TOKEN"),
	("ghp_", "GITHUB_TOKEN"),
	("github_pat_", "GITHUB_TOKEN"),
	("gsk_", "GROQ_API_KEY"),
	("re_", "RESEND_API_KEY"),
	("SG.", "SENDGRID_API_KEY"),
];

/// How a secret name was derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchKind {
	/// The credential equals the current value of the named variable.
	ExactMatch,
	/// The name was inferred from the host or the token shape.
	HeuristicMatch,
}
impl MatchKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			MatchKind::ExactMatch => "exact",
			MatchKind::HeuristicMatch => "heuristic",
		}
	}
}
impl Display for MatchKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Inputs available to a [`SecretMatcher`].
pub struct MatchContext<'a> {
	/// Normalized destination host.
	pub host: &'a str,
	/// Raw credential with any scheme prefix removed.
	pub credential: &'a str,
	/// Environment snapshot provider.
	pub env: &'a dyn EnvSource,
}
impl Debug for MatchContext<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("MatchContext").field("host", &self.host).finish_non_exhaustive()
	}
}

/// Secret name produced by a matcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecretMatch {
	/// Environment variable name believed to hold the credential.
	pub name: String,
	/// Strategy family that produced the name.
	pub kind: MatchKind,
}
impl SecretMatch {
	/// Builds an exact match.
	pub fn exact(name: impl Into<String>) -> Self {
		Self { name: name.into(), kind: MatchKind::ExactMatch }
	}

	/// Builds a heuristic match.
	pub fn heuristic(name: impl Into<String>) -> Self {
		Self { name: name.into(), kind: MatchKind::HeuristicMatch }
	}
}

/// Strategy mapping a credential observation to a secret name.
pub trait SecretMatcher
where
	Self: Send + Sync,
{
	/// Returns the secret name for the observation, if this strategy recognizes it.
	fn match_secret(&self, ctx: &MatchContext<'_>) -> Option<SecretMatch>;
}

/// Matcher list used by [`SecretTracker::new`](crate::tracker::SecretTracker::new).
pub fn default_matchers() -> Vec<Arc<dyn SecretMatcher>> {
	vec![
		Arc::new(ExactValueMatcher),
		Arc::new(HostSignatureMatcher::default()),
		Arc::new(TokenPrefixMatcher::default()),
	]
}

/// Scans the environment for a variable whose value equals the credential.
///
/// Empty values never match. When several variables share the value, the lexicographically
/// smallest name wins so results do not depend on environment iteration order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactValueMatcher;
impl SecretMatcher for ExactValueMatcher {
	fn match_secret(&self, ctx: &MatchContext<'_>) -> Option<SecretMatch> {
		if ctx.credential.is_empty() {
			return None;
		}

		ctx.env
			.candidates()
			.into_iter()
			.filter(|candidate| !candidate.value.is_empty() && candidate.value == ctx.credential)
			.map(|candidate| candidate.name)
			.min()
			.map(SecretMatch::exact)
	}
}

/// Maps provider domains to conventional secret names.
#[derive(Clone, Debug)]
pub struct HostSignatureMatcher {
	signatures: Vec<(String, String)>,
}
impl HostSignatureMatcher {
	/// Builds a matcher with no signatures.
	pub fn empty() -> Self {
		Self { signatures: Vec::new() }
	}

	/// Adds a signature checked before every previously registered one.
	pub fn with_signature(mut self, domain: impl Into<String>, secret: impl Into<String>) -> Self {
		self.signatures.insert(0, (domain.into().to_ascii_lowercase(), secret.into()));

		self
	}
}
impl Default for HostSignatureMatcher {
	fn default() -> Self {
		let signatures = HOST_SIGNATURES
			.iter()
			.map(|(domain, secret)| ((*domain).to_owned(), (*secret).to_owned()))
			.collect();

		Self { signatures }
	}
}
impl SecretMatcher for HostSignatureMatcher {
	fn match_secret(&self, ctx: &MatchContext<'_>) -> Option<SecretMatch> {
		let host = strip_port(ctx.host);

		self.signatures
			.iter()
			.find(|(domain, _)| domain_matches(host, domain))
			.map(|(_, secret)| SecretMatch::heuristic(secret.as_str()))
	}
}

/// Infers a secret name from the credential's prefix.
///
/// Known vendor prefixes are consulted first, then the `sk_<provider>_…` convention which maps to
/// `<PROVIDER>_API_KEY`.
#[derive(Clone, Debug)]
pub struct TokenPrefixMatcher {
	prefixes: Vec<(String, String)>,
}
impl TokenPrefixMatcher {
	/// Adds a prefix checked before every previously registered one.
	pub fn with_prefix(mut self, prefix: impl Into<String>, secret: impl Into<String>) -> Self {
		self.prefixes.insert(0, (prefix.into(), secret.into()));

		self
	}
}
impl Default for TokenPrefixMatcher {
	fn default() -> Self {
		let prefixes = TOKEN_PREFIXES
			.iter()
			.map(|(prefix, secret)| ((*prefix).to_owned(), (*secret).to_owned()))
			.collect();

		Self { prefixes }
	}
}
impl SecretMatcher for TokenPrefixMatcher {
	fn match_secret(&self, ctx: &MatchContext<'_>) -> Option<SecretMatch> {
		self.prefixes
			.iter()
			.find(|(prefix, _)| ctx.credential.starts_with(prefix.as_str()))
			.map(|(_, secret)| SecretMatch::heuristic(secret.as_str()))
			.or_else(|| provider_convention(ctx.credential).map(SecretMatch::heuristic))
	}
}

fn strip_port(host: &str) -> &str {
	// Bracketed IPv6 hosts keep their colons.
	if host.starts_with('[') {
		return host.find(']').map_or(host, |idx| &host[..=idx]);
	}

	host.rsplit_once(':').map_or(host, |(head, _)| head)
}

fn domain_matches(host: &str, domain: &str) -> bool {
	host == domain || host.strip_suffix(domain).is_some_and(|head| head.ends_with('.'))
}

fn provider_convention(credential: &str) -> Option<String> {
	let rest = credential.strip_prefix("sk_")?;
	let (provider, tail) = rest.split_once('_')?;

	if tail.is_empty()
		|| provider.is_empty()
		|| !provider.chars().all(|ch| ch.is_ascii_alphanumeric())
		|| matches!(provider, "live" | "test")
	{
		return None;
	}

	Some(format!("{}_API_KEY", provider.to_ascii_uppercase()))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::env::StaticEnv;

	fn ctx<'a>(host: &'a str, credential: &'a str, env: &'a StaticEnv) -> MatchContext<'a> {
		MatchContext { host, credential, env }
	}

	#[test]
	fn exact_match_prefers_smallest_name() {
		let env = StaticEnv::from_pairs([("B_KEY", "shared"), ("A_KEY", "shared"), ("C", "")]);

		assert_eq!(
			ExactValueMatcher.match_secret(&ctx("api.example.com", "shared", &env)),
			Some(SecretMatch::exact("A_KEY"))
		);
		assert_eq!(ExactValueMatcher.match_secret(&ctx("api.example.com", "", &env)), None);
	}

	#[test]
	fn host_signature_matches_subdomains_only() {
		let env = StaticEnv::default();
		let matcher = HostSignatureMatcher::default();

		assert_eq!(
			matcher.match_secret(&ctx("open.tiktokapis.com", "whatever", &env)),
			Some(SecretMatch::heuristic("TIKTOK_API_KEY"))
		);
		assert_eq!(
			matcher.match_secret(&ctx("api.x.com:8443", "whatever", &env)),
			Some(SecretMatch::heuristic("TWITTER_API_KEY"))
		);
		assert_eq!(matcher.match_secret(&ctx("dropbox.com", "whatever", &env)), None);
	}

	#[test]
	fn custom_signature_takes_priority() {
		let env = StaticEnv::default();
		let matcher = HostSignatureMatcher::default().with_signature("API.OpenAI.com", "OPENAI_ORG_KEY");

		assert_eq!(
			matcher.match_secret(&ctx("api.openai.com", "sk-1", &env)),
			Some(SecretMatch::heuristic("OPENAI_ORG_KEY"))
		);
	}

	#[test]
	fn token_prefixes_prefer_longest_stem() {
		let env = StaticEnv::default();
		let matcher = TokenPrefixMatcher::default();

		assert_eq!(
			matcher.match_secret(&ctx("h", "sk-ant-api03-x", &env)).map(|m| m.name),
			Some("ANTHROPIC_API_KEY".into())
		);
		assert_eq!(
			matcher.match_secret(&ctx("h", "sk-abc", &env)).map(|m| m.name),
			Some("OPENAI_API_KEY".into())
		);
		assert_eq!(
			matcher.match_secret(&ctx("h", "xoxb-123", &env)).map(|m| m.name),
			Some("SLACK_BOT_TOKEN".into())
		);
	}

	#[test]
	fn provider_convention_builds_api_key_name() {
		assert_eq!(provider_convention("sk_tiktok_unknown"), Some("TIKTOK_API_KEY".into()));
		assert_eq!(provider_convention("sk_test_12345"), None);
		assert_eq!(provider_convention("sk_tiktok_"), None);
		assert_eq!(provider_convention("pk_tiktok_abc"), None);
	}

	#[test]
	fn strip_port_handles_ipv6() {
		assert_eq!(strip_port("[::1]:8080"), "[::1]");
		assert_eq!(strip_port("example.com:443"), "example.com");
		assert_eq!(strip_port("example.com"), "example.com");
	}
}
