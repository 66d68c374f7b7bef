//! Optional observability helpers for the interceptors.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to wrap the rotation half of every rate-limited call in a `birch.intercept`
//!   span carrying `primitive` and `host`, later tagged with the resolved `secret` name and the
//!   final `outcome`. Diagnostic events are additionally gated on
//!   [`RotationConfig::debug`](crate::config::RotationConfig::debug).
//! - Enable `metrics` to increment `birch_rotation_total{primitive, outcome}` for every rate-limit
//!   decision and `birch_retry_total{primitive, result}` for every retry issued after a rotation.

mod counter;
mod span;

pub use counter::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Emits a `tracing` event at `$level` when the config's `debug` flag is set.
///
/// Compiles to nothing without the `tracing` feature.
macro_rules! debug_event {
	($config:expr, $level:ident, $($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		{
			if $config.debug {
				::tracing::$level!($($arg)+);
			}
		}
	}};
}
pub(crate) use debug_event;

/// Interception primitives observed by the layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
	/// [`RotatingTransport`](crate::intercept::RotatingTransport) wrapping a plain transport.
	Transport,
	/// `reqwest-middleware` hook.
	Middleware,
}
impl Primitive {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Primitive::Transport => "transport",
			Primitive::Middleware => "middleware",
		}
	}
}
impl Display for Primitive {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Decision labels recorded for each rate-limited call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotationOutcome {
	/// Upstream answered `429`.
	RateLimited,
	/// No secret could be associated with the destination.
	Unresolved,
	/// A replacement was obtained and the request was replayed.
	Rotated,
	/// The rotation service failed or declined.
	Rejected,
}
impl RotationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RotationOutcome::RateLimited => "rate_limited",
			RotationOutcome::Unresolved => "unresolved",
			RotationOutcome::Rotated => "rotated",
			RotationOutcome::Rejected => "rejected",
		}
	}
}
impl Display for RotationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
