// self
use crate::{
	_prelude::*,
	obs::{Primitive, RotationOutcome},
};

/// Future returned by [`InterceptSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`InterceptSpan::instrument`].
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// `birch.intercept` span covering the rotation half of one rate-limited call.
///
/// The destination host and primitive are known up front; the resolved `secret` and the final
/// `outcome` are filled in as the protocol progresses, so a single span answers "which key was
/// rotated for which host, and did it work".
#[derive(Clone, Debug)]
pub struct InterceptSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl InterceptSpan {
	/// Opens a span for a `429` answered by `host`.
	pub fn new(primitive: Primitive, host: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!(
				"birch.intercept",
				primitive = primitive.as_str(),
				host,
				secret = tracing::field::Empty,
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (primitive, host);

			Self {}
		}
	}

	/// Tags the span with the secret chosen for rotation. Only the name is recorded.
	pub fn record_secret(&self, secret_name: &str) {
		#[cfg(feature = "tracing")]
		self.span.record("secret", secret_name);
		#[cfg(not(feature = "tracing"))]
		let _ = secret_name;
	}

	/// Tags the span with the final decision.
	pub fn record_outcome(&self, outcome: RotationOutcome) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = outcome;
	}

	/// Runs `fut` inside the span without holding an entered guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
