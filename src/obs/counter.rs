// self
use crate::{
	_prelude::*,
	obs::{Primitive, RotationOutcome},
};

/// Records one rotation decision as `birch_rotation_total{primitive, outcome}`.
pub fn record_outcome(primitive: Primitive, outcome: RotationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"birch_rotation_total",
			"primitive" => primitive.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (primitive, outcome);
	}
}

/// Records how the single retry after a rotation ended as `birch_retry_total{primitive, result}`.
///
/// `status` is `None` when the retry never produced a response.
pub fn record_retry(primitive: Primitive, status: Option<StatusCode>) {
	let result = retry_label(status);

	#[cfg(feature = "metrics")]
	{
		metrics::counter!("birch_retry_total", "primitive" => primitive.as_str(), "result" => result)
			.increment(1);
	}
	#[cfg(not(feature = "metrics"))]
	{
		let _ = (primitive, result);
	}
}

fn retry_label(status: Option<StatusCode>) -> &'static str {
	match status {
		None => "transport_error",
		Some(StatusCode::TOO_MANY_REQUESTS) => "still_rate_limited",
		Some(status) if status.is_success() => "recovered",
		Some(_) => "failed",
	}
}
