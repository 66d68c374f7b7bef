//! Per-secret coalescing of concurrent rotations.
//!
//! Without coordination, every request that hits a `429` for the same key asks the service for
//! its own rotation. [`Singleflight`] serializes rotations per secret name: a caller that had to
//! wait behind an in-flight rotation reuses that rotation's result instead of issuing another one.

// self
use crate::{
	_prelude::*,
	rotation::{RotateFuture, RotationResult, SecretRotator},
};

#[derive(Debug, Default)]
struct Flight {
	generation: AtomicU64,
	last: AsyncMutex<Option<RotationResult>>,
}

/// [`SecretRotator`] decorator sharing one in-flight rotation per secret.
pub struct Singleflight {
	inner: Arc<dyn SecretRotator>,
	flights: Mutex<HashMap<String, Arc<Flight>>>,
}
impl Singleflight {
	/// Wraps `inner`.
	pub fn new(inner: Arc<dyn SecretRotator>) -> Self {
		Self { inner, flights: Default::default() }
	}

	fn flight(&self, secret_name: &str) -> Arc<Flight> {
		let mut flights = self.flights.lock();

		flights.entry(secret_name.to_owned()).or_default().clone()
	}
}
impl Debug for Singleflight {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Singleflight").field("secrets", &self.flights.lock().len()).finish()
	}
}
impl SecretRotator for Singleflight {
	fn rotate<'a>(&'a self, secret_name: &'a str) -> RotateFuture<'a> {
		Box::pin(async move {
			let flight = self.flight(secret_name);
			let seen = flight.generation.load(Ordering::Acquire);
			let mut last = flight.last.lock().await;

			// A rotation finished while this caller was queued.
			if flight.generation.load(Ordering::Acquire) != seen {
				if let Some(result) = last.as_ref() {
					return result.clone();
				}
			}

			let result = self.inner.rotate(secret_name).await;

			*last = Some(result.clone());
			flight.generation.fetch_add(1, Ordering::Release);

			result
		})
	}
}
