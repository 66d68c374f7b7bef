//! Transport wrapper applying the rotation protocol to a plain request function.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{self, HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	intercept::{Intercepted, RotationLayer},
	obs::{self, Primitive},
};

/// [`HttpTransport`] that rotates credentials on `429` before handing the response back.
///
/// The wrapper keeps the original transport and an installation flag. While uninstalled it is a
/// pure pass-through, so [`RotatingTransport::uninstall`] restores the original behavior without
/// rebuilding the caller's plumbing.
pub struct RotatingTransport<T>
where
	T: ?Sized + HttpTransport,
{
	layer: RotationLayer,
	original: Arc<T>,
	installed: AtomicBool,
}
impl<T> RotatingTransport<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps `original` without installing the wrapper.
	pub fn new(layer: RotationLayer, original: Arc<T>) -> Self {
		Self { layer, original, installed: AtomicBool::new(false) }
	}

	/// Activates interception. Returns `false` when it was already active.
	pub fn install(&self) -> bool {
		let fresh = !self.installed.swap(true, Ordering::AcqRel);

		if fresh {
			obs::debug_event!(self.layer.config(), info, "Transport interceptor installed.");
		}

		fresh
	}

	/// Restores pass-through to the original transport. Returns `false` when it was not active.
	pub fn uninstall(&self) -> bool {
		let was_installed = self.installed.swap(false, Ordering::AcqRel);

		if was_installed {
			obs::debug_event!(self.layer.config(), info, "Transport interceptor uninstalled.");
		}

		was_installed
	}

	/// Whether interception is active.
	pub fn is_installed(&self) -> bool {
		self.installed.load(Ordering::Acquire)
	}

	/// The wrapped transport.
	pub fn original(&self) -> &Arc<T> {
		&self.original
	}

	/// Layer shared with the other interceptors.
	pub fn layer(&self) -> &RotationLayer {
		&self.layer
	}

	/// Sends `request`, rotating and retrying once if the upstream answers `429`.
	///
	/// A request already marked by an outer rotation wrapper goes straight to the original
	/// transport, so stacked wrappers never track twice or retry more than once.
	pub async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
		if !self.is_installed() || request.extensions().get::<Intercepted>().is_some() {
			return self.original.execute(request).await;
		}

		request.extensions_mut().insert(Intercepted);

		let url = request.uri().to_string();

		self.layer.track(&url, request.headers());

		// Only requests with a known secret can be retried; skip buffering a copy for the rest.
		let replay = self
			.layer
			.tracker()
			.secret_name(&url)
			.is_some()
			.then(|| http::clone_request(&request));
		let response = self.original.execute(request).await?;

		if response.status() != StatusCode::TOO_MANY_REQUESTS {
			return Ok(response);
		}

		let Some(mut retry) = replay else {
			self.layer.skip_unresolved(Primitive::Transport, &url);

			return Ok(response);
		};
		let Some(credential) = self.layer.replacement_for(Primitive::Transport, &url).await else {
			return Ok(response);
		};

		if let Err(e) = http::replace_authorization(retry.headers_mut(), &credential) {
			obs::debug_event!(self.layer.config(), warn, error = %e, "Rotated credential is not a valid header value.");

			return Ok(response);
		}

		match self.original.execute(retry).await {
			Ok(retried) => {
				obs::record_retry(Primitive::Transport, Some(retried.status()));

				Ok(retried)
			},
			Err(e) => {
				obs::debug_event!(self.layer.config(), warn, error = %e, "Retry failed; returning the original response.");
				obs::record_retry(Primitive::Transport, None);

				Ok(response)
			},
		}
	}
}
impl<T> HttpTransport for RotatingTransport<T>
where
	T: ?Sized + HttpTransport,
{
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(self.send(request))
	}
}
impl<T> Debug for RotatingTransport<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RotatingTransport")
			.field("layer", &self.layer)
			.field("installed", &self.is_installed())
			.finish()
	}
}
