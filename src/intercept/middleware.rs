//! `reqwest-middleware` integration.
//!
//! Register the middleware on every client that should rotate, either through
//! [`RotationLayer::install_middleware`] or by attaching [`RotationMiddleware`] directly. The
//! retry runs through [`Next`], i.e. the remainder of the chain below this middleware. When hooks
//! end up stacked on one client, the outermost one marks the request's [`Extensions`] and the
//! inner ones step aside, so a call is still tracked once and retried at most once.

// crates.io
use ::http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, Middleware, Next, Result as MiddlewareResult};
// self
use crate::{
	_prelude::*,
	http::replace_authorization,
	intercept::{Intercepted, RotationLayer},
	obs::{self, Primitive},
};

/// Request/response hook rotating credentials on `429`.
#[derive(Clone, Debug)]
pub struct RotationMiddleware {
	layer: RotationLayer,
}
impl RotationMiddleware {
	/// Builds a hook backed by `layer`.
	pub fn new(layer: RotationLayer) -> Self {
		Self { layer }
	}

	async fn intercept(
		&self,
		req: Request,
		extensions: &mut Extensions,
		next: Next<'_>,
	) -> MiddlewareResult<Response> {
		let url = req.url().to_string();

		self.layer.track(&url, req.headers());

		// Streaming bodies cannot be replayed; such requests pass through untouched.
		let replay = req.try_clone();
		let response = next.clone().run(req, extensions).await?;

		if response.status() != StatusCode::TOO_MANY_REQUESTS {
			return Ok(response);
		}

		let Some(mut retry) = replay else {
			obs::debug_event!(self.layer.config(), warn, url = %url, "Request body cannot be replayed; returning 429.");

			return Ok(response);
		};
		let Some(credential) = self.layer.replacement_for(Primitive::Middleware, &url).await else {
			return Ok(response);
		};

		if let Err(e) = replace_authorization(retry.headers_mut(), &credential) {
			obs::debug_event!(self.layer.config(), warn, error = %e, "Rotated credential is not a valid header value.");

			return Ok(response);
		}

		match next.run(retry, extensions).await {
			Ok(retried) => {
				obs::record_retry(Primitive::Middleware, Some(retried.status()));

				Ok(retried)
			},
			Err(e) => {
				obs::debug_event!(self.layer.config(), warn, error = %e, "Retry failed; returning the original response.");
				obs::record_retry(Primitive::Middleware, None);

				Ok(response)
			},
		}
	}
}
#[async_trait::async_trait]
impl Middleware for RotationMiddleware {
	async fn handle(
		&self,
		req: Request,
		extensions: &mut Extensions,
		next: Next<'_>,
	) -> MiddlewareResult<Response> {
		if extensions.get::<Intercepted>().is_some() {
			return next.run(req, extensions).await;
		}

		extensions.insert(Intercepted);

		let result = self.intercept(req, extensions, next).await;

		extensions.remove::<Intercepted>();

		result
	}
}

impl RotationLayer {
	/// Attaches a [`RotationMiddleware`] backed by this layer to `builder`.
	///
	/// Call it for every client that should rotate. Attaching it twice to the same builder is
	/// harmless: the inner hook defers to the outer one.
	pub fn install_middleware(&self, builder: ClientBuilder) -> ClientBuilder {
		obs::debug_event!(self.config, info, "Middleware interceptor installed.");

		builder.with(RotationMiddleware::new(self.clone()))
	}
}
