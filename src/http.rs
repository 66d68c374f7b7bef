//! Transport primitives shared by the interceptors.
//!
//! [`HttpTransport`] is the "plain request function" the transport interceptor wraps. Requests are
//! buffered [`HttpRequest`] values so an intercepted call can be replayed with a rotated
//! credential; [`ReqwestTransport`] is the default implementation backed by [`ReqwestClient`].

// std
use std::ops::Deref;
// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};
// self
use crate::{_prelude::*, error::TransportError, secret::SecretValue};

/// Buffered outbound request.
pub type HttpRequest = ::http::Request<Vec<u8>>;
/// Buffered inbound response.
pub type HttpResponse = ::http::Response<Vec<u8>>;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Request/response transport the rotation layer can wrap.
///
/// Implementations must be shareable across tasks; the wrapper holds them behind `Arc` and
/// invokes them for both the original call and the single retry.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and buffers the full response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let request =
				reqwest::Request::try_from(request).map_err(TransportError::invalid_request)?;
			let response = client.execute(request).await?;
			let status = response.status();
			let version = response.version();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();
			let mut response_new = HttpResponse::new(body);

			*response_new.status_mut() = status;
			*response_new.version_mut() = version;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Splits an `Authorization` value into its optional scheme and the raw credential.
///
/// `Bearer abc` yields `(Some("Bearer"), "abc")`; a bare `abc` yields `(None, "abc")`. A leading
/// word counts as a scheme only when it is purely alphabetic and followed by whitespace.
pub fn split_authorization(raw: &str) -> (Option<&str>, &str) {
	let raw = raw.trim();

	match raw.split_once(char::is_whitespace) {
		Some((scheme, rest))
			if !scheme.is_empty() && scheme.chars().all(|ch| ch.is_ascii_alphabetic()) =>
			(Some(scheme), rest.trim()),
		_ => (None, raw),
	}
}

/// Replaces the `Authorization` header with `credential`, keeping the previous scheme.
///
/// Requests that carried no scheme (or no header at all) get `Bearer`.
pub fn replace_authorization(
	headers: &mut HeaderMap,
	credential: &SecretValue,
) -> Result<(), InvalidHeaderValue> {
	let scheme = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|raw| split_authorization(raw).0.map(str::to_owned))
		.unwrap_or_else(|| "Bearer".into());
	let mut value = HeaderValue::from_str(&format!("{scheme} {}", credential.expose()))?;

	value.set_sensitive(true);
	headers.insert(AUTHORIZATION, value);

	Ok(())
}

/// Copies a buffered request, extensions included, so it can be replayed.
pub fn clone_request(request: &HttpRequest) -> HttpRequest {
	let mut copy = HttpRequest::new(request.body().clone());

	*copy.method_mut() = request.method().clone();
	*copy.uri_mut() = request.uri().clone();
	*copy.version_mut() = request.version();
	*copy.headers_mut() = request.headers().clone();
	*copy.extensions_mut() = request.extensions().clone();

	copy
}
