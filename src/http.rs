//! Transport primitives shared by the request pipeline and token exchanges.
//!
//! [`HttpTransport`] is the broker's only dependency on an HTTP stack. The pipeline sends
//! directory calls through it directly, while token exchanges reach it through
//! [`OAuthHttpHandle`], which adapts any transport to the `oauth2` crate's
//! [`AsyncHttpClient`] contract. Tests swap in fakes without touching either caller.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError,
	http::{Method, Uri},
};
// self
use crate::{_prelude::*, error::TransportError};

pub use oauth2::{HttpRequest, HttpResponse};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Generic HTTP send capability consumed by the broker.
///
/// Implementations receive a fully built request (method, URL, headers, body) and return the
/// status, headers, and body bytes. They must not retry on their own behalf unless the caller
/// configured them to; the pipeline never retries.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the raw response.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// HTTP verbs used against the directory API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
	/// Reads a resource or collection.
	Get,
	/// Creates a resource or invokes an action.
	Post,
	/// Partially updates a resource.
	Patch,
	/// Removes a resource.
	Delete,
}
impl Verb {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Verb::Get => "GET",
			Verb::Post => "POST",
			Verb::Patch => "PATCH",
			Verb::Delete => "DELETE",
		}
	}

	/// Returns the matching HTTP method.
	pub fn method(self) -> Method {
		match self {
			Verb::Get => Method::GET,
			Verb::Post => Method::POST,
			Verb::Patch => Method::PATCH,
			Verb::Delete => Method::DELETE,
		}
	}

	/// Returns `true` if requests with this verb carry a JSON body.
	pub const fn carries_body(self) -> bool {
		matches!(self, Verb::Post | Verb::Patch)
	}
}
impl Display for Verb {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Adapts any [`HttpTransport`] to the `oauth2` crate's [`AsyncHttpClient`] contract.
#[derive(Clone)]
pub struct OAuthHttpHandle(Arc<dyn HttpTransport>);
impl OAuthHttpHandle {
	/// Wraps a shared transport.
	pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
		Self(transport)
	}
}
impl<'c> AsyncHttpClient<'c> for OAuthHttpHandle {
	type Error = HttpClientError<TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.0.send(request).await.map_err(|err| HttpClientError::Reqwest(Box::new(err)))
		})
	}
}
impl Debug for OAuthHttpHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OAuthHttpHandle(..)")
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints return results directly instead of delegating to another URI, so any
/// custom [`ReqwestClient`] handed to [`ReqwestHttpClient::with_client`] should disable
/// redirect following.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let target = describe_target(request.uri());
			let request = reqwest::Request::try_from(request)
				.map_err(|err| TransportError::network(target.clone(), err))?;
			let response = client
				.execute(request)
				.await
				.map_err(|err| TransportError::network(target.clone(), err))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body =
				response.bytes().await.map_err(|err| TransportError::network(target, err))?;
			let mut response_new = HttpResponse::new(body.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Host + path of a request target; the query is left out so filters never reach error text.
fn describe_target(uri: &Uri) -> String {
	format!("{}{}", uri.host().unwrap_or_default(), uri.path())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn verbs_map_to_methods_and_body_rules() {
		assert_eq!(Verb::Get.method(), Method::GET);
		assert_eq!(Verb::Patch.method(), Method::PATCH);
		assert!(Verb::Post.carries_body());
		assert!(Verb::Patch.carries_body());
		assert!(!Verb::Get.carries_body());
		assert!(!Verb::Delete.carries_body());
		assert_eq!(Verb::Delete.to_string(), "DELETE");
	}

	#[test]
	fn target_description_omits_query() {
		let uri: Uri = "https://graph.windows.net/contoso/users?api-version=1.6&$filter=x"
			.parse()
			.expect("Test URI should parse.");

		assert_eq!(describe_target(&uri), "graph.windows.net/contoso/users");
	}
}
