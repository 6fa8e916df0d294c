//! Authenticated request pipeline for the directory API.
//!
//! Every call resolves `api_base/<tenant><path>?api-version=<version>[&query]`, logs one line,
//! asks the [`CredentialProvider`] for a bearer header, sends through the [`HttpTransport`],
//! and classifies the response:
//!
//! - 2xx: the body is parsed as the expected payload (PATCH ignores it).
//! - non-2xx GET/POST/PATCH: returned as `Ok(Err(NormalizedError))`, never raised.
//! - non-2xx DELETE: raised as [`Error::FatalDelete`].
//!
//! The pipeline never retries and holds no lock; concurrent calls are independent.

mod response;

pub use response::*;

// crates.io
use oauth2::http::{
	Request, StatusCode,
	header::{ACCEPT, CONTENT_TYPE},
};
// self
#[cfg(feature = "reqwest")]
use crate::{
	auth::{CachedCredentialProvider, ClientCredentialsIssuer},
	http::ReqwestHttpClient,
};
use crate::{
	_prelude::*,
	auth::CredentialProvider,
	config::DirectoryConfig,
	error::ConfigError,
	http::{HttpTransport, Verb},
	obs::{self, RequestOutcome, RequestSpan},
};

/// Result of a GET/POST/PATCH call: the payload or the normalized upstream error.
pub type ApiResult<T> = std::result::Result<T, NormalizedError>;

const JSON: &str = "application/json";

/// Sends authenticated directory API calls and classifies their responses.
#[derive(Clone)]
pub struct RequestPipeline {
	config: Arc<DirectoryConfig>,
	transport: Arc<dyn HttpTransport>,
	credentials: Arc<dyn CredentialProvider>,
}
impl RequestPipeline {
	/// Builds a pipeline over a fresh reqwest transport and a cached client-credentials
	/// provider derived from `config`.
	#[cfg(feature = "reqwest")]
	pub fn new(config: DirectoryConfig) -> Result<Self> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Self::with_client(config, client)
	}

	/// Same as [`new`](Self::new) over a caller-supplied reqwest client (custom TLS roots,
	/// proxies, timeouts). The client should not follow redirects.
	#[cfg(feature = "reqwest")]
	pub fn with_client(config: DirectoryConfig, client: ReqwestClient) -> Result<Self> {
		let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestHttpClient::with_client(client));
		let issuer = ClientCredentialsIssuer::from_config(&config, transport.clone())?;
		let credentials = Arc::new(CachedCredentialProvider::new(
			Arc::new(issuer),
			config.client_secret.clone(),
			config.credential_margin,
		));

		Ok(Self::with_transport(Arc::new(config), transport, credentials))
	}

	/// Builds a pipeline from explicit collaborators.
	pub fn with_transport(
		config: Arc<DirectoryConfig>,
		transport: Arc<dyn HttpTransport>,
		credentials: Arc<dyn CredentialProvider>,
	) -> Self {
		Self { config, transport, credentials }
	}

	/// Configuration the pipeline resolves URLs against.
	pub fn config(&self) -> &DirectoryConfig {
		&self.config
	}

	/// Credential provider attached to every call.
	pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
		&self.credentials
	}

	/// Transport shared with token exchanges.
	pub fn transport(&self) -> &Arc<dyn HttpTransport> {
		&self.transport
	}

	/// Reads `path` and parses the 2xx body as `T`.
	pub async fn get<T>(&self, path: &str, query: Option<&str>) -> Result<ApiResult<T>>
	where
		T: DeserializeOwned,
	{
		self.call(Verb::Get, path, query, None).await
	}

	/// Posts the pre-serialized JSON `body` to `path` and parses the 2xx body as `T`.
	pub async fn post<T>(
		&self,
		path: &str,
		query: Option<&str>,
		body: Option<String>,
	) -> Result<ApiResult<T>>
	where
		T: DeserializeOwned,
	{
		self.call(Verb::Post, path, query, body).await
	}

	/// Patches `path` with the pre-serialized JSON `body`; any 2xx body is ignored.
	pub async fn patch(
		&self,
		path: &str,
		query: Option<&str>,
		body: Option<String>,
	) -> Result<ApiResult<()>> {
		let verb = Verb::Patch;
		let span = RequestSpan::new(verb, path);

		obs::record_request_outcome(verb, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response = self.execute(verb, path, query, body).await?;

				if response.status.is_success() {
					Ok(Ok(()))
				} else {
					Ok(Err(response.normalized()))
				}
			})
			.await;

		record_outcome(verb, &result);

		result
	}

	/// Deletes `path` and returns the 2xx body text.
	///
	/// Unlike the other verbs, a non-2xx response is a hard failure ([`Error::FatalDelete`]).
	pub async fn delete(&self, path: &str, query: Option<&str>) -> Result<String> {
		let verb = Verb::Delete;
		let span = RequestSpan::new(verb, path);

		obs::record_request_outcome(verb, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response = self.execute(verb, path, query, None).await?;
				let body = response.text();

				if response.status.is_success() {
					return Ok(body);
				}

				let status = response.status.as_u16();

				obs::log_fatal(verb, &response.url, status, &body);

				Err(Error::FatalDelete { url: response.url, status, body })
			})
			.await;

		match &result {
			Ok(_) => obs::record_request_outcome(verb, RequestOutcome::Success),
			Err(_) => obs::record_request_outcome(verb, RequestOutcome::Failure),
		}

		result
	}

	async fn call<T>(
		&self,
		verb: Verb,
		path: &str,
		query: Option<&str>,
		body: Option<String>,
	) -> Result<ApiResult<T>>
	where
		T: DeserializeOwned,
	{
		let span = RequestSpan::new(verb, path);

		obs::record_request_outcome(verb, RequestOutcome::Attempt);

		let result = span
			.instrument(async move {
				let response = self.execute(verb, path, query, body).await?;

				response.classify(verb)
			})
			.await;

		record_outcome(verb, &result);

		result
	}

	async fn execute(
		&self,
		verb: Verb,
		path: &str,
		query: Option<&str>,
		body: Option<String>,
	) -> Result<RawResponse> {
		let url = self.config.resource_url(path, query)?;

		obs::log_outbound(verb, url.as_str(), body.as_deref());

		let mut builder =
			Request::builder().method(verb.method()).uri(url.as_str()).header(ACCEPT, JSON);
		let payload = match body {
			Some(body) if verb.carries_body() => {
				builder = builder.header(CONTENT_TYPE, JSON);

				body.into_bytes()
			},
			_ => Vec::new(),
		};
		let mut request = builder.body(payload).map_err(ConfigError::from)?;

		self.credentials.authenticate(&mut request).await?;

		let response = self.transport.send(request).await?;
		let status = response.status();

		Ok(RawResponse { url: url.into(), status, body: response.into_body() })
	}
}
impl Debug for RequestPipeline {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestPipeline")
			.field("api_base", &self.config.api_base.as_str())
			.field("tenant", &self.config.tenant)
			.field("api_version", &self.config.api_version)
			.finish()
	}
}

struct RawResponse {
	url: String,
	status: StatusCode,
	body: Vec<u8>,
}
impl RawResponse {
	fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	fn normalized(&self) -> NormalizedError {
		NormalizedError::from_response(self.status.as_u16(), &self.text())
	}

	fn classify<T>(self, verb: Verb) -> Result<ApiResult<T>>
	where
		T: DeserializeOwned,
	{
		if !self.status.is_success() {
			return Ok(Err(self.normalized()));
		}

		match parse_success(&self.body) {
			Ok(value) => Ok(Ok(value)),
			Err(source) => {
				let status = self.status.as_u16();

				obs::log_fatal(verb, &self.url, status, &source.to_string());

				Err(Error::MalformedResponse { url: self.url, status, source })
			},
		}
	}
}

fn record_outcome<T>(verb: Verb, result: &Result<ApiResult<T>>) {
	let outcome = match result {
		Ok(Ok(_)) => RequestOutcome::Success,
		Ok(Err(_)) => RequestOutcome::UpstreamError,
		Err(_) => RequestOutcome::Failure,
	};

	obs::record_request_outcome(verb, outcome);
}
