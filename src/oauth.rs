//! Token endpoint facade built on the `oauth2` crate.
//!
//! [`TokenEndpoint`] performs the two grants the broker needs against the directory's
//! authority: `client_credentials` (application access for the directory API) and `password`
//! (resource-owner validation). Both run over the shared [`HttpTransport`] through
//! [`OAuthHttpHandle`] and post client credentials in the request body.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicErrorResponseType, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSecret},
	config::DirectoryConfig,
	error::{ConfigError, TransientError, TransportError},
	http::{HttpTransport, OAuthHttpHandle},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;
type FacadeTokenResponse = oauth2::basic::BasicTokenResponse;

/// Grant labels used in error messages and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
	/// Application-only access.
	ClientCredentials,
	/// Resource-owner password validation.
	Password,
}
impl Grant {
	/// Returns the OAuth `grant_type` value.
	pub const fn as_str(self) -> &'static str {
		match self {
			Grant::ClientCredentials => "client_credentials",
			Grant::Password => "password",
		}
	}
}
impl Display for Grant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Token endpoint client bound to one application registration and resource.
#[derive(Clone)]
pub struct TokenEndpoint {
	token_url: Url,
	oauth_client: ConfiguredBasicClient,
	http: OAuthHttpHandle,
	resource: String,
}
impl TokenEndpoint {
	/// Builds a client for `token_url` that requests tokens for `resource`.
	pub fn new(
		token_url: &Url,
		client_id: &str,
		client_secret: &TokenSecret,
		resource: impl Into<String>,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self> {
		let oauth_token_url = TokenUrl::new(token_url.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_token_uri(oauth_token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self {
			token_url: token_url.to_owned(),
			oauth_client,
			http: OAuthHttpHandle::new(transport),
			resource: resource.into(),
		})
	}

	/// Builds a client from the broker configuration.
	pub fn from_config(config: &DirectoryConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
		Self::new(
			&config.token_endpoint()?,
			&config.application_id,
			&config.client_secret,
			config.resource(),
			transport,
		)
	}

	/// Resource the issued tokens are scoped to.
	pub fn resource(&self) -> &str {
		&self.resource
	}

	/// Performs the `client_credentials` grant.
	pub async fn client_credentials(&self) -> Result<Credential> {
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.add_extra_param("resource", self.resource.as_str())
			.request_async(&self.http)
			.await
			.map_err(|err| map_request_error(Grant::ClientCredentials, err))?;

		map_token_response(response)
	}

	/// Performs the resource-owner `password` grant.
	pub async fn password(&self, username: &str, password: &TokenSecret) -> Result<Credential> {
		let username = ResourceOwnerUsername::new(username.to_owned());
		let password = ResourceOwnerPassword::new(password.expose().to_owned());
		let response = self
			.oauth_client
			.exchange_password(&username, &password)
			.add_extra_param("resource", self.resource.as_str())
			.request_async(&self.http)
			.await
			.map_err(|err| map_request_error(Grant::Password, err))?;

		map_token_response(response)
	}
}
impl Debug for TokenEndpoint {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenEndpoint")
			.field("token_url", &self.token_url.as_str())
			.field("resource", &self.resource)
			.finish()
	}
}

fn map_token_response(response: FacadeTokenResponse) -> Result<Credential> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	let issued_at = OffsetDateTime::now_utc();

	let expires_at = issued_at
		.checked_add(Duration::seconds(expires_in))
		.ok_or(ConfigError::ExpiresInOutOfRange)?;

	Ok(Credential::new(response.access_token().secret().to_owned(), expires_at))
}

fn map_request_error(
	grant: Grant,
	err: BasicRequestTokenError<HttpClientError<TransportError>>,
) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(grant, response),
		RequestTokenError::Request(error) => map_transport_error(grant, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::IssuerResponseParse { source: error }.into(),
		RequestTokenError::Other(message) => TransientError::Issuer {
			message: format!("{grant} grant failed: {message}"),
		}
		.into(),
	}
}

fn map_server_response_error(grant: Grant, response: BasicErrorResponse) -> Error {
	let reason = match response.error_description() {
		Some(description) => description.clone(),
		None => response.error().as_ref().to_owned(),
	};

	match response.error() {
		BasicErrorResponseType::InvalidGrant => Error::InvalidGrant { reason },
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
			Error::InvalidClient { reason },
		_ => TransientError::Issuer { message: format!("{grant} grant was refused: {reason}") }
			.into(),
	}
}

fn map_transport_error(grant: Grant, err: HttpClientError<TransportError>) -> Error {
	match err {
		HttpClientError::Reqwest(inner) => Error::Transport(*inner),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::Issuer {
			message: format!("HTTP client error during the {grant} grant: {message}"),
		}
		.into(),
		_ => TransientError::Issuer {
			message: format!("Unknown HTTP client error during the {grant} grant"),
		}
		.into(),
	}
}
