//! Bearer credentials and the issuers that mint them.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::DirectoryConfig,
	http::HttpTransport,
	oauth::TokenEndpoint,
};

/// Boxed future returned by [`CredentialIssuer::issue_credential`].
pub type IssuerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Opaque bearer token plus its absolute expiry as reported by the issuer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	/// Bearer token presented to the directory API.
	pub access_token: TokenSecret,
	/// Instant the issuer declared the token expired (no safety margin applied).
	pub expires_at: OffsetDateTime,
}
impl Credential {
	/// Creates a credential from a raw token and its expiry.
	pub fn new(access_token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at }
	}
}

/// Source of fresh application credentials.
pub trait CredentialIssuer
where
	Self: 'static + Send + Sync,
{
	/// Requests a new credential from the authority.
	fn issue_credential(&self) -> IssuerFuture<'_, Credential>;
}

/// Issues application credentials through the OAuth `client_credentials` grant.
#[derive(Clone, Debug)]
pub struct ClientCredentialsIssuer {
	endpoint: TokenEndpoint,
}
impl ClientCredentialsIssuer {
	/// Wraps an existing token endpoint.
	pub fn new(endpoint: TokenEndpoint) -> Self {
		Self { endpoint }
	}

	/// Builds the issuer from the broker configuration.
	pub fn from_config(config: &DirectoryConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
		Ok(Self::new(TokenEndpoint::from_config(config, transport)?))
	}

	/// Token endpoint used for the grant.
	pub fn endpoint(&self) -> &TokenEndpoint {
		&self.endpoint
	}
}
impl CredentialIssuer for ClientCredentialsIssuer {
	fn issue_credential(&self) -> IssuerFuture<'_, Credential> {
		Box::pin(self.endpoint.client_credentials())
	}
}
