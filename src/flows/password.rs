//! Resource-owner password validation against the directory's authority.
//!
//! The validator performs the `password` grant with the application's own credentials. A
//! successful grant proves the password; the subject is read from the `oid` claim of the
//! issued access token. Provider rejections are reported as data so the caller can answer
//! with `invalid_grant`.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::{
	_prelude::*,
	auth::{CredentialProvider, ObjectId, TokenSecret},
	config::DirectoryConfig,
	http::HttpTransport,
	oauth::TokenEndpoint,
};

/// Outcome of a password validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrantValidation {
	/// The credentials are valid; `subject` is the user's object identifier.
	Accepted {
		/// Directory object identifier of the user.
		subject: ObjectId,
	},
	/// The provider rejected the credentials.
	Rejected {
		/// Provider-supplied description.
		description: String,
	},
}

/// Validates resource-owner credentials through the token endpoint.
#[derive(Clone, Debug)]
pub struct PasswordGrantValidator {
	endpoint: TokenEndpoint,
}
impl PasswordGrantValidator {
	/// Wraps an existing token endpoint.
	pub fn new(endpoint: TokenEndpoint) -> Self {
		Self { endpoint }
	}

	/// Builds a validator that authenticates with the secret held by `credentials`.
	pub fn from_config(
		config: &DirectoryConfig,
		credentials: &dyn CredentialProvider,
		transport: Arc<dyn HttpTransport>,
	) -> Result<Self> {
		let endpoint = TokenEndpoint::new(
			&config.token_endpoint()?,
			&config.application_id,
			credentials.client_secret(),
			config.resource(),
			transport,
		)?;

		Ok(Self::new(endpoint))
	}

	/// Validates `username` / `password`.
	///
	/// `@` in the user name is replaced by `_`, matching the alias created for e-mail sign-in
	/// names.
	pub async fn validate(&self, username: &str, password: &TokenSecret) -> Result<GrantValidation> {
		let alias = username.replace('@', "_");

		match self.endpoint.password(&alias, password).await {
			Ok(credential) => Ok(GrantValidation::Accepted {
				subject: token_subject(&credential.access_token)?,
			}),
			Err(Error::InvalidGrant { reason }) =>
				Ok(GrantValidation::Rejected { description: reason }),
			Err(err) => Err(err),
		}
	}
}

#[derive(Deserialize)]
struct SubjectClaims {
	oid: String,
}

/// Reads the `oid` claim from a JWT access token without verifying its signature.
///
/// The token was just received from the authority over TLS; only the claim is needed.
pub fn token_subject(token: &TokenSecret) -> Result<ObjectId> {
	let payload = token.expose().split('.').nth(1).ok_or_else(|| invalid("not a JWT"))?;
	let bytes = URL_SAFE_NO_PAD
		.decode(payload.trim_end_matches('='))
		.map_err(|_| invalid("payload is not base64url"))?;
	let claims: SubjectClaims =
		serde_json::from_slice(&bytes).map_err(|_| invalid("payload has no oid claim"))?;

	ObjectId::new(claims.oid).map_err(|e| invalid(&e.to_string()))
}

fn invalid(reason: &str) -> Error {
	Error::InvalidIdentityToken { reason: reason.to_owned() }
}
