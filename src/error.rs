//! Broker-level error types shared by the credential cache, pipeline, and stores.

// self
use crate::{_prelude::*, pipeline::NormalizedError};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// Upstream rejections of GET/POST/PATCH calls are *not* represented here by default; the
/// pipeline returns them as [`NormalizedError`] data. [`Error::Upstream`] only appears when a
/// consumer escalates such a value with `?`.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary issuer failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Normalized upstream rejection escalated by a consumer.
	#[error(transparent)]
	Upstream(#[from] NormalizedError),

	/// The directory API rejected a deletion.
	#[error("Directory API rejected DELETE {url} with status {status}: {body}")]
	FatalDelete {
		/// Absolute request URL.
		url: String,
		/// HTTP status code returned by the directory API.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// A successful response carried a body that does not match the expected payload.
	#[error("Directory API returned a malformed {status} response for {url}.")]
	MalformedResponse {
		/// Absolute request URL.
		url: String,
		/// HTTP status code returned by the directory API.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Provider rejected the grant (e.g., bad resource owner credentials).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider- or broker-supplied reason string.
		reason: String,
	},
	/// An access token issued by the provider could not be inspected.
	#[error("Issued access token is not usable: {reason}.")]
	InvalidIdentityToken {
		/// Broker-supplied reason string.
		reason: String,
	},
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A bearer token cannot be encoded as a header value.
	#[error("Access token contains characters that are not valid in a header.")]
	InvalidHeaderValue(#[from] oauth2::http::header::InvalidHeaderValue),
	/// A configured endpoint cannot be turned into a request URL.
	#[error("Configured {endpoint} URL is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Configuration document could not be parsed.
	#[error("Configuration document is invalid.")]
	Parse(#[from] serde_path_to_error::Error<serde_json::Error>),
	/// Configuration failed validation.
	#[error(transparent)]
	Invalid(#[from] crate::config::DirectoryConfigError),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Credential expiry minus the configured margin is not a representable instant.
	#[error("The credential margin moves the expiry out of the supported range.")]
	CredentialMarginOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Credential issuer returned an unexpected but non-fatal response.
	#[error("Credential issuer returned an unexpected response: {message}.")]
	Issuer {
		/// Provider- or broker-supplied message summarizing the failure.
		message: String,
	},
	/// Credential issuer responded with malformed JSON that could not be parsed.
	#[error("Credential issuer returned malformed JSON.")]
	IssuerResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {target}.")]
	Network {
		/// Host or endpoint being contacted.
		target: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error raised while contacting `target`.
	pub fn network(
		target: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { target: target.into(), source: Box::new(src) }
	}
}
