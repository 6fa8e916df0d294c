// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenSecret},
	config::{
		DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_AUTHORITY, DEFAULT_CREDENTIAL_MARGIN_SECS,
		DirectoryConfig,
	},
};

/// Errors raised while constructing or validating configurations.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DirectoryConfigError {
	/// Application identifier is required by every grant.
	#[error("Application identifier cannot be empty.")]
	EmptyApplicationId,
	/// API version is mandatory on every directory call.
	#[error("API version cannot be empty.")]
	EmptyApiVersion,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint cannot carry relative paths (e.g., `mailto:`).
	#[error("The {endpoint} endpoint cannot be used as a base URL: {url}.")]
	NotABase {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Credential margin must not extend validity.
	#[error("Credential margin cannot be negative.")]
	NegativeCredentialMargin,
}

/// Builder for [`DirectoryConfig`] values.
#[derive(Debug)]
pub struct DirectoryConfigBuilder {
	/// Tenant scoping every directory API path.
	pub tenant: TenantId,
	/// Application (client) identifier.
	pub application_id: String,
	/// Application secret.
	pub client_secret: TokenSecret,
	/// Optional authority override.
	pub authority: Option<Url>,
	/// Optional API base override.
	pub api_base: Option<Url>,
	/// Optional resource override.
	pub resource: Option<String>,
	/// Optional API version override.
	pub api_version: Option<String>,
	/// Optional credential margin override.
	pub credential_margin: Option<Duration>,
}
impl DirectoryConfigBuilder {
	/// Creates a new builder seeded with the application registration.
	pub fn new(
		tenant: TenantId,
		application_id: impl Into<String>,
		client_secret: impl Into<TokenSecret>,
	) -> Self {
		Self {
			tenant,
			application_id: application_id.into(),
			client_secret: client_secret.into(),
			authority: None,
			api_base: None,
			resource: None,
			api_version: None,
			credential_margin: None,
		}
	}

	/// Overrides the OAuth authority.
	pub fn authority(mut self, url: Url) -> Self {
		self.authority = Some(url);

		self
	}

	/// Overrides the directory API base.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the resource requested for application tokens.
	pub fn resource(mut self, resource: impl Into<String>) -> Self {
		self.resource = Some(resource.into());

		self
	}

	/// Overrides the `api-version` query value.
	pub fn api_version(mut self, version: impl Into<String>) -> Self {
		self.api_version = Some(version.into());

		self
	}

	/// Overrides the credential safety margin.
	pub fn credential_margin(mut self, margin: Duration) -> Self {
		self.credential_margin = Some(margin);

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<DirectoryConfig, DirectoryConfigError> {
		let authority = match self.authority {
			Some(url) => url,
			None => default_url(DEFAULT_AUTHORITY),
		};
		let api_base = match self.api_base {
			Some(url) => url,
			None => default_url(DEFAULT_API_BASE),
		};
		let config = DirectoryConfig {
			tenant: self.tenant,
			application_id: self.application_id,
			client_secret: self.client_secret,
			authority: normalize_base("authority", authority)?,
			api_base: normalize_base("api_base", api_base)?,
			resource: self.resource,
			api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.into()),
			credential_margin: self
				.credential_margin
				.unwrap_or(Duration::seconds(DEFAULT_CREDENTIAL_MARGIN_SECS)),
		};

		config.validate()?;

		Ok(config)
	}
}

impl DirectoryConfig {
	/// Validates invariants for the configuration.
	fn validate(&self) -> Result<(), DirectoryConfigError> {
		if self.application_id.trim().is_empty() {
			return Err(DirectoryConfigError::EmptyApplicationId);
		}
		if self.api_version.trim().is_empty() {
			return Err(DirectoryConfigError::EmptyApiVersion);
		}
		if self.credential_margin.is_negative() {
			return Err(DirectoryConfigError::NegativeCredentialMargin);
		}

		validate_endpoint("authority", &self.authority)?;
		validate_endpoint("api_base", &self.api_base)?;

		Ok(())
	}
}

fn default_url(raw: &'static str) -> Url {
	Url::parse(raw).unwrap_or_else(|_| unreachable!("Built-in endpoint constants are valid URLs."))
}

fn normalize_base(name: &'static str, mut url: Url) -> Result<Url, DirectoryConfigError> {
	if url.cannot_be_a_base() {
		return Err(DirectoryConfigError::NotABase { endpoint: name, url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	url.set_query(None);
	url.set_fragment(None);

	Ok(url)
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), DirectoryConfigError> {
	if url.scheme() == "https" || is_loopback(url) {
		Ok(())
	} else {
		Err(DirectoryConfigError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}
