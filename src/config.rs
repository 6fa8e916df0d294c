//! Directory endpoints, application credentials, and API version injected into the broker.
//!
//! Nothing here reads the process environment: hosts build a [`DirectoryConfig`] through
//! [`DirectoryConfig::builder`] or parse one with [`DirectoryConfig::from_json`], then hand it
//! to the pipeline and issuers.

/// Builder API for assembling configurations.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::{TenantId, TokenSecret},
	error::ConfigError,
};

/// Default OAuth authority hosting `<tenant>/oauth2/token`.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/";
/// Default directory API base.
pub const DEFAULT_API_BASE: &str = "https://graph.windows.net/";
/// Default `api-version` query value.
pub const DEFAULT_API_VERSION: &str = "1.6";
/// Default safety margin subtracted from credential expiry, in seconds.
pub const DEFAULT_CREDENTIAL_MARGIN_SECS: i64 = 300;

/// Validated broker configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryConfig {
	/// Tenant scoping every directory API path.
	pub tenant: TenantId,
	/// Application (client) identifier registered in the tenant.
	pub application_id: String,
	/// Application secret used by the token grants.
	pub client_secret: TokenSecret,
	/// OAuth authority; always ends with `/`.
	pub authority: Url,
	/// Directory API base; always ends with `/`.
	pub api_base: Url,
	/// Resource requested for application tokens; `None` means the API base.
	pub resource: Option<String>,
	/// Value of the `api-version` query parameter.
	pub api_version: String,
	/// Time subtracted from credential expiry before the cached credential is considered stale.
	pub credential_margin: Duration,
}
impl DirectoryConfig {
	/// Creates a builder seeded with the mandatory application registration fields.
	pub fn builder(
		tenant: TenantId,
		application_id: impl Into<String>,
		client_secret: impl Into<TokenSecret>,
	) -> DirectoryConfigBuilder {
		DirectoryConfigBuilder::new(tenant, application_id, client_secret)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(document: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(document);
		let document: DirectoryConfigDocument =
			serde_path_to_error::deserialize(&mut deserializer)?;
		let mut builder =
			Self::builder(document.tenant, document.application_id, document.client_secret);

		if let Some(authority) = document.authority {
			builder = builder.authority(authority);
		}
		if let Some(api_base) = document.api_base {
			builder = builder.api_base(api_base);
		}
		if let Some(resource) = document.resource {
			builder = builder.resource(resource);
		}
		if let Some(api_version) = document.api_version {
			builder = builder.api_version(api_version);
		}
		if let Some(secs) = document.credential_margin_secs {
			builder = builder.credential_margin(Duration::seconds(secs));
		}

		Ok(builder.build()?)
	}

	/// Resource requested for application tokens.
	pub fn resource(&self) -> &str {
		self.resource.as_deref().unwrap_or(self.api_base.as_str())
	}

	/// Token endpoint: `<authority><tenant>/oauth2/token`.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		self.authority
			.join(&format!("{}/oauth2/token", self.tenant))
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "token", source })
	}

	/// Absolute directory API URL for `path` with the version and optional extra query.
	///
	/// `query` may carry a leading `?`; it is stripped before being appended after
	/// `api-version`.
	pub fn resource_url(&self, path: &str, query: Option<&str>) -> Result<Url, ConfigError> {
		let separator = if path.starts_with('/') { "" } else { "/" };
		let mut raw = format!(
			"{}{}{separator}{path}?api-version={}",
			self.api_base, self.tenant, self.api_version
		);

		if let Some(query) = query.map(|q| q.trim_start_matches('?')).filter(|q| !q.is_empty()) {
			raw.push('&');
			raw.push_str(query);
		}

		Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "directory", source })
	}
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectoryConfigDocument {
	tenant: TenantId,
	application_id: String,
	client_secret: TokenSecret,
	#[serde(default)]
	authority: Option<Url>,
	#[serde(default)]
	api_base: Option<Url>,
	#[serde(default)]
	resource: Option<String>,
	#[serde(default)]
	api_version: Option<String>,
	#[serde(default)]
	credential_margin_secs: Option<i64>,
}
