//! Credential provider invoked before every directory call.
//!
//! [`CachedCredentialProvider`] keeps one application credential in an [`ExpiringCache`]. The
//! refresh function asks the issuer for a new credential and subtracts the configured safety
//! margin from its expiry, so the cache itself stays margin-agnostic.

// crates.io
use oauth2::http::header::{AUTHORIZATION, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::{CredentialIssuer, TokenSecret},
	cache::{CacheMetrics, CachedValue, Clock, ExpiringCache},
	error::ConfigError,
	http::HttpRequest,
	obs::{self, RefreshOutcome},
};

/// Boxed future returned by [`CredentialProvider::authenticate`].
pub type AuthenticateFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + 'a + Send>>;

/// Attaches application credentials to outbound requests.
pub trait CredentialProvider
where
	Self: 'static + Send + Sync,
{
	/// Sets `Authorization: Bearer <token>` on `request`, refreshing the credential if needed.
	fn authenticate<'a>(&'a self, request: &'a mut HttpRequest) -> AuthenticateFuture<'a>;

	/// Raw application secret, needed by grants that authenticate the client themselves.
	fn client_secret(&self) -> &TokenSecret;
}

/// [`CredentialProvider`] backed by a single-flight [`ExpiringCache`].
pub struct CachedCredentialProvider {
	cache: ExpiringCache<TokenSecret>,
	client_secret: TokenSecret,
}
impl CachedCredentialProvider {
	/// Creates a provider that refreshes through `issuer` and treats credentials as stale
	/// `margin` before their declared expiry.
	pub fn new(issuer: Arc<dyn CredentialIssuer>, client_secret: TokenSecret, margin: Duration) -> Self {
		let cache = ExpiringCache::new(move |_previous| {
			let issuer = issuer.clone();

			async move { refresh_credential(issuer.as_ref(), margin).await }
		});

		Self { cache, client_secret }
	}

	/// Replaces the clock used for expiry comparisons.
	pub fn with_clock(mut self, clock: Clock) -> Self {
		self.cache = self.cache.with_clock(clock);

		self
	}

	/// Returns the current access token, refreshing it first when stale.
	pub async fn access_token(&self) -> Result<TokenSecret> {
		self.cache.value().await
	}

	/// Drops the cached credential, e.g. after the directory API rejected it.
	pub async fn invalidate(&self) {
		self.cache.invalidate().await;
	}

	/// Cache counters (hits, refreshes, failures).
	pub fn metrics(&self) -> &CacheMetrics {
		self.cache.metrics()
	}
}
impl CredentialProvider for CachedCredentialProvider {
	fn authenticate<'a>(&'a self, request: &'a mut HttpRequest) -> AuthenticateFuture<'a> {
		Box::pin(async move {
			let token = self.access_token().await?;
			let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
				.map_err(ConfigError::from)?;

			value.set_sensitive(true);
			request.headers_mut().insert(AUTHORIZATION, value);

			Ok(())
		})
	}

	fn client_secret(&self) -> &TokenSecret {
		&self.client_secret
	}
}
impl Debug for CachedCredentialProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CachedCredentialProvider")
			.field("cache", &self.cache)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}

async fn refresh_credential(
	issuer: &dyn CredentialIssuer,
	margin: Duration,
) -> Result<CachedValue<TokenSecret>> {
	let refreshed = issuer.issue_credential().await.and_then(|credential| {
		let valid_until = credential
			.expires_at
			.checked_sub(margin)
			.ok_or(ConfigError::CredentialMarginOutOfRange)?;

		Ok(CachedValue::new(credential.access_token, valid_until))
	});

	match &refreshed {
		Ok(value) => {
			obs::record_credential_refresh(RefreshOutcome::Success);
			obs::log_credential_refresh(RefreshOutcome::Success, Some(value.valid_until));
		},
		Err(_) => {
			obs::record_credential_refresh(RefreshOutcome::Failure);
			obs::log_credential_refresh(RefreshOutcome::Failure, None);
		},
	}

	refreshed
}
