// std
#[cfg(feature = "tracing")] use std::borrow::Cow;
// self
use crate::{_prelude::*, http::Verb, obs::RefreshOutcome};

/// Top-level request body fields whose values never reach the logs.
#[cfg(feature = "tracing")]
const REDACTED_FIELDS: [&str; 2] = ["passwordProfile", "password"];

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// Span wrapping one pipeline call.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the verb and the tenant-relative path.
	pub fn new(verb: Verb, path: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("directory_broker.request", verb = verb.as_str(), path);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (verb, path);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the per-request line: method, URL and, for POST/PATCH, the JSON body with password
/// fields redacted.
pub fn log_outbound(verb: Verb, url: &str, body: Option<&str>) {
	#[cfg(feature = "tracing")]
	{
		match body {
			Some(body) if verb.carries_body() => {
				let body = redact_body(body);

				tracing::info!(
					method = verb.as_str(),
					url,
					body = %body,
					"sending directory request"
				)
			},
			_ => tracing::info!(method = verb.as_str(), url, "sending directory request"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (verb, url, body);
	}
}

/// Emits an error event for a response the caller cannot recover from.
pub fn log_fatal(verb: Verb, url: &str, status: u16, detail: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(method = verb.as_str(), url, status, detail, "directory request failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (verb, url, status, detail);
	}
}

/// Emits a debug event after a credential refresh attempt.
pub fn log_credential_refresh(outcome: RefreshOutcome, valid_until: Option<OffsetDateTime>) {
	#[cfg(feature = "tracing")]
	{
		match valid_until {
			Some(valid_until) => tracing::debug!(
				outcome = outcome.as_str(),
				valid_until = %valid_until,
				"credential refreshed"
			),
			None => tracing::debug!(outcome = outcome.as_str(), "credential refresh failed"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (outcome, valid_until);
	}
}

#[cfg(feature = "tracing")]
fn redact_body(body: &str) -> Cow<'_, str> {
	let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_str::<serde_json::Value>(body) else {
		return Cow::Borrowed(body);
	};
	let mut redacted = false;

	for name in REDACTED_FIELDS {
		if let Some(value) = fields.get_mut(name) {
			*value = serde_json::Value::String("<redacted>".into());
			redacted = true;
		}
	}

	if !redacted {
		return Cow::Borrowed(body);
	}

	match serde_json::to_string(&fields) {
		Ok(body) => Cow::Owned(body),
		Err(_) => Cow::Borrowed("<redacted>"),
	}
}
