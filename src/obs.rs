//! Optional observability helpers for the request pipeline and credential cache.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit a `directory_broker.request` span per pipeline call (fields `verb`
//!   and `path`), an `info` event describing every outbound request, and `error` events for
//!   fatal or malformed responses.
//! - Enable `metrics` to increment `directory_broker_request_total` (labels `verb` + `outcome`)
//!   and `directory_broker_credential_refresh_total` (label `outcome`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each pipeline call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a pipeline call.
	Attempt,
	/// 2xx response with a usable body.
	Success,
	/// Non-2xx response normalized into data.
	UpstreamError,
	/// Error propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::UpstreamError => "upstream_error",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each credential refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshOutcome {
	/// The issuer produced a new credential.
	Success,
	/// The issuer call failed; the cache keeps its previous state.
	Failure,
}
impl RefreshOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RefreshOutcome::Success => "success",
			RefreshOutcome::Failure => "failure",
		}
	}
}
impl Display for RefreshOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
