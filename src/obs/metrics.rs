// self
use crate::{
	http::Verb,
	obs::{RefreshOutcome, RequestOutcome},
};

/// Records a pipeline outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(verb: Verb, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"directory_broker_request_total",
			"verb" => verb.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (verb, outcome);
	}
}

/// Records a credential refresh via the global metrics recorder (when enabled).
pub fn record_credential_refresh(outcome: RefreshOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"directory_broker_credential_refresh_total",
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}
