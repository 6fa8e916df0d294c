//! Response classification: success payload parsing and the upstream error envelope.
//!
//! The directory API reports failures as
//! `{"odata.error":{"code":..,"message":{"value":..},"requestId":..,"values":[..]}}`. Anything
//! that does not match that shape (gateway pages, plain text, empty bodies) is kept verbatim in
//! [`NormalizedError::raw_body`].

// self
use crate::_prelude::*;

/// Item/value pair attached to some upstream errors (e.g., the offending property).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
	/// Name of the item the detail refers to.
	#[serde(default)]
	pub item: String,
	/// Detail value.
	#[serde(default)]
	pub value: String,
}

/// Uniform shape of every non-2xx GET/POST/PATCH response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
#[error("Directory API responded with status {status}: {message}")]
pub struct NormalizedError {
	/// HTTP status code.
	pub status: u16,
	/// Upstream error code (e.g., `Request_ResourceNotFound`), when the envelope parsed.
	pub code: Option<String>,
	/// Human-readable message; the raw body when the envelope did not parse.
	pub message: String,
	/// Upstream request identifier for support cases.
	pub request_id: Option<String>,
	/// Raw body, populated only when the envelope did not parse.
	pub raw_body: Option<String>,
	/// Additional item/value pairs reported by the upstream.
	pub details: Vec<ErrorDetail>,
}
impl NormalizedError {
	/// Normalizes a non-2xx response body.
	pub fn from_response(status: u16, body: &str) -> Self {
		match serde_json::from_str::<ErrorEnvelope>(body) {
			Ok(ErrorEnvelope { error }) => Self {
				status,
				code: error.code,
				message: error.message.value,
				request_id: error.request_id,
				raw_body: None,
				details: error.values.unwrap_or_default(),
			},
			Err(_) => Self {
				status,
				code: None,
				message: if body.trim().is_empty() {
					format!("HTTP {status}")
				} else {
					body.to_owned()
				},
				request_id: None,
				raw_body: Some(body.to_owned()),
				details: Vec::new(),
			},
		}
	}

	/// Returns `true` if the upstream reported a missing resource.
	pub fn is_not_found(&self) -> bool {
		self.status == 404 || self.code.as_deref() == Some("Request_ResourceNotFound")
	}
}

#[derive(Deserialize)]
struct ErrorEnvelope {
	#[serde(rename = "odata.error")]
	error: ODataError,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ODataError {
	#[serde(default)]
	code: Option<String>,
	message: ODataMessage,
	#[serde(default)]
	request_id: Option<String>,
	#[serde(default)]
	values: Option<Vec<ErrorDetail>>,
}

#[derive(Deserialize)]
struct ODataMessage {
	value: String,
}

/// Parses a 2xx body as `T`; an empty body is a parse error like any other malformed body.
pub(crate) fn parse_success<T>(body: &[u8]) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}
