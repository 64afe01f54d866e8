//! Response classification and body decoding.
//!
//! [`ResponseClass::of_status`] is a pure mapping from HTTP status to the executor's branch;
//! [`decode_body`] turns a raw response into JSON, refusing HTML pages (proxy failures,
//! maintenance screens) even on success statuses.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, http::TransportResponse};

/// Class of a response (or of its absence) as seen by the executor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseClass {
	/// 2xx other than 204; the decoded body is the result.
	Success,
	/// 204; the result is empty.
	EmptyBody,
	/// 429; re-admitted at the front of the queue without touching the retry budget.
	RateLimited,
	/// 5xx; retried after a delay until the retry ceiling is exceeded.
	RetryableServerError,
	/// 4xx other than 429; terminal.
	PermanentClientError,
	/// Informational and redirect statuses; terminal with the reason phrase.
	Unexpected,
	/// No response was obtained.
	TransportError,
}
impl ResponseClass {
	/// Maps an HTTP status code to its class.
	pub const fn of_status(status: u16) -> Self {
		match status {
			204 => Self::EmptyBody,
			200..=299 => Self::Success,
			429 => Self::RateLimited,
			500.. => Self::RetryableServerError,
			400..=499 => Self::PermanentClientError,
			_ => Self::Unexpected,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::EmptyBody => "empty_body",
			Self::RateLimited => "rate_limited",
			Self::RetryableServerError => "retryable_server_error",
			Self::PermanentClientError => "permanent_client_error",
			Self::Unexpected => "unexpected",
			Self::TransportError => "transport_error",
		}
	}
}
impl Display for ResponseClass {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Classification result carrying the status and decoded payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseOutcome {
	/// HTTP status, absent when no response was obtained.
	pub status: Option<u16>,
	/// Decoded payload; `None` for 204 and transport failures.
	pub payload: Option<Value>,
	/// Response class.
	pub class: ResponseClass,
}
impl ResponseOutcome {
	/// Classifies a response and decodes its body (skipped for 204).
	pub fn classify(
		response: &TransportResponse,
		options: &DecodeOptions,
	) -> Result<Self, DecodeError> {
		let status = response.status.as_u16();
		let class = ResponseClass::of_status(status);
		let payload = match class {
			ResponseClass::EmptyBody => None,
			_ => Some(decode_body(response, options)?),
		};

		Ok(Self { status: Some(status), payload, class })
	}

	/// Outcome for a call that never produced a response.
	pub fn no_response() -> Self {
		Self { status: None, payload: None, class: ResponseClass::TransportError }
	}
}

/// Explicit decode strictness threaded from [`ClientConfig`](crate::config::ClientConfig).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
	/// Reject bodies whose content type announces HTML.
	pub reject_html: bool,
	/// Decode an empty (or whitespace-only) body as JSON `null` instead of failing.
	pub empty_as_null: bool,
}
impl Default for DecodeOptions {
	fn default() -> Self {
		Self { reject_html: true, empty_as_null: true }
	}
}

/// Body decoding failures.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// The content type announced an HTML page.
	#[error("Invalid API response: HTML response body received.")]
	Html,
	/// The body was not valid JSON.
	#[error("Invalid API response: malformed JSON payload.")]
	Malformed {
		/// Underlying parse failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Successful result delivered to the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum ApiResponse {
	/// 204 No Content.
	Empty,
	/// Decoded JSON payload (possibly `null`).
	Json(Value),
}
impl ApiResponse {
	/// Whether the response carried no content.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// Borrows the decoded payload, if any.
	pub fn as_json(&self) -> Option<&Value> {
		match self {
			Self::Empty => None,
			Self::Json(value) => Some(value),
		}
	}

	/// Returns the payload, mapping an empty response to `null`.
	pub fn into_json(self) -> Value {
		match self {
			Self::Empty => Value::Null,
			Self::Json(value) => value,
		}
	}

	/// Deserializes the payload into `T`, reporting the JSON path on mismatch.
	pub fn deserialize<T>(self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(self.into_json())
			.map_err(|source| Error::Deserialize { source })
	}
}

/// Decodes a response body according to `options`.
pub fn decode_body(
	response: &TransportResponse,
	options: &DecodeOptions,
) -> Result<Value, DecodeError> {
	if options.reject_html && response.content_type().is_some_and(is_html) {
		return Err(DecodeError::Html);
	}

	let raw = response.body.as_slice();

	if options.empty_as_null && raw.trim_ascii().is_empty() {
		return Ok(Value::Null);
	}

	serde_json::from_slice(raw).map_err(|source| DecodeError::Malformed { source })
}

fn is_html(content_type: &str) -> bool {
	content_type.to_ascii_lowercase().contains("text/html")
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::StatusCode;
	use serde_json::json;
	// self
	use super::*;

	fn response(status: u16, content_type: &str, body: &str) -> TransportResponse {
		TransportResponse::new(StatusCode::from_u16(status).expect("Fixture status is valid."))
			.with_header("content-type", content_type)
			.with_body(body)
	}

	#[test]
	fn statuses_map_to_classes() {
		assert_eq!(ResponseClass::of_status(200), ResponseClass::Success);
		assert_eq!(ResponseClass::of_status(201), ResponseClass::Success);
		assert_eq!(ResponseClass::of_status(204), ResponseClass::EmptyBody);
		assert_eq!(ResponseClass::of_status(304), ResponseClass::Unexpected);
		assert_eq!(ResponseClass::of_status(400), ResponseClass::PermanentClientError);
		assert_eq!(ResponseClass::of_status(429), ResponseClass::RateLimited);
		assert_eq!(ResponseClass::of_status(499), ResponseClass::PermanentClientError);
		assert_eq!(ResponseClass::of_status(500), ResponseClass::RetryableServerError);
		assert_eq!(ResponseClass::of_status(503), ResponseClass::RetryableServerError);
	}

	#[test]
	fn html_is_rejected_on_every_status() {
		for status in [200, 404, 502] {
			let err = decode_body(
				&response(status, "text/html; charset=UTF-8", "<html></html>"),
				&DecodeOptions::default(),
			)
			.expect_err("HTML bodies must be rejected.");

			assert!(matches!(err, DecodeError::Html));
		}
	}

	#[test]
	fn null_literal_is_a_valid_payload() {
		let value = decode_body(&response(200, "application/json", "null"), &Default::default())
			.expect("A null literal should decode.");

		assert_eq!(value, Value::Null);
	}

	#[test]
	fn malformed_payloads_fail() {
		let err = decode_body(&response(200, "application/json", "{\"id\":"), &Default::default())
			.expect_err("Truncated JSON must fail.");

		assert!(matches!(err, DecodeError::Malformed { .. }));
	}

	#[test]
	fn empty_bodies_follow_options() {
		let empty = response(200, "application/json", "  ");

		assert_eq!(
			decode_body(&empty, &DecodeOptions::default()).expect("Empty decodes as null."),
			Value::Null
		);
		assert!(
			decode_body(&empty, &DecodeOptions { empty_as_null: false, ..Default::default() })
				.is_err()
		);
	}

	#[test]
	fn outcome_skips_body_for_no_content() {
		let outcome = ResponseOutcome::classify(
			&response(204, "text/html", "<html>ignored</html>"),
			&DecodeOptions::default(),
		)
		.expect("204 responses are never decoded.");

		assert_eq!(outcome.class, ResponseClass::EmptyBody);
		assert_eq!(outcome.payload, None);
		assert_eq!(ResponseOutcome::no_response().status, None);
	}

	#[test]
	fn typed_deserialization_reports_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Message {
			id: String,
			author: Author,
		}
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Author {
			id: String,
		}

		let err = ApiResponse::Json(json!({ "id": "9", "author": { "id": 1 } }))
			.deserialize::<Message>()
			.expect_err("Numeric author id should not deserialize into a string.");

		assert!(err.to_string().contains("author.id"));
	}
}
