//! Crate-level error types shared by the executor, transport, and request builder.

// std
use std::path::PathBuf;
// self
use crate::{_prelude::*, auth::IdentifierError, classify::DecodeError};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Terminal error delivered to the caller of a request.
///
/// Rate limits (429) and retryable server errors never appear here unless the server errors
/// outlast the configured retry ceiling, in which case [`Error::MaxRetries`] is produced.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration or request construction problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// No response was obtained (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The response body was HTML or not valid JSON.
	#[error(transparent)]
	InvalidResponse(#[from] DecodeError),
	/// The remote service rejected the request with a permanent 4xx status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Server errors persisted past the configured retry ceiling.
	#[error("Maximum retry of {max} reached - giving up.")]
	MaxRetries {
		/// Configured retry ceiling.
		max: u32,
	},
	/// Status outside every handled class (informational or redirect responses).
	#[error("Unexpected HTTP status {status}: {reason}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
		/// Canonical reason phrase for the status.
		reason: String,
	},
	/// The caller cancelled the pending result before it resolved.
	#[error("Request was cancelled before it completed.")]
	Cancelled,
	/// A decoded payload did not match the requested type.
	#[error("Response payload does not match the expected type at `{}`.", .source.path())]
	Deserialize {
		/// Structured deserialization failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Configuration and request construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL and route do not form a valid URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// The URL that failed to parse.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeader {
		/// Header name.
		name: &'static str,
		/// Underlying validation failure.
		#[source]
		source: ::http::header::InvalidHeaderValue,
	},
	/// An attachment path could not be read.
	#[error("Attachment `{}` could not be read.", .path.display())]
	AttachmentRead {
		/// Attachment path.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// JSON encoding or configuration parsing failed.
	#[error("JSON document could not be processed.")]
	Json(#[from] serde_json::Error),
	/// An identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),
	/// The operation needs a token-bound webhook.
	#[error("Webhook `{id}` has no token and cannot be executed.")]
	WebhookTokenRequired {
		/// Webhook identifier.
		id: String,
	},
	/// A webhook edit carried no fields.
	#[error("Webhook edits require at least one field.")]
	EmptyWebhookEdit,
	/// The configured retry delay is negative or not a number.
	#[error("Request error delay must be a non-negative number of seconds.")]
	InvalidErrorDelay,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures where no response was obtained.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred before a response was received.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred before a response was received.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Permanent client error (4xx other than 429) returned by the remote API.
#[derive(Clone, Debug, ThisError)]
#[error("{route} responded with HTTP {status}: {message}")]
pub struct ApiError {
	/// Route the request targeted.
	pub route: String,
	/// HTTP status code.
	pub status: u16,
	/// Remote error code, when the body carried one.
	pub code: Option<i64>,
	/// Human-readable message, including flattened field errors.
	pub message: String,
	/// Full decoded error body.
	pub body: Value,
}
impl ApiError {
	/// Builds an error from the decoded response body.
	///
	/// Field-level errors nested under `errors` are flattened into the message as
	/// `path: message` entries.
	pub fn from_body(route: impl Into<String>, status: u16, body: Value) -> Self {
		let code = body.get("code").and_then(Value::as_i64);
		let mut message = body
			.get("message")
			.and_then(Value::as_str)
			.map(ToOwned::to_owned)
			.unwrap_or_else(|| format!("HTTP {status}"));
		let mut details = Vec::new();

		if let Some(errors) = body.get("errors") {
			flatten_field_errors(errors, "", &mut details);
		}
		if !details.is_empty() {
			message.push('\n');
			message.push_str(&details.join("\n"));
		}

		Self { route: route.into(), status, code, message, body }
	}
}

fn flatten_field_errors(node: &Value, path: &str, out: &mut Vec<String>) {
	let Some(map) = node.as_object() else { return };

	for (key, value) in map {
		if key == "_errors" {
			for entry in value.as_array().into_iter().flatten() {
				if let Some(text) = entry.get("message").and_then(Value::as_str) {
					out.push(format!("{path}: {text}"));
				}
			}

			continue;
		}

		let nested = if path.is_empty() { key.to_owned() } else { format!("{path}.{key}") };

		flatten_field_errors(value, &nested, out);
	}
}
