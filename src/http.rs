//! Transport primitives for REST calls.
//!
//! The executor only speaks [`HttpTransport`]: it hands over a fully built
//! [`TransportRequest`] and expects a [`TransportResponse`] for **every** status code. A
//! transport must never turn 4xx/5xx statuses into errors; [`TransportError`] is reserved for
//! calls that produced no response at all, so the classifier sees every status.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
	header::{CONTENT_TYPE, RETRY_AFTER},
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to perform one physical call.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// the executor and its retry tasks.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Performs the call and returns the response regardless of its status.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Client-agnostic outbound request.
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP verb.
	pub method: Method,
	/// Fully qualified URL including the query string.
	pub url: Url,
	/// Headers to send.
	pub headers: HeaderMap,
	/// Encoded body.
	pub body: RequestBody,
}
impl TransportRequest {
	/// Reads a header as UTF-8 text.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}
}

/// Encoded request body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RequestBody {
	/// No body.
	#[default]
	Empty,
	/// Serialized JSON document.
	Json(Vec<u8>),
	/// `multipart/form-data` parts in submission order.
	Multipart(Vec<MultipartPart>),
}

/// One `multipart/form-data` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultipartPart {
	/// Form field name.
	pub name: String,
	/// File name for file parts; `None` for plain fields.
	pub filename: Option<String>,
	/// Raw field contents.
	pub data: Vec<u8>,
}
impl MultipartPart {
	/// Builds a file part.
	pub fn file(name: impl Into<String>, filename: impl Into<String>, data: Vec<u8>) -> Self {
		Self { name: name.into(), filename: Some(filename.into()), data }
	}

	/// Builds a plain text field.
	pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), filename: None, data: value.into().into_bytes() }
	}
}

/// Response captured by a transport, whatever its status.
#[derive(Clone, Debug)]
pub struct TransportResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl TransportResponse {
	/// Creates an empty response with the given status.
	pub fn new(status: StatusCode) -> Self {
		Self { status, headers: HeaderMap::new(), body: Vec::new() }
	}

	/// Creates a JSON response with the given status.
	pub fn json(status: StatusCode, body: &Value) -> Self {
		Self::new(status)
			.with_header(CONTENT_TYPE.as_str(), "application/json")
			.with_body(body.to_string())
	}

	/// Adds a header; invalid names or values are skipped.
	pub fn with_header(mut self, name: &str, value: &str) -> Self {
		if let (Ok(name), Ok(value)) =
			(HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value))
		{
			self.headers.append(name, value);
		}

		self
	}

	/// Replaces the body.
	pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = body.into();

		self
	}

	/// Value of the `Content-Type` header, if present and valid UTF-8.
	pub fn content_type(&self) -> Option<&str> {
		self.headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
	}

	/// Canonical reason phrase for the status.
	pub fn reason_phrase(&self) -> &'static str {
		self.status.canonical_reason().unwrap_or("Unknown Status")
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// [`ReqwestTransport::new`] disables redirect following so 3xx statuses reach the
/// classifier; a custom client passed to [`ReqwestTransport::with_client`] should do the same.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a client that never follows redirects.
	pub fn new() -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let TransportRequest { method, url, headers, body } = request;
			let builder = client.request(method, url).headers(headers);
			let builder = match body {
				RequestBody::Empty => builder,
				RequestBody::Json(bytes) => builder.body(bytes),
				RequestBody::Multipart(parts) => builder.multipart(multipart_form(parts)),
			};
			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(TransportResponse { status, headers, body })
		})
	}
}

#[cfg(feature = "reqwest")]
fn multipart_form(parts: Vec<MultipartPart>) -> reqwest::multipart::Form {
	parts.into_iter().fold(reqwest::multipart::Form::new(), |form, part| {
		let MultipartPart { name, filename, data } = part;
		let field = reqwest::multipart::Part::bytes(data);
		let field = match filename {
			Some(filename) => field.file_name(filename),
			None => field,
		};

		form.part(name, field)
	})
}

/// Parses `Retry-After` as (fractional) seconds or an RFC 2822 date relative to now.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	parse_retry_after_at(headers, OffsetDateTime::now_utc())
}

pub(crate) fn parse_retry_after_at(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<f64>() {
		if secs.is_finite() && secs >= 0. && secs < i64::MAX as f64 {
			return Some(Duration::seconds_f64(secs));
		}

		return None;
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
