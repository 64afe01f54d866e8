//! Immutable request descriptors and their translation into transport requests.
//!
//! A [`RequestDescriptor`] names one logical call: verb, route, and options. The route is
//! stored without its leading slash and doubles as the rate-limit bucket source, so the same
//! descriptor can be rebuilt into a fresh [`TransportRequest`] on every retry.

pub mod attachment;

pub use attachment::*;

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method,
	header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::ConfigError,
	http::{MultipartPart, RequestBody, TransportRequest},
};

/// Header asking the remote API for millisecond rate-limit resets.
pub const RATE_LIMIT_PRECISION: &str = "x-ratelimit-precision";
/// Header carrying the audit log reason.
pub const AUDIT_LOG_REASON: &str = "x-audit-log-reason";
/// Multipart field carrying the JSON body when files are attached.
pub const PAYLOAD_JSON_FIELD: &str = "payload_json";

/// RFC 3986 unreserved characters stay literal; everything else is percent-encoded.
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Verbs the remote API accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl RequestMethod {
	/// Returns the upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}

	/// Converts into the transport verb.
	pub fn to_http(self) -> Method {
		match self {
			Self::Get => Method::GET,
			Self::Post => Method::POST,
			Self::Put => Method::PUT,
			Self::Patch => Method::PATCH,
			Self::Delete => Method::DELETE,
		}
	}
}
impl Display for RequestMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Immutable description of one logical API call.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
	/// HTTP verb.
	pub method: RequestMethod,
	/// Endpoint path relative to the versioned base, without a leading slash.
	pub route: String,
	/// JSON payload; carried as `payload_json` when files are attached.
	pub body: Option<Value>,
	/// Files sent as `multipart/form-data` parts, in order.
	pub files: Vec<FileAttachment>,
	/// Query pairs, in order.
	pub query: Vec<(String, String)>,
	/// Verbatim `Authorization` value taking precedence over the ambient token.
	pub auth_override: Option<String>,
	/// Suppresses the ambient `Bot` credential.
	pub no_auth: bool,
	/// Audit log reason; trimmed and percent-encoded on send.
	pub audit_reason: Option<String>,
	/// Marks routes governed by the tighter reaction rate limit.
	pub reaction: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor; a leading `/` on `route` is stripped.
	pub fn new(method: RequestMethod, route: impl AsRef<str>) -> Self {
		Self {
			method,
			route: route.as_ref().trim_start_matches('/').to_owned(),
			body: None,
			files: Vec::new(),
			query: Vec::new(),
			auth_override: None,
			no_auth: false,
			audit_reason: None,
			reaction: false,
		}
	}

	/// `GET route`.
	pub fn get(route: impl AsRef<str>) -> Self {
		Self::new(RequestMethod::Get, route)
	}

	/// `POST route`.
	pub fn post(route: impl AsRef<str>) -> Self {
		Self::new(RequestMethod::Post, route)
	}

	/// `PUT route`.
	pub fn put(route: impl AsRef<str>) -> Self {
		Self::new(RequestMethod::Put, route)
	}

	/// `PATCH route`.
	pub fn patch(route: impl AsRef<str>) -> Self {
		Self::new(RequestMethod::Patch, route)
	}

	/// `DELETE route`.
	pub fn delete(route: impl AsRef<str>) -> Self {
		Self::new(RequestMethod::Delete, route)
	}

	/// Sets the JSON payload.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends a file attachment.
	pub fn with_file(mut self, file: FileAttachment) -> Self {
		self.files.push(file);

		self
	}

	/// Appends several file attachments.
	pub fn with_files(mut self, files: impl IntoIterator<Item = FileAttachment>) -> Self {
		self.files.extend(files);

		self
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sends `value` as the `Authorization` header instead of the ambient token.
	pub fn with_auth_override(mut self, value: impl Into<String>) -> Self {
		self.auth_override = Some(value.into());

		self
	}

	/// Omits the ambient `Bot` credential.
	pub fn without_auth(mut self) -> Self {
		self.no_auth = true;

		self
	}

	/// Attaches an audit log reason.
	pub fn with_audit_reason(mut self, reason: impl Into<String>) -> Self {
		self.audit_reason = Some(reason.into());

		self
	}

	/// Marks the route as a reaction endpoint.
	pub fn reaction_endpoint(mut self) -> Self {
		self.reaction = true;

		self
	}

	/// Whether the route falls under the reaction rate-limit class.
	pub fn is_reaction_endpoint(&self) -> bool {
		self.reaction
	}

	/// Builds the transport request for one physical attempt.
	pub fn build(&self, config: &ClientConfig) -> Result<TransportRequest, ConfigError> {
		let mut headers = HeaderMap::new();

		headers.insert(
			HeaderName::from_static(RATE_LIMIT_PRECISION),
			HeaderValue::from_static("millisecond"),
		);
		headers.insert(USER_AGENT, header_value("User-Agent", &config.user_agent)?);

		if let Some(auth) = self.authorization(config) {
			headers.insert(AUTHORIZATION, header_value("Authorization", &auth)?);
		}

		let body = self.encode_body(&mut headers)?;

		if let Some(reason) = self.encoded_audit_reason() {
			headers.insert(
				HeaderName::from_static(AUDIT_LOG_REASON),
				header_value("X-Audit-Log-Reason", &reason)?,
			);
		}

		Ok(TransportRequest { method: self.method.to_http(), url: self.url(config)?, headers, body })
	}

	/// Target URL: base + `v{version}/` + route + query.
	pub fn url(&self, config: &ClientConfig) -> Result<Url, ConfigError> {
		let base = config.api_base.trim_end_matches('/');
		let raw = format!("{base}/v{}/{}", config.api_version, self.route);
		let mut url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidUrl { url: raw.clone(), source })?;

		if let Some(query) = self.query_string() {
			url.set_query(Some(&query));
		}

		Ok(url)
	}

	/// RFC 3986 query string preserving pair order, or `None` without pairs.
	pub fn query_string(&self) -> Option<String> {
		if self.query.is_empty() {
			return None;
		}

		let pairs = self
			.query
			.iter()
			.map(|(key, value)| format!("{}={}", rfc3986(key), rfc3986(value)))
			.collect::<Vec<_>>();

		Some(pairs.join("&"))
	}

	fn authorization(&self, config: &ClientConfig) -> Option<String> {
		if let Some(auth) = self.auth_override.as_deref().filter(|auth| !auth.is_empty()) {
			return Some(auth.to_owned());
		}
		if self.no_auth {
			return None;
		}

		config.token.as_ref().map(|token| token.authorization())
	}

	fn encoded_audit_reason(&self) -> Option<String> {
		let reason = self.audit_reason.as_deref()?.trim();

		(!reason.is_empty()).then(|| rfc3986(reason))
	}

	fn encode_body(&self, headers: &mut HeaderMap) -> Result<RequestBody, ConfigError> {
		let body = self.body.as_ref().filter(|body| !is_empty_body(body));

		if !self.files.is_empty() {
			let mut parts = self.files.iter().map(FileAttachment::to_part).collect::<Vec<_>>();

			if let Some(body) = body {
				parts.push(MultipartPart::text(PAYLOAD_JSON_FIELD, serde_json::to_string(body)?));
			}

			return Ok(RequestBody::Multipart(parts));
		}

		match body {
			Some(body) => {
				headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

				Ok(RequestBody::Json(serde_json::to_vec(body)?))
			},
			None => Ok(RequestBody::Empty),
		}
	}
}

// `null`, `[]` and `{}` carry nothing worth sending.
fn is_empty_body(body: &Value) -> bool {
	match body {
		Value::Null => true,
		Value::Array(items) => items.is_empty(),
		Value::Object(fields) => fields.is_empty(),
		_ => false,
	}
}

fn rfc3986(raw: &str) -> String {
	utf8_percent_encode(raw, RFC3986).to_string()
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
	HeaderValue::from_str(value).map_err(|source| ConfigError::InvalidHeader { name, source })
}
