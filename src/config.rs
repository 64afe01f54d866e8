//! Client configuration consumed by the request builder, classifier and executor.
//!
//! The retry ceiling and delay drive the server-error protocol. [`DecodeOptions`] is passed to
//! the body decoder for each response.

// self
use crate::{_prelude::*, auth::BotToken, classify::DecodeOptions, error::ConfigError};

/// Default REST base (without the version segment).
pub const DEFAULT_API_BASE: &str = "https://discord.com/api";
/// Default REST API version appended as `v{version}/`.
pub const DEFAULT_API_VERSION: u8 = 10;
/// Default delay before re-admitting a request that hit a server error.
pub const DEFAULT_REQUEST_ERROR_DELAY: Duration = Duration::seconds(30);

/// Settings shared by every request a client sends.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// REST base URL without the version segment.
	pub api_base: String,
	/// API version rendered as `v{api_version}/` between base and route.
	pub api_version: u8,
	/// Value of the `User-Agent` header.
	pub user_agent: String,
	/// Ambient bot credential; never serialized.
	#[serde(skip_serializing)]
	pub token: Option<BotToken>,
	/// Server-error retry ceiling; `0` retries without bound.
	pub request_max_retries: u32,
	/// Base delay before re-admitting a request after a server error, in seconds.
	#[serde(with = "duration_secs")]
	pub request_error_delay: Duration,
	/// Strictness switches applied when decoding response bodies.
	pub decode: DecodeOptions,
}
impl ClientConfig {
	/// Parses a JSON configuration document; missing fields take their defaults.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(raw)?;

		if config.request_error_delay.is_negative() {
			return Err(ConfigError::InvalidErrorDelay);
		}

		Ok(config)
	}

	/// Sets the ambient bot token.
	pub fn with_token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(BotToken::new(token));

		self
	}

	/// Overrides the REST base URL.
	pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
		self.api_base = base.into();

		self
	}

	/// Overrides the API version segment.
	pub fn with_api_version(mut self, version: u8) -> Self {
		self.api_version = version;

		self
	}

	/// Overrides the `User-Agent` header.
	pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
		self.user_agent = user_agent.into();

		self
	}

	/// Sets the server-error retry ceiling (`0` means unlimited).
	pub fn with_max_retries(mut self, max: u32) -> Self {
		self.request_max_retries = max;

		self
	}

	/// Sets the base server-error delay; negative values clamp to zero.
	pub fn with_error_delay(mut self, delay: Duration) -> Self {
		self.request_error_delay = if delay.is_negative() { Duration::ZERO } else { delay };

		self
	}

	/// Overrides the body decoding switches.
	pub fn with_decode_options(mut self, decode: DecodeOptions) -> Self {
		self.decode = decode;

		self
	}

	/// Retry ceiling as an option; `None` when retries are unbounded.
	pub fn max_retries(&self) -> Option<u32> {
		(self.request_max_retries > 0).then_some(self.request_max_retries)
	}
}
impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			api_base: DEFAULT_API_BASE.into(),
			api_version: DEFAULT_API_VERSION,
			user_agent: default_user_agent(),
			token: None,
			request_max_retries: 0,
			request_error_delay: DEFAULT_REQUEST_ERROR_DELAY,
			decode: DecodeOptions::default(),
		}
	}
}

/// Identifying user agent in the `DiscordBot (<name>, <version>)` form.
pub fn default_user_agent() -> String {
	format!("DiscordBot ({}, {})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Converts a signed duration into a timer duration, clamping negatives to zero.
pub(crate) fn std_duration(duration: Duration) -> std::time::Duration {
	std::time::Duration::try_from(duration).unwrap_or_default()
}

mod duration_secs {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub(super) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(value.as_seconds_f64())
	}

	pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = f64::deserialize(deserializer)?;

		if !secs.is_finite() || secs.abs() >= i64::MAX as f64 {
			return Err(serde::de::Error::custom("delay must be a finite number of seconds"));
		}

		Ok(Duration::seconds_f64(secs))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = ClientConfig::default();

		assert_eq!(config.request_max_retries, 0);
		assert_eq!(config.max_retries(), None);
		assert_eq!(config.request_error_delay, Duration::seconds(30));
		assert!(config.user_agent.starts_with("DiscordBot (rest-dispatch, "));
		assert!(config.decode.reject_html);
	}

	#[test]
	fn json_documents_fill_missing_fields_with_defaults() {
		let config = ClientConfig::from_json(
			r#"{"token":"abc","request_max_retries":3,"request_error_delay":1.5}"#,
		)
		.expect("Configuration document should parse.");

		assert_eq!(config.max_retries(), Some(3));
		assert_eq!(config.request_error_delay, Duration::milliseconds(1500));
		assert_eq!(config.token.as_ref().map(BotToken::expose), Some("abc"));
		assert_eq!(config.api_version, DEFAULT_API_VERSION);
	}

	#[test]
	fn negative_delays_are_rejected_or_clamped() {
		let err = ClientConfig::from_json(r#"{"request_error_delay":-1}"#)
			.expect_err("Negative delays should be rejected.");

		assert!(matches!(err, ConfigError::InvalidErrorDelay));

		let config = ClientConfig::default().with_error_delay(Duration::seconds(-5));

		assert_eq!(config.request_error_delay, Duration::ZERO);
	}

	#[test]
	fn serialized_config_omits_token() {
		let config = ClientConfig::default().with_token("secret");
		let payload = serde_json::to_string(&config).expect("Configuration should serialize.");

		assert!(!payload.contains("secret"));
		assert!(payload.contains("\"request_error_delay\":30.0"));
	}

	#[test]
	fn std_duration_clamps_negative_values() {
		assert_eq!(std_duration(Duration::seconds(-1)), std::time::Duration::ZERO);
		assert_eq!(std_duration(Duration::milliseconds(250)).as_millis(), 250);
	}
}
