//! Observability hooks for the request executor.
//!
//! Every decision the executor takes is described by a [`RequestEvent`] and handed to an
//! [`EventSink`]. The default [`TracingSink`] forwards events to the optional backends.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit `debug` events under the `rest_dispatch` target and to wrap each
//!   physical call in a `rest_dispatch.request` span with `method` and `route` fields.
//! - Enable `metrics` to increment the `rest_dispatch_request_total` counter for every event,
//!   labeled by `route_class` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Decision taken by the executor for one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestEvent<'a> {
	/// A response arrived and is about to be classified.
	Response {
		/// Route of the attempt.
		route: &'a str,
		/// HTTP status.
		status: u16,
		/// Server-error retries consumed so far.
		retry_count: u32,
	},
	/// A rate-limited attempt goes straight back to the queue front.
	Requeue {
		/// Route of the attempt.
		route: &'a str,
		/// HTTP status.
		status: u16,
		/// Server-error retries consumed so far.
		retry_count: u32,
	},
	/// A server error schedules a delayed re-admission.
	Delay {
		/// Route of the attempt.
		route: &'a str,
		/// HTTP status.
		status: u16,
		/// Server-error retries consumed so far.
		retry_count: u32,
		/// Delay before the attempt re-enters the queue.
		delay: Duration,
	},
	/// Server errors outlasted the retry ceiling.
	GiveUp {
		/// Route of the attempt.
		route: &'a str,
		/// HTTP status.
		status: u16,
		/// Server-error retries consumed so far.
		retry_count: u32,
		/// Configured retry ceiling.
		max: u32,
	},
	/// The attempt resolved with a final result.
	Terminal {
		/// Route of the attempt.
		route: &'a str,
		/// HTTP status; `None` when no response was obtained.
		status: Option<u16>,
		/// Server-error retries consumed so far.
		retry_count: u32,
		/// Outcome label, see [`TerminalOutcome`].
		outcome: TerminalOutcome,
	},
}
impl RequestEvent<'_> {
	/// Route the event refers to.
	pub fn route(&self) -> &str {
		match self {
			Self::Response { route, .. }
			| Self::Requeue { route, .. }
			| Self::Delay { route, .. }
			| Self::GiveUp { route, .. }
			| Self::Terminal { route, .. } => route,
		}
	}

	/// HTTP status, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Response { status, .. }
			| Self::Requeue { status, .. }
			| Self::Delay { status, .. }
			| Self::GiveUp { status, .. } => Some(*status),
			Self::Terminal { status, .. } => *status,
		}
	}

	/// Server-error retries consumed when the event fired.
	pub fn retry_count(&self) -> u32 {
		match self {
			Self::Response { retry_count, .. }
			| Self::Requeue { retry_count, .. }
			| Self::Delay { retry_count, .. }
			| Self::GiveUp { retry_count, .. }
			| Self::Terminal { retry_count, .. } => *retry_count,
		}
	}

	/// Returns a stable label for the event kind.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Response { .. } => "response",
			Self::Requeue { .. } => "requeue",
			Self::Delay { .. } => "delay",
			Self::GiveUp { .. } => "give_up",
			Self::Terminal { .. } => "terminal",
		}
	}

	/// Outcome label used for metrics; terminal events report their outcome.
	pub const fn outcome(&self) -> &'static str {
		match self {
			Self::Terminal { outcome, .. } => outcome.as_str(),
			_ => self.kind(),
		}
	}
}

/// How an attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TerminalOutcome {
	/// Decoded payload or empty body delivered.
	Success,
	/// Permanent 4xx.
	ApiError,
	/// Retry ceiling exceeded.
	MaxRetries,
	/// HTML or malformed body.
	InvalidResponse,
	/// No response was obtained.
	TransportError,
	/// Informational or redirect status.
	UnexpectedStatus,
	/// The request could not be built.
	ConfigError,
	/// The caller abandoned the pending result.
	Cancelled,
}
impl TerminalOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::ApiError => "api_error",
			Self::MaxRetries => "max_retries",
			Self::InvalidResponse => "invalid_response",
			Self::TransportError => "transport_error",
			Self::UnexpectedStatus => "unexpected_status",
			Self::ConfigError => "config_error",
			Self::Cancelled => "cancelled",
		}
	}

	/// Label for a terminal result.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => Self::Success,
			Err(Error::Api(_)) => Self::ApiError,
			Err(Error::MaxRetries { .. }) => Self::MaxRetries,
			Err(Error::InvalidResponse(_) | Error::Deserialize { .. }) => Self::InvalidResponse,
			Err(Error::Transport(_)) => Self::TransportError,
			Err(Error::UnexpectedStatus { .. }) => Self::UnexpectedStatus,
			Err(Error::Config(_)) => Self::ConfigError,
			Err(Error::Cancelled) => Self::Cancelled,
		}
	}
}
impl Display for TerminalOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Destination for executor events.
pub trait EventSink
where
	Self: Send + Sync,
{
	/// Records one event; must not block.
	fn record(&self, event: &RequestEvent<'_>);
}

/// Default sink forwarding to `tracing` and `metrics` when those features are enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;
impl EventSink for TracingSink {
	fn record(&self, event: &RequestEvent<'_>) {
		emit_debug(event);
		record_event(event);
	}
}
