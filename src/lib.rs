//! Rate-limit aware REST request pipeline: immutable request descriptors, strict response
//! classification, bucket-tracked retries, and a dispatcher that re-admits throttled calls at the
//! front of its queue.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod bucket;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod http;
pub mod obs;
pub mod queue;
pub mod request;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and scripted collaborators for tests; enabled via `cfg(test)` or
	//! the `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		error::TransportError,
		http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
		obs::{EventSink, RequestEvent},
	};

	/// Transport that replays a fixed script of responses and records every request it sees.
	#[derive(Debug, Default)]
	pub struct ScriptedTransport {
		script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
		requests: Mutex<Vec<TransportRequest>>,
	}
	impl ScriptedTransport {
		/// Builds a transport that answers with `responses` in order.
		pub fn new(responses: impl IntoIterator<Item = TransportResponse>) -> Self {
			Self {
				script: Mutex::new(responses.into_iter().map(Ok).collect()),
				requests: Default::default(),
			}
		}

		/// Appends a transport failure to the script.
		pub fn then_fail(self, error: TransportError) -> Self {
			self.script.lock().push_back(Err(error));

			self
		}

		/// Returns every request dispatched so far.
		pub fn requests(&self) -> Vec<TransportRequest> {
			self.requests.lock().clone()
		}

		/// Number of physical calls performed.
		pub fn calls(&self) -> usize {
			self.requests.lock().len()
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
			self.requests.lock().push(request);

			let next = self.script.lock().pop_front();

			Box::pin(async move {
				next.unwrap_or_else(|| {
					Err(TransportError::Io(std::io::Error::other("Scripted transport exhausted.")))
				})
			})
		}
	}

	/// Sink that keeps the kind label of every recorded event.
	#[derive(Debug, Default)]
	pub struct RecordingSink(Mutex<Vec<&'static str>>);
	impl RecordingSink {
		/// Recorded event kinds, oldest first.
		pub fn kinds(&self) -> Vec<&'static str> {
			self.0.lock().clone()
		}

		/// Number of recorded events of the given kind.
		pub fn count(&self, kind: &str) -> usize {
			self.0.lock().iter().filter(|recorded| **recorded == kind).count()
		}
	}
	impl EventSink for RecordingSink {
		fn record(&self, event: &RequestEvent<'_>) {
			self.0.lock().push(event.kind());
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use serde_json;
#[cfg(test)] use {color_eyre as _, httpmock as _};
