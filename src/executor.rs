//! Request execution state machine.
//!
//! [`RequestExecutor::execute`] performs one physical call for an [`Attempt`] and decides what
//! happens next: resolve the caller's [`PendingResult`], re-admit a rate-limited attempt at the
//! queue front, or hand a server error to the [`RetryScheduler`] with the configured delay.
//! Every decision is reported to the executor's [`EventSink`].

pub mod attempt;
pub mod scheduler;

pub use attempt::*;
pub use scheduler::*;

// self
use crate::{
	_prelude::*,
	bucket::RateLimitBucket,
	classify::{ApiResponse, ResponseClass, ResponseOutcome},
	config::ClientConfig,
	error::ApiError,
	http::HttpTransport,
	obs::{EventSink, RequestEvent, RequestSpan, TerminalOutcome, TracingSink},
	queue::DispatchQueue,
	request::RequestDescriptor,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Executor specialized for the crate's default reqwest transport.
pub type ReqwestExecutor = RequestExecutor<ReqwestTransport>;

/// What became of an attempt after one execution step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
	/// The caller received its final result.
	Resolved,
	/// Rate limited; re-admitted at the queue front without delay.
	Requeued,
	/// Server error; re-admission scheduled after a delay.
	RetryScheduled,
	/// The caller abandoned the request; nothing was delivered.
	Cancelled,
}

/// Drives attempts through transport, classification and the retry protocol.
pub struct RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Transport performing physical calls.
	pub transport: Arc<T>,
	/// Settings applied to every request.
	pub config: Arc<ClientConfig>,
	queue: Arc<dyn DispatchQueue>,
	scheduler: Arc<dyn RetryScheduler>,
	sink: Arc<dyn EventSink>,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates an executor feeding `queue`, with tokio retry timers and the tracing sink.
	pub fn new(
		transport: impl Into<Arc<T>>,
		config: ClientConfig,
		queue: Arc<dyn DispatchQueue>,
	) -> Self {
		Self {
			transport: transport.into(),
			config: Arc::new(config),
			scheduler: Arc::new(TokioRetryScheduler::new(queue.clone())),
			queue,
			sink: Arc::new(TracingSink),
		}
	}

	/// Replaces the retry scheduler.
	pub fn with_scheduler(mut self, scheduler: Arc<dyn RetryScheduler>) -> Self {
		self.scheduler = scheduler;

		self
	}

	/// Replaces the event sink.
	pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.sink = sink;

		self
	}

	/// Queues a new request at the back and returns its pending result.
	pub fn submit(&self, descriptor: RequestDescriptor) -> PendingResult {
		let (attempt, pending) = Attempt::new(descriptor);

		self.queue.push_back(attempt);

		pending
	}

	/// Delay before a server-error retry: the base delay, doubled past the second retry.
	pub fn retry_delay(&self, retry_count: u32) -> Duration {
		let base = self.config.request_error_delay;

		if retry_count > 2 { base.saturating_mul(2) } else { base }
	}

	/// Performs one physical call for `attempt` and applies the retry protocol.
	///
	/// `bucket` observes the response headers before the status is examined, and retried
	/// attempts are unshifted through it on their way back to the queue front.
	pub async fn execute(
		&self,
		mut attempt: Attempt,
		bucket: Option<Arc<dyn RateLimitBucket>>,
	) -> Disposition {
		if attempt.is_cancelled() {
			return Disposition::Cancelled;
		}

		let descriptor = attempt.descriptor();
		let request = match descriptor.build(&self.config) {
			Ok(request) => request,
			Err(e) => return self.finish(attempt, None, Err(e.into())),
		};
		let span = RequestSpan::new(descriptor.method, &descriptor.route);
		let response = match span.instrument(self.transport.send(request)).await {
			Ok(response) => response,
			Err(e) => {
				let outcome = ResponseOutcome::no_response();

				return self.finish(attempt, outcome.status, Err(e.into()));
			},
		};
		let status = response.status.as_u16();

		self.sink.record(&RequestEvent::Response {
			route: &attempt.descriptor().route,
			status,
			retry_count: attempt.retry_count(),
		});

		if let Some(bucket) = &bucket {
			bucket.observe(&response.headers, attempt.descriptor().is_reaction_endpoint());
		}
		if attempt.is_cancelled() {
			return Disposition::Cancelled;
		}

		let outcome = match ResponseOutcome::classify(&response, &self.config.decode) {
			Ok(outcome) => outcome,
			Err(e) => return self.finish(attempt, Some(status), Err(e.into())),
		};

		match outcome.class {
			ResponseClass::Success => {
				let payload = outcome.payload.unwrap_or(Value::Null);

				self.finish(attempt, Some(status), Ok(ApiResponse::Json(payload)))
			},
			ResponseClass::EmptyBody => self.finish(attempt, Some(status), Ok(ApiResponse::Empty)),
			ResponseClass::RateLimited => {
				self.sink.record(&RequestEvent::Requeue {
					route: &attempt.descriptor().route,
					status,
					retry_count: attempt.retry_count(),
				});
				self.scheduler.schedule(RetryRequest { attempt, delay: Duration::ZERO, bucket });

				Disposition::Requeued
			},
			ResponseClass::RetryableServerError => {
				let retry_count = attempt.record_server_error();

				if let Some(max) = self.config.max_retries().filter(|max| retry_count > *max) {
					self.sink.record(&RequestEvent::GiveUp {
						route: &attempt.descriptor().route,
						status,
						retry_count,
						max,
					});

					return self.finish(attempt, Some(status), Err(Error::MaxRetries { max }));
				}

				let delay = self.retry_delay(retry_count);

				self.sink.record(&RequestEvent::Delay {
					route: &attempt.descriptor().route,
					status,
					retry_count,
					delay,
				});
				self.scheduler.schedule(RetryRequest { attempt, delay, bucket });

				Disposition::RetryScheduled
			},
			ResponseClass::PermanentClientError => {
				let payload = outcome.payload.unwrap_or(Value::Null);
				let error = ApiError::from_body(attempt.descriptor().route.clone(), status, payload);

				self.finish(attempt, Some(status), Err(error.into()))
			},
			ResponseClass::Unexpected | ResponseClass::TransportError => {
				let reason = response.reason_phrase().to_owned();

				self.finish(attempt, Some(status), Err(Error::UnexpectedStatus { status, reason }))
			},
		}
	}

	fn finish(
		&self,
		attempt: Attempt,
		status: Option<u16>,
		result: Result<ApiResponse>,
	) -> Disposition {
		if attempt.is_cancelled() {
			return Disposition::Cancelled;
		}

		self.sink.record(&RequestEvent::Terminal {
			route: &attempt.descriptor().route,
			status,
			retry_count: attempt.retry_count(),
			outcome: TerminalOutcome::of(&result),
		});

		if attempt.resolve(result) { Disposition::Resolved } else { Disposition::Cancelled }
	}
}
impl<T> Clone for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			queue: self.queue.clone(),
			scheduler: self.scheduler.clone(),
			sink: self.sink.clone(),
		}
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestExecutor").field("config", &self.config).finish_non_exhaustive()
	}
}
