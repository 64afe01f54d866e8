//! Queue-driven dispatcher tying executor, queue and per-route buckets together.

// self
use crate::{
	_prelude::*,
	bucket::{BucketRegistry, MemoryBucket, RateLimitBucket, Reservation},
	config::ClientConfig,
	executor::{Attempt, Disposition, PendingResult, RequestExecutor},
	http::HttpTransport,
	obs::EventSink,
	queue::MemoryQueue,
	request::RequestDescriptor,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

/// Owns the queue and bucket registry and feeds attempts to a [`RequestExecutor`].
///
/// New requests enter at the back of the queue; rate-limited and retried attempts come back
/// at the front. Before each call the dispatcher waits for the route's bucket to admit it,
/// with requeued attempts placed ahead of fresh ones in the bucket line.
pub struct Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	executor: RequestExecutor<T>,
	queue: Arc<MemoryQueue>,
	buckets: BucketRegistry,
}
impl<T> Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a dispatcher around a caller-provided transport.
	pub fn with_transport(transport: impl Into<Arc<T>>, config: ClientConfig) -> Self {
		let queue = Arc::new(MemoryQueue::default());
		let executor = RequestExecutor::new(transport, config, queue.clone());

		Self { executor, queue, buckets: BucketRegistry::default() }
	}

	/// Replaces the executor's event sink.
	pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.executor = self.executor.with_event_sink(sink);

		self
	}

	/// Executor driving the calls.
	pub fn executor(&self) -> &RequestExecutor<T> {
		&self.executor
	}

	/// Per-route bucket registry.
	pub fn buckets(&self) -> &BucketRegistry {
		&self.buckets
	}

	/// Number of attempts waiting in the queue.
	pub fn queued(&self) -> usize {
		self.queue.len()
	}

	/// Queues a request and returns its pending result.
	pub fn request(&self, descriptor: RequestDescriptor) -> PendingResult {
		self.executor.submit(descriptor)
	}

	/// Executes the attempt at the queue front; `None` when the queue is empty.
	pub async fn run_once(&self) -> Option<Disposition> {
		let attempt = self.queue.pop_front()?;
		let Some(admission) = self.reserve(attempt) else {
			return Some(Disposition::Cancelled);
		};

		Some(self.dispatch(admission).await)
	}

	/// Executes attempts as they arrive, one task per attempt; never returns.
	///
	/// Each attempt takes its place in the bucket line before its task is spawned, so calls on
	/// one route class leave in queue order.
	pub async fn run(self: Arc<Self>) {
		loop {
			let attempt = self.queue.next().await;
			let Some(admission) = self.reserve(attempt) else {
				continue;
			};
			let dispatcher = self.clone();

			tokio::spawn(async move {
				dispatcher.dispatch(admission).await;
			});
		}
	}

	fn reserve(&self, attempt: Attempt) -> Option<Admission> {
		if attempt.is_cancelled() {
			return None;
		}

		let bucket = self.buckets.for_route(&attempt.descriptor().route);
		let reservation = bucket.reserve(attempt.is_requeued());

		Some(Admission { attempt, bucket, reservation })
	}

	async fn dispatch(&self, admission: Admission) -> Disposition {
		let Admission { attempt, bucket, reservation } = admission;

		reservation.admit().await;

		let bucket: Arc<dyn RateLimitBucket> = bucket;

		self.executor.execute(attempt, Some(bucket)).await
	}
}
#[cfg(feature = "reqwest")]
impl Dispatcher<ReqwestTransport> {
	/// Creates a dispatcher backed by a redirect-free reqwest client.
	pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
		Ok(Self::with_transport(ReqwestTransport::new()?, config))
	}
}
impl<T> Debug for Dispatcher<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("queued", &self.queue.len())
			.field("buckets", &self.buckets.len())
			.finish()
	}
}

struct Admission {
	attempt: Attempt,
	bucket: Arc<MemoryBucket>,
	reservation: Reservation,
}

#[cfg(test)]
mod tests {
	// crates.io
	use ::http::StatusCode;
	use serde_json::json;
	// self
	use super::*;
	use crate::{_preludet::*, http::TransportResponse};

	fn dispatcher(
		transport: ScriptedTransport,
	) -> (Dispatcher<ScriptedTransport>, Arc<RecordingSink>) {
		let sink = Arc::new(RecordingSink::default());
		let dispatcher = Dispatcher::with_transport(
			transport,
			ClientConfig::default().with_api_base("https://api.example.com/api").with_token("t"),
		)
		.with_event_sink(sink.clone());

		(dispatcher, sink)
	}

	#[tokio::test]
	async fn run_once_drains_in_order() {
		let (dispatcher, _) = dispatcher(ScriptedTransport::new([
			TransportResponse::json(StatusCode::OK, &json!(1)),
			TransportResponse::json(StatusCode::OK, &json!(2)),
		]));
		let first = dispatcher.request(RequestDescriptor::get("channels/1/messages"));
		let second = dispatcher.request(RequestDescriptor::get("guilds/1"));

		assert_eq!(dispatcher.queued(), 2);
		assert_eq!(dispatcher.run_once().await, Some(Disposition::Resolved));
		assert_eq!(dispatcher.run_once().await, Some(Disposition::Resolved));
		assert_eq!(dispatcher.run_once().await, None);
		assert_eq!(first.await.expect("First should resolve.").into_json(), json!(1));
		assert_eq!(second.await.expect("Second should resolve.").into_json(), json!(2));
		assert_eq!(dispatcher.buckets().len(), 2);
	}

	#[tokio::test]
	async fn dropped_requests_are_skipped() {
		let (dispatcher, sink) = dispatcher(ScriptedTransport::default());

		drop(dispatcher.request(RequestDescriptor::get("users/@me")));

		assert_eq!(dispatcher.run_once().await, Some(Disposition::Cancelled));
		assert!(sink.kinds().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn run_loop_retries_until_success() {
		let (dispatcher, sink) = dispatcher(ScriptedTransport::new([
			TransportResponse::new(StatusCode::TOO_MANY_REQUESTS).with_header("retry-after", "1"),
			TransportResponse::json(StatusCode::OK, &json!({ "id": "7" })),
		]));
		let dispatcher = Arc::new(dispatcher);
		let pending = dispatcher.request(RequestDescriptor::post("channels/1/messages"));
		let runner = tokio::spawn(dispatcher.clone().run());
		let result = tokio::time::timeout(std::time::Duration::from_secs(10), pending)
			.await
			.expect("Request should finish within the window.")
			.expect("Second attempt should succeed.");

		runner.abort();

		assert_eq!(result.into_json(), json!({ "id": "7" }));
		assert_eq!(sink.count("requeue"), 1);
		assert_eq!(sink.count("terminal"), 1);
	}
}
