//! Retry messages and the timer that re-admits them.

// self
use crate::{
	_prelude::*, bucket::RateLimitBucket, config::std_duration, executor::Attempt,
	queue::DispatchQueue,
};

/// Instruction to re-admit an attempt at the queue front after `delay`.
pub struct RetryRequest {
	/// The attempt to re-admit.
	pub attempt: Attempt,
	/// Time to wait before re-admission; zero re-admits immediately.
	pub delay: Duration,
	/// Bucket the attempt is unshifted through on its way back to the queue.
	pub bucket: Option<Arc<dyn RateLimitBucket>>,
}
impl Debug for RetryRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RetryRequest")
			.field("attempt", &self.attempt)
			.field("delay", &self.delay)
			.field("bucket", &self.bucket.is_some())
			.finish()
	}
}

/// Owner of retry timers.
pub trait RetryScheduler
where
	Self: Send + Sync,
{
	/// Takes ownership of the retry; the attempt reaches the queue front once it fires.
	fn schedule(&self, request: RetryRequest);
}

/// Scheduler backed by tokio timers.
///
/// Zero delays re-admit inline. Cancelled attempts are dropped when their timer fires.
#[derive(Clone)]
pub struct TokioRetryScheduler {
	queue: Arc<dyn DispatchQueue>,
}
impl TokioRetryScheduler {
	/// Creates a scheduler feeding `queue`.
	pub fn new(queue: Arc<dyn DispatchQueue>) -> Self {
		Self { queue }
	}
}
impl Debug for TokioRetryScheduler {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokioRetryScheduler(..)")
	}
}
impl RetryScheduler for TokioRetryScheduler {
	fn schedule(&self, request: RetryRequest) {
		let RetryRequest { attempt, delay, bucket } = request;

		if !delay.is_positive() {
			readmit(&*self.queue, attempt, bucket.as_deref());

			return;
		}

		let queue = self.queue.clone();

		tokio::spawn(async move {
			tokio::time::sleep(std_duration(delay)).await;

			readmit(&*queue, attempt, bucket.as_deref());
		});
	}
}

fn readmit(queue: &dyn DispatchQueue, attempt: Attempt, bucket: Option<&dyn RateLimitBucket>) {
	if attempt.is_cancelled() {
		return;
	}

	let attempt = match bucket {
		Some(bucket) => bucket.unshift(attempt),
		None => attempt,
	};

	queue.push_front(attempt);
}
