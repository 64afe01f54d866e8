//! In-flight attempts and the caller-facing [`PendingResult`].

// std
use std::{
	sync::atomic::{AtomicBool, Ordering},
	task::{Context, Poll, Waker},
};
// crates.io
use tokio::sync::oneshot;
// self
use crate::{_prelude::*, classify::ApiResponse, request::RequestDescriptor};

#[derive(Debug, Default)]
struct CancelState {
	cancelled: AtomicBool,
	waker: Mutex<Option<Waker>>,
}
impl CancelState {
	fn cancel(&self) {
		self.cancelled.store(true, Ordering::Release);

		if let Some(waker) = self.waker.lock().take() {
			waker.wake();
		}
	}

	fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::Acquire)
	}
}

/// One logical request moving through executor, scheduler, bucket and queue.
///
/// The attempt owns the only completion handle for its [`PendingResult`], so at most one final
/// result is ever delivered.
pub struct Attempt {
	descriptor: RequestDescriptor,
	retry_count: u32,
	requeued: bool,
	completion: oneshot::Sender<Result<ApiResponse>>,
	cancel: Arc<CancelState>,
}
impl Attempt {
	/// Creates a fresh attempt and the pending result its caller awaits.
	pub fn new(descriptor: RequestDescriptor) -> (Self, PendingResult) {
		let (completion, receiver) = oneshot::channel();
		let cancel = Arc::new(CancelState::default());
		let attempt = Self {
			descriptor,
			retry_count: 0,
			requeued: false,
			completion,
			cancel: cancel.clone(),
		};

		(attempt, PendingResult { receiver, cancel })
	}

	/// Immutable description of the call.
	pub fn descriptor(&self) -> &RequestDescriptor {
		&self.descriptor
	}

	/// Server-error retries consumed so far.
	pub fn retry_count(&self) -> u32 {
		self.retry_count
	}

	/// Counts one more server error and returns the new total.
	pub fn record_server_error(&mut self) -> u32 {
		self.retry_count = self.retry_count.saturating_add(1);

		self.retry_count
	}

	/// Flags the attempt as returning to the queue front; buckets admit it ahead of fresh ones.
	pub fn mark_requeued(&mut self) {
		self.requeued = true;
	}

	/// Whether the attempt went back to the queue front at least once.
	pub fn is_requeued(&self) -> bool {
		self.requeued
	}

	/// Whether the caller cancelled or dropped the pending result.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled() || self.completion.is_closed()
	}

	/// Delivers the final result; returns `false` when nobody is waiting anymore.
	pub fn resolve(self, result: Result<ApiResponse>) -> bool {
		if self.is_cancelled() {
			return false;
		}

		self.completion.send(result).is_ok()
	}
}
impl Debug for Attempt {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Attempt")
			.field("method", &self.descriptor.method)
			.field("route", &self.descriptor.route)
			.field("retry_count", &self.retry_count)
			.field("requeued", &self.requeued)
			.field("cancelled", &self.is_cancelled())
			.finish()
	}
}

/// Future resolving to the final result of a request.
///
/// Dropping it, or calling [`PendingResult::cancel`], abandons the request: the executor and
/// retry timers discard the attempt at their next step.
#[derive(Debug)]
pub struct PendingResult {
	receiver: oneshot::Receiver<Result<ApiResponse>>,
	cancel: Arc<CancelState>,
}
impl PendingResult {
	/// Abandons the request; a subsequent poll yields [`Error::Cancelled`].
	pub fn cancel(&self) {
		self.cancel.cancel();
	}

	/// Handle able to cancel the request from elsewhere.
	pub fn cancel_handle(&self) -> CancelHandle {
		CancelHandle(self.cancel.clone())
	}

	/// Whether the request was cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}
}
impl Future for PendingResult {
	type Output = Result<ApiResponse>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let this = self.get_mut();

		*this.cancel.waker.lock() = Some(cx.waker().clone());

		if this.cancel.is_cancelled() {
			return Poll::Ready(Err(Error::Cancelled));
		}

		Pin::new(&mut this.receiver).poll(cx).map(|received| received.unwrap_or(Err(Error::Cancelled)))
	}
}
impl Drop for PendingResult {
	fn drop(&mut self) {
		self.cancel.cancelled.store(true, Ordering::Release);
	}
}

/// Cloneable handle cancelling a [`PendingResult`].
#[derive(Clone, Debug)]
pub struct CancelHandle(Arc<CancelState>);
impl CancelHandle {
	/// Abandons the request and wakes its awaiting task.
	pub fn cancel(&self) {
		self.0.cancel();
	}
}
