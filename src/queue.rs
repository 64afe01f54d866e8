//! Dispatch queue contract and the in-memory queue used by the dispatcher.

// std
use std::collections::VecDeque;
// crates.io
use tokio::sync::Notify;
// self
use crate::{_prelude::*, executor::Attempt};

/// Queue feeding attempts to the dispatcher; the executor only ever pushes.
pub trait DispatchQueue
where
	Self: Send + Sync,
{
	/// Re-admits an attempt ahead of everything already waiting.
	fn push_front(&self, attempt: Attempt);

	/// Admits a fresh attempt behind everything already waiting.
	fn push_back(&self, attempt: Attempt);
}

/// FIFO queue with front re-admission and async wake-ups.
#[derive(Debug, Default)]
pub struct MemoryQueue {
	items: Mutex<VecDeque<Attempt>>,
	notify: Notify,
}
impl MemoryQueue {
	/// Removes the attempt at the front, if any.
	pub fn pop_front(&self) -> Option<Attempt> {
		self.items.lock().pop_front()
	}

	/// Waits until an attempt is available and removes it.
	pub async fn next(&self) -> Attempt {
		loop {
			let notified = self.notify.notified();

			if let Some(attempt) = self.pop_front() {
				return attempt;
			}

			notified.await;
		}
	}

	/// Number of waiting attempts.
	pub fn len(&self) -> usize {
		self.items.lock().len()
	}

	/// Whether no attempt is waiting.
	pub fn is_empty(&self) -> bool {
		self.items.lock().is_empty()
	}
}
impl DispatchQueue for MemoryQueue {
	fn push_front(&self, attempt: Attempt) {
		self.items.lock().push_front(attempt);
		self.notify.notify_one();
	}

	fn push_back(&self, attempt: Attempt) {
		self.items.lock().push_back(attempt);
		self.notify.notify_one();
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::request::RequestDescriptor;

	fn attempt(route: &str) -> Attempt {
		Attempt::new(RequestDescriptor::get(route)).0
	}

	#[test]
	fn front_pushes_jump_the_line() {
		let queue = MemoryQueue::default();

		queue.push_back(attempt("a"));
		queue.push_back(attempt("b"));
		queue.push_front(attempt("c"));

		assert_eq!(queue.len(), 3);

		let order = std::iter::from_fn(|| queue.pop_front())
			.map(|attempt| attempt.descriptor().route.clone())
			.collect::<Vec<_>>();

		assert_eq!(order, ["c", "a", "b"]);
		assert!(queue.is_empty());
	}

	#[tokio::test]
	async fn next_wakes_on_push() {
		let queue = Arc::new(MemoryQueue::default());
		let waiter = tokio::spawn({
			let queue = queue.clone();

			async move { queue.next().await.descriptor().route.clone() }
		});

		tokio::task::yield_now().await;
		queue.push_back(attempt("users/@me"));

		assert_eq!(waiter.await.expect("Waiter should not panic."), "users/@me");
	}
}
