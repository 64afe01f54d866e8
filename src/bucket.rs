//! Rate-limit bucket contracts consulted by the executor and dispatcher.
//!
//! The executor calls [`RateLimitBucket::observe`] with every response's headers before it
//! branches on the status, and passes retried attempts through [`RateLimitBucket::unshift`] on
//! their way back to the queue front. Waiting for an exhausted window happens when the
//! dispatcher admits the attempt, so a retried attempt never leaves the queue while it waits.

mod key;
mod memory;

pub use self::{key::*, memory::*};

// crates.io
use ::http::HeaderMap;
// self
use crate::executor::Attempt;

/// Per-route rate-limit state shared by concurrent attempts.
pub trait RateLimitBucket
where
	Self: Send + Sync,
{
	/// Updates the bucket from response headers; `reaction` selects the tighter window.
	fn observe(&self, headers: &HeaderMap, reaction: bool);

	/// Claims a place ahead of fresh arrivals for an attempt returning to the queue front.
	fn unshift(&self, attempt: Attempt) -> Attempt;
}
