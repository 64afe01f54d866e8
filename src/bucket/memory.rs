// std
use std::collections::VecDeque;
// crates.io
use ::http::HeaderMap;
use tokio::sync::Notify;
// self
use crate::{
	_prelude::*,
	bucket::RateLimitBucket,
	config::std_duration,
	executor::Attempt,
	http::parse_retry_after_at,
};

/// Header carrying the bucket capacity.
pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
/// Header carrying the calls left in the current window.
pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
/// Header carrying the window reset as fractional epoch seconds.
pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
/// Header carrying the seconds until the window resets.
pub const RATE_LIMIT_RESET_AFTER: &str = "x-ratelimit-reset-after";
/// Header flagging a global limit.
pub const RATE_LIMIT_GLOBAL: &str = "x-ratelimit-global";

/// Shortest window enforced on reaction routes.
pub const REACTION_MIN_WINDOW: Duration = Duration::milliseconds(250);

/// Point-in-time view of a bucket.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BucketSnapshot {
	/// Calls allowed per window, once known.
	pub limit: Option<u32>,
	/// Calls left in the current window, once known.
	pub remaining: Option<u32>,
	/// Instant the current window ends.
	pub reset_at: Option<OffsetDateTime>,
	/// Whether the last limit reported was global.
	pub global: bool,
}
impl BucketSnapshot {
	/// Time left before an exhausted bucket admits again; `None` when it admits now.
	pub fn wait_time(&self, now: OffsetDateTime) -> Option<Duration> {
		if self.remaining != Some(0) {
			return None;
		}

		self.reset_at.map(|reset_at| reset_at - now).filter(|wait| wait.is_positive())
	}
}

/// In-process bucket fed by the remote API's rate-limit headers.
///
/// Calls are admitted one at a time through an admission line. A place in the line is taken
/// synchronously by [`MemoryBucket::reserve`], so the line order is the order in which the
/// dispatcher popped the attempts; requeued attempts are placed at its front.
#[derive(Debug)]
pub struct MemoryBucket {
	key: String,
	state: Mutex<BucketState>,
	turn: Notify,
}
impl MemoryBucket {
	/// Creates an empty bucket for the given route class.
	pub fn new(key: impl Into<String>) -> Self {
		Self { key: key.into(), state: Default::default(), turn: Notify::new() }
	}

	/// Route class this bucket governs.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Current state.
	pub fn snapshot(&self) -> BucketSnapshot {
		self.state.lock().snapshot
	}

	/// Reservations not yet admitted.
	pub fn waiting(&self) -> usize {
		self.state.lock().line.len()
	}

	/// Applies response headers observed at `now`.
	pub fn observe_at(&self, headers: &HeaderMap, reaction: bool, now: OffsetDateTime) {
		{
			let mut guard = self.state.lock();
			let state = &mut guard.snapshot;

			if let Some(limit) = header_number::<u32>(headers, RATE_LIMIT_LIMIT) {
				state.limit = Some(limit);
			}
			if let Some(remaining) = header_number::<u32>(headers, RATE_LIMIT_REMAINING) {
				state.remaining = Some(remaining);
			}
			if let Some(reset_at) = reset_from_headers(headers, now) {
				state.reset_at = Some(reset_at);
			}
			if headers.contains_key(RATE_LIMIT_GLOBAL) {
				state.global = headers
					.get(RATE_LIMIT_GLOBAL)
					.and_then(|value| value.to_str().ok())
					.is_some_and(|value| value.eq_ignore_ascii_case("true"));
			}
			if let Some(retry_at) = parse_retry_after_at(headers, now)
				.and_then(|retry_after| now.checked_add(retry_after))
			{
				state.remaining = Some(0);
				state.reset_at =
					Some(state.reset_at.map_or(retry_at, |reset_at| reset_at.max(retry_at)));
			}
			if reaction {
				let floor = now + REACTION_MIN_WINDOW;

				state.limit = Some(1);
				state.reset_at = state.reset_at.map(|reset_at| reset_at.max(floor));
			}
		}

		self.turn.notify_waiters();
	}

	/// Takes a place in the admission line; `front` places it ahead of every waiting call.
	pub fn reserve(self: &Arc<Self>, front: bool) -> Reservation {
		let ticket = {
			let mut state = self.state.lock();
			let ticket = state.next_ticket;

			state.next_ticket = ticket.wrapping_add(1);

			if front {
				state.line.push_front(ticket);
			} else {
				state.line.push_back(ticket);
			}

			ticket
		};

		if front {
			self.turn.notify_waiters();
		}

		Reservation { bucket: self.clone(), ticket, admitted: false }
	}

	/// Waits at the back of the line until the bucket admits a call, then takes one slot.
	pub async fn acquire(self: &Arc<Self>) {
		self.reserve(false).admit().await;
	}

	fn try_admit(
		&self,
		ticket: u64,
		now: OffsetDateTime,
		elapsed: Option<OffsetDateTime>,
	) -> Admission {
		let mut guard = self.state.lock();

		if guard.line.front() != Some(&ticket) {
			return Admission::Queued;
		}

		let state = &mut guard.snapshot;
		// A window counts as over once its full wait ran out, unless a fresher one replaced it.
		let waited_out = elapsed.is_some() && elapsed == state.reset_at;

		match (state.wait_time(now), state.reset_at) {
			(Some(wait), Some(until)) if !waited_out => return Admission::Blocked { wait, until },
			_ => (),
		}
		if state.remaining == Some(0) {
			state.remaining = state.limit;
			state.reset_at = None;
		}
		if let Some(remaining) = state.remaining.as_mut() {
			*remaining = remaining.saturating_sub(1);
		}

		guard.line.pop_front();

		Admission::Admitted
	}

	fn leave(&self, ticket: u64) {
		self.state.lock().line.retain(|waiting| *waiting != ticket);
		self.turn.notify_waiters();
	}
}
impl RateLimitBucket for MemoryBucket {
	fn observe(&self, headers: &HeaderMap, reaction: bool) {
		self.observe_at(headers, reaction, OffsetDateTime::now_utc());
	}

	fn unshift(&self, mut attempt: Attempt) -> Attempt {
		attempt.mark_requeued();

		attempt
	}
}

/// Place in a [`MemoryBucket`]'s admission line.
///
/// Dropping it before [`Reservation::admit`] completes gives the place up.
#[derive(Debug)]
pub struct Reservation {
	bucket: Arc<MemoryBucket>,
	ticket: u64,
	admitted: bool,
}
impl Reservation {
	/// Waits for this reservation's turn and an open window, then takes one slot.
	pub async fn admit(mut self) {
		let mut elapsed = None;

		loop {
			let turn = self.bucket.turn.notified();

			match self.bucket.try_admit(self.ticket, OffsetDateTime::now_utc(), elapsed.take()) {
				Admission::Admitted => {
					self.admitted = true;
					self.bucket.turn.notify_waiters();

					return;
				},
				Admission::Queued => turn.await,
				Admission::Blocked { wait, until } => {
					if tokio::time::timeout(std_duration(wait), turn).await.is_err() {
						elapsed = Some(until);
					}
				},
			}
		}
	}
}
impl Drop for Reservation {
	fn drop(&mut self) {
		if !self.admitted {
			self.bucket.leave(self.ticket);
		}
	}
}

#[derive(Debug, Default)]
struct BucketState {
	snapshot: BucketSnapshot,
	line: VecDeque<u64>,
	next_ticket: u64,
}

enum Admission {
	Admitted,
	Queued,
	Blocked { wait: Duration, until: OffsetDateTime },
}

fn header_number<T>(headers: &HeaderMap, name: &str) -> Option<T>
where
	T: FromStr,
{
	headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn reset_from_headers(headers: &HeaderMap, now: OffsetDateTime) -> Option<OffsetDateTime> {
	if let Some(after) = header_number::<f64>(headers, RATE_LIMIT_RESET_AFTER).and_then(seconds) {
		return now.checked_add(after);
	}

	let epoch = header_number::<f64>(headers, RATE_LIMIT_RESET).and_then(seconds)?;

	OffsetDateTime::UNIX_EPOCH.checked_add(epoch)
}

fn seconds(secs: f64) -> Option<Duration> {
	(secs.is_finite() && secs >= 0. && secs < i64::MAX as f64).then(|| Duration::seconds_f64(secs))
}
