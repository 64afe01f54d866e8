// self
use crate::obs::RequestEvent;

/// Records an executor event via the global metrics recorder (when enabled).
pub fn record_event(event: &RequestEvent<'_>) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"rest_dispatch_request_total",
			"route_class" => crate::bucket::bucket_key(event.route()),
			"outcome" => event.outcome()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn record_event_noop_without_recorder() {
		record_event(&RequestEvent::Requeue {
			route: "channels/1/messages",
			status: 429,
			retry_count: 0,
		});
	}
}
