// self
use crate::{_prelude::*, obs::RequestEvent, request::RequestMethod};
#[cfg(feature = "tracing")] use crate::bucket::redact_route;

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// Span wrapping one physical call.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a span tagged with the verb and route of the call.
	pub fn new(method: RequestMethod, route: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::debug_span!(
				"rest_dispatch.request",
				method = method.as_str(),
				route = %redact_route(route)
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (method, route);

			Self {}
		}
	}

	/// Instruments the transport future without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits the event as a `debug` record under the `rest_dispatch` target.
pub fn emit_debug(event: &RequestEvent<'_>) {
	#[cfg(feature = "tracing")]
	let route = redact_route(event.route());
	#[cfg(feature = "tracing")]
	match event {
		RequestEvent::Delay { delay, .. } => tracing::debug!(
			target: "rest_dispatch",
			route = %route,
			status = event.status(),
			retry_count = event.retry_count(),
			delay_ms = delay.whole_milliseconds() as u64,
			"Server error, retrying after delay."
		),
		RequestEvent::GiveUp { max, .. } => tracing::debug!(
			target: "rest_dispatch",
			route = %route,
			status = event.status(),
			retry_count = event.retry_count(),
			max,
			"Retry ceiling reached, giving up."
		),
		_ => tracing::debug!(
			target: "rest_dispatch",
			route = %route,
			status = event.status(),
			retry_count = event.retry_count(),
			outcome = event.outcome(),
			"{}",
			event.kind()
		),
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}
