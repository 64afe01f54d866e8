// std
use std::{collections::VecDeque, sync::Arc, time::Duration as StdDuration};
// crates.io
use parking_lot::Mutex;
use serde_json::json;
use time::Duration;
// self
use rest_dispatch::{
	config::ClientConfig,
	dispatch::Dispatcher,
	error::{Error, TransportError},
	executor::Disposition,
	http::{HttpTransport, TransportFuture, TransportRequest, TransportResponse},
	http_types::StatusCode,
	obs::{EventSink, RequestEvent},
	request::RequestDescriptor,
};

#[derive(Default)]
struct FakeTransport {
	responses: Mutex<VecDeque<TransportResponse>>,
	seen: Mutex<Vec<String>>,
}
impl FakeTransport {
	fn new(responses: impl IntoIterator<Item = TransportResponse>) -> Self {
		Self { responses: Mutex::new(responses.into_iter().collect()), seen: Default::default() }
	}

	fn seen(&self) -> Vec<String> {
		self.seen.lock().clone()
	}
}
impl HttpTransport for FakeTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let target = match request.url.query() {
			Some(query) => format!("{}?{query}", request.url.path()),
			None => request.url.path().to_owned(),
		};

		self.seen.lock().push(target);

		let next = self.responses.lock().pop_front();

		Box::pin(async move {
			next.ok_or_else(|| TransportError::Io(std::io::Error::other("No scripted response.")))
		})
	}
}

#[derive(Default)]
struct Events(Mutex<Vec<(&'static str, Option<u16>, u32)>>);
impl Events {
	fn snapshot(&self) -> Vec<(&'static str, Option<u16>, u32)> {
		self.0.lock().clone()
	}
}
impl EventSink for Events {
	fn record(&self, event: &RequestEvent<'_>) {
		self.0.lock().push((
			event.kind(),
			event.status(),
			event.retry_count(),
		));
	}
}

fn response(status: u16) -> TransportResponse {
	TransportResponse::new(StatusCode::from_u16(status).expect("Fixture status is valid."))
}

fn build(
	transport: FakeTransport,
	config: ClientConfig,
) -> (Arc<Dispatcher<FakeTransport>>, Arc<FakeTransport>, Arc<Events>) {
	let transport = Arc::new(transport);
	let events = Arc::new(Events::default());
	let config = config.with_api_base("https://api.example.com/api").with_token("t0k3n");
	let dispatcher =
		Dispatcher::with_transport(transport.clone(), config).with_event_sink(events.clone());

	(Arc::new(dispatcher), transport, events)
}

#[tokio::test(start_paused = true)]
async fn rate_limit_then_success_on_channel_messages() {
	let (dispatcher, transport, events) = build(
		FakeTransport::new([
			response(429).with_header("retry-after", "1"),
			TransportResponse::json(StatusCode::OK, &json!({ "id": "100" })),
		]),
		ClientConfig::default(),
	);
	let pending = dispatcher.request(
		RequestDescriptor::post("channels/1/messages").with_body(json!({ "content": "hello" })),
	);
	let runner = tokio::spawn(dispatcher.clone().run());
	let result = tokio::time::timeout(StdDuration::from_secs(30), pending)
		.await
		.expect("Request should finish.")
		.expect("The replay should succeed.");

	runner.abort();

	assert_eq!(result.into_json(), json!({ "id": "100" }));
	assert_eq!(transport.seen(), ["/api/v10/channels/1/messages", "/api/v10/channels/1/messages"]);
	assert_eq!(
		events.snapshot(),
		[
			("response", Some(429), 0),
			("requeue", Some(429), 0),
			("response", Some(200), 0),
			("terminal", Some(200), 0),
		]
	);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_calls_leave_before_later_arrivals_on_the_same_route() {
	let (dispatcher, transport, events) = build(
		FakeTransport::new([
			response(429).with_header("retry-after", "1"),
			TransportResponse::json(StatusCode::OK, &json!({ "id": "a" })),
			TransportResponse::json(StatusCode::OK, &json!({ "id": "b" })),
		]),
		ClientConfig::default(),
	);
	let first = dispatcher.request(
		RequestDescriptor::post("channels/1/messages")
			.with_query("who", "A")
			.with_body(json!({ "content": "a" })),
	);
	let runner = tokio::spawn(dispatcher.clone().run());

	tokio::time::sleep(StdDuration::from_millis(10)).await;

	let second = dispatcher.request(
		RequestDescriptor::post("channels/1/messages")
			.with_query("who", "B")
			.with_body(json!({ "content": "b" })),
	);
	let (first, second) = tokio::time::timeout(StdDuration::from_secs(30), async {
		(first.await, second.await)
	})
	.await
	.expect("Both requests should finish.");

	runner.abort();

	assert_eq!(first.expect("The replay should succeed.").into_json(), json!({ "id": "a" }));
	assert_eq!(second.expect("The later call should succeed.").into_json(), json!({ "id": "b" }));
	assert_eq!(
		transport.seen(),
		[
			"/api/v10/channels/1/messages?who=A",
			"/api/v10/channels/1/messages?who=A",
			"/api/v10/channels/1/messages?who=B",
		]
	);
	assert_eq!(events.snapshot().iter().filter(|(kind, ..)| *kind == "requeue").count(), 1);
}

#[tokio::test(start_paused = true)]
async fn requeued_calls_overtake_waiting_calls_queued_earlier() {
	let (dispatcher, transport, _) = build(
		FakeTransport::new([
			response(200)
				.with_header("x-ratelimit-limit", "1")
				.with_header("x-ratelimit-remaining", "0")
				.with_header("x-ratelimit-reset-after", "1"),
			response(429).with_header("retry-after", "1"),
			response(200),
			response(200),
		]),
		ClientConfig::default(),
	);
	let warmup = dispatcher.request(RequestDescriptor::get("guilds/1/roles").with_query("n", "0"));

	assert_eq!(dispatcher.run_once().await, Some(Disposition::Resolved));

	let first = dispatcher.request(RequestDescriptor::get("guilds/1/roles").with_query("n", "1"));
	let second = dispatcher.request(RequestDescriptor::get("guilds/1/roles").with_query("n", "2"));
	let runner = tokio::spawn(dispatcher.clone().run());
	let (first, second) = tokio::time::timeout(StdDuration::from_secs(30), async {
		(first.await, second.await)
	})
	.await
	.expect("Both requests should finish.");

	runner.abort();

	assert!(warmup.await.is_ok());
	assert!(first.is_ok());
	assert!(second.is_ok());
	assert_eq!(
		transport.seen(),
		[
			"/api/v10/guilds/1/roles?n=0",
			"/api/v10/guilds/1/roles?n=1",
			"/api/v10/guilds/1/roles?n=1",
			"/api/v10/guilds/1/roles?n=2",
		]
	);
}

#[tokio::test(start_paused = true)]
async fn server_errors_exhaust_the_retry_ceiling_on_guilds() {
	let (dispatcher, transport, events) = build(
		FakeTransport::new([response(503), response(503), response(503)]),
		ClientConfig::default().with_max_retries(2).with_error_delay(Duration::seconds(2)),
	);
	let pending = dispatcher.request(RequestDescriptor::get("guilds/1"));
	let runner = tokio::spawn(dispatcher.clone().run());
	let err = tokio::time::timeout(StdDuration::from_secs(60), pending)
		.await
		.expect("Request should finish.")
		.expect_err("Three 503s with a ceiling of 2 should fail.");

	runner.abort();

	assert!(matches!(err, Error::MaxRetries { max: 2 }));
	assert_eq!(transport.seen().len(), 3);
	assert_eq!(
		events.snapshot(),
		[
			("response", Some(503), 0),
			("delay", Some(503), 1),
			("response", Some(503), 1),
			("delay", Some(503), 2),
			("response", Some(503), 2),
			("give_up", Some(503), 3),
			("terminal", Some(503), 3),
		]
	);
}

#[tokio::test]
async fn unauthorized_users_me_is_immediate() {
	let (dispatcher, transport, _) = build(
		FakeTransport::new([TransportResponse::json(
			StatusCode::UNAUTHORIZED,
			&json!({ "code": 0, "message": "401: Unauthorized" }),
		)]),
		ClientConfig::default(),
	);
	let pending = dispatcher.request(RequestDescriptor::get("users/@me"));

	assert_eq!(dispatcher.run_once().await, Some(Disposition::Resolved));

	let Err(Error::Api(err)) = pending.await else {
		panic!("401 should surface an API error.");
	};

	assert_eq!(err.status, 401);
	assert_eq!(transport.seen(), ["/api/v10/users/@me"]);
	assert_eq!(dispatcher.queued(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_requests_stop_retrying() {
	let (dispatcher, transport, _) = build(
		FakeTransport::new([response(500), response(200)]),
		ClientConfig::default(),
	);
	let pending = dispatcher.request(RequestDescriptor::get("guilds/2"));
	let handle = pending.cancel_handle();

	assert_eq!(dispatcher.run_once().await, Some(Disposition::RetryScheduled));

	handle.cancel();
	tokio::time::sleep(StdDuration::from_secs(31)).await;

	assert_eq!(dispatcher.queued(), 0);
	assert_eq!(transport.seen().len(), 1);
	assert!(matches!(pending.await, Err(Error::Cancelled)));
}
