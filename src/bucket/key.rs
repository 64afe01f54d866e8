// self
use crate::{_prelude::*, auth::is_snowflake, bucket::MemoryBucket};

const MAJOR_PARAMETERS: [&str; 3] = ["channels", "guilds", "webhooks"];

/// Collapses a route into its rate-limit class.
///
/// The identifier following a leading `channels`, `guilds` or `webhooks` segment is kept,
/// a webhook token becomes `:token`, other snowflakes become `:id`, and reaction routes stop at
/// the `reactions` segment.
pub fn bucket_key(route: &str) -> String {
	let segments = route.trim_matches('/').split('/').collect::<Vec<_>>();
	let major = segments.first().is_some_and(|first| MAJOR_PARAMETERS.contains(first));
	let mut key = Vec::with_capacity(segments.len());

	for (i, segment) in segments.iter().copied().enumerate() {
		match (i, segment) {
			(_, "reactions") => {
				key.push("reactions");

				break;
			},
			(1, _) if major => key.push(segment),
			(2, _) if major && segments[0] == "webhooks" => key.push(":token"),
			_ if is_snowflake(segment) => key.push(":id"),
			_ => key.push(segment),
		}
	}

	key.join("/")
}

/// Masks the token segment of token-bound webhook routes so they can be logged.
pub fn redact_route(route: &str) -> String {
	let mut segments = route.split('/').collect::<Vec<_>>();

	if segments.len() > 2 && segments[0] == "webhooks" {
		segments[2] = ":token";
	}

	segments.join("/")
}

/// Hands out one shared [`MemoryBucket`] per route class.
#[derive(Clone, Debug, Default)]
pub struct BucketRegistry(Arc<RwLock<HashMap<String, Arc<MemoryBucket>>>>);
impl BucketRegistry {
	/// Returns the bucket governing `route`, creating it on first use.
	pub fn for_route(&self, route: &str) -> Arc<MemoryBucket> {
		let key = bucket_key(route);

		if let Some(bucket) = self.0.read().get(&key) {
			return bucket.clone();
		}

		self.0.write().entry(key.clone()).or_insert_with(|| Arc::new(MemoryBucket::new(key))).clone()
	}

	/// Number of route classes seen so far.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether no bucket has been created yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn major_parameters_are_kept() {
		assert_eq!(bucket_key("channels/1/messages"), "channels/1/messages");
		assert_eq!(bucket_key("channels/1/messages/42"), "channels/1/messages/:id");
		assert_eq!(bucket_key("guilds/7/members/99"), "guilds/7/members/:id");
		assert_eq!(bucket_key("users/@me"), "users/@me");
		assert_eq!(bucket_key("users/12345"), "users/:id");
	}

	#[test]
	fn webhook_tokens_and_reactions_collapse() {
		assert_eq!(bucket_key("webhooks/5/s3cr3t"), "webhooks/5/:token");
		assert_eq!(bucket_key("webhooks/5/s3cr3t/messages/8"), "webhooks/5/:token/messages/:id");
		assert_eq!(
			bucket_key("channels/1/messages/2/reactions/%F0%9F%91%8D/@me"),
			"channels/1/messages/:id/reactions"
		);
	}

	#[test]
	fn redaction_only_touches_webhook_tokens() {
		assert_eq!(redact_route("webhooks/5/s3cr3t/messages/8"), "webhooks/5/:token/messages/8");
		assert_eq!(redact_route("webhooks/5"), "webhooks/5");
		assert_eq!(redact_route("channels/1/messages/2"), "channels/1/messages/2");
	}

	#[test]
	fn registry_shares_buckets_per_class() {
		let registry = BucketRegistry::default();
		let a = registry.for_route("channels/1/messages/10");
		let b = registry.for_route("channels/1/messages/11");
		let c = registry.for_route("channels/2/messages/10");

		assert!(Arc::ptr_eq(&a, &b));
		assert!(!Arc::ptr_eq(&a, &c));
		assert_eq!(registry.len(), 2);
		assert_eq!(a.key(), "channels/1/messages/:id");
	}
}
