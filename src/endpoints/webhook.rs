//! Webhook endpoints.
//!
//! A webhook is addressed either through its token, which travels in the route and replaces
//! the bot credential, or through the bot credential alone. [`WebhookTarget`] fixes that choice
//! once so each builder below produces a ready-to-submit [`RequestDescriptor`].

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::{ChannelId, WebhookId, WebhookToken},
	error::ConfigError,
	request::{FileAttachment, RequestDescriptor},
};

/// How a webhook call authenticates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookTarget {
	/// Token in the route, no bot credential.
	TokenBound {
		/// Webhook identifier.
		id: WebhookId,
		/// Webhook token.
		token: WebhookToken,
	},
	/// Bot credential, no token.
	BotAuthenticated {
		/// Webhook identifier.
		id: WebhookId,
	},
}
impl WebhookTarget {
	/// Picks the token-bound form when a token is available.
	pub fn new(id: WebhookId, token: Option<WebhookToken>) -> Self {
		match token {
			Some(token) => Self::TokenBound { id, token },
			None => Self::BotAuthenticated { id },
		}
	}

	/// Webhook identifier.
	pub fn id(&self) -> &WebhookId {
		match self {
			Self::TokenBound { id, .. } | Self::BotAuthenticated { id } => id,
		}
	}

	/// `webhooks/{id}` or `webhooks/{id}/{token}`.
	pub fn route(&self) -> String {
		match self {
			Self::TokenBound { id, token } => format!("webhooks/{id}/{}", token.expose()),
			Self::BotAuthenticated { id } => format!("webhooks/{id}"),
		}
	}

	/// Fetches the webhook.
	pub fn get(&self) -> RequestDescriptor {
		self.authenticate(RequestDescriptor::get(self.route()))
	}

	/// Edits the webhook; fails when `edit` carries no field.
	pub fn modify(&self, edit: &WebhookEdit) -> Result<RequestDescriptor, ConfigError> {
		let body = edit.to_body()?;

		Ok(self.authenticate(RequestDescriptor::patch(self.route()).with_body(body)))
	}

	/// Deletes the webhook.
	pub fn delete(&self) -> RequestDescriptor {
		self.authenticate(RequestDescriptor::delete(self.route()))
	}

	/// Posts a message and waits for the created message in the response.
	pub fn execute(&self, message: ExecuteWebhook) -> Result<RequestDescriptor, ConfigError> {
		let Self::TokenBound { .. } = self else {
			return Err(ConfigError::WebhookTokenRequired { id: self.id().to_string() });
		};
		let body = serde_json::to_value(&message)?;

		Ok(self.authenticate(
			RequestDescriptor::post(self.route())
				.with_body(body)
				.with_files(message.files)
				.with_query("wait", "true"),
		))
	}

	fn authenticate(&self, descriptor: RequestDescriptor) -> RequestDescriptor {
		match self {
			Self::TokenBound { .. } => descriptor.without_auth(),
			Self::BotAuthenticated { .. } => descriptor,
		}
	}
}

/// Fields changed by [`WebhookTarget::modify`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WebhookEdit {
	/// New name.
	pub name: Option<String>,
	/// Channel to move the webhook to.
	pub channel_id: Option<ChannelId>,
	/// New avatar image bytes.
	pub avatar: Option<Vec<u8>>,
}
impl WebhookEdit {
	/// Sets the name.
	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Sets the channel.
	pub fn with_channel(mut self, channel_id: ChannelId) -> Self {
		self.channel_id = Some(channel_id);

		self
	}

	/// Sets the avatar image.
	pub fn with_avatar(mut self, avatar: impl Into<Vec<u8>>) -> Self {
		self.avatar = Some(avatar.into());

		self
	}

	/// JSON body with the avatar rendered as a base64 data URI.
	pub fn to_body(&self) -> Result<Value, ConfigError> {
		let mut body = serde_json::Map::new();

		if let Some(name) = self.name.as_deref().filter(|name| !name.is_empty()) {
			body.insert("name".into(), name.into());
		}
		if let Some(channel_id) = &self.channel_id {
			body.insert("channel_id".into(), channel_id.to_string().into());
		}
		if let Some(avatar) = self.avatar.as_deref().filter(|avatar| !avatar.is_empty()) {
			body.insert("avatar".into(), data_uri(avatar).into());
		}
		if body.is_empty() {
			return Err(ConfigError::EmptyWebhookEdit);
		}

		Ok(Value::Object(body))
	}
}

/// Message posted through [`WebhookTarget::execute`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExecuteWebhook {
	/// Message text.
	#[serde(skip_serializing_if = "String::is_empty")]
	pub content: String,
	/// Overrides the webhook's display name.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub username: Option<String>,
	/// Overrides the webhook's avatar.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub avatar_url: Option<String>,
	/// Embed objects.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub embeds: Vec<Value>,
	/// Text-to-speech flag.
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub tts: bool,
	/// Snowflake used for optimistic sending.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub nonce: Option<String>,
	/// Files uploaded with the message.
	#[serde(skip)]
	pub files: Vec<FileAttachment>,
}
impl ExecuteWebhook {
	/// Message with the given text.
	pub fn new(content: impl Into<String>) -> Self {
		Self { content: content.into(), ..Default::default() }
	}

	/// Sets the display name.
	pub fn with_username(mut self, username: impl Into<String>) -> Self {
		self.username = Some(username.into());

		self
	}

	/// Sets the avatar URL.
	pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
		self.avatar_url = Some(url.into());

		self
	}

	/// Appends an embed.
	pub fn with_embed(mut self, embed: Value) -> Self {
		self.embeds.push(embed);

		self
	}

	/// Enables text-to-speech.
	pub fn with_tts(mut self) -> Self {
		self.tts = true;

		self
	}

	/// Sets the nonce.
	pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
		self.nonce = Some(nonce.into());

		self
	}

	/// Appends a file.
	pub fn with_file(mut self, file: FileAttachment) -> Self {
		self.files.push(file);

		self
	}
}

/// Renders image bytes as `data:<mime>;base64,<payload>`.
pub fn data_uri(bytes: &[u8]) -> String {
	format!("data:{};base64,{}", sniff_image_type(bytes), STANDARD.encode(bytes))
}

fn sniff_image_type(bytes: &[u8]) -> &'static str {
	match bytes {
		[0x89, b'P', b'N', b'G', ..] => "image/png",
		[0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
		[b'G', b'I', b'F', b'8', ..] => "image/gif",
		[b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
		_ => "application/octet-stream",
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::request::RequestMethod;

	fn token_bound() -> WebhookTarget {
		WebhookTarget::new(WebhookId::from(5), Some(WebhookToken::new("hook-token")))
	}

	fn bot() -> WebhookTarget {
		WebhookTarget::new(WebhookId::from(5), None)
	}

	#[test]
	fn routes_follow_the_target() {
		assert_eq!(token_bound().route(), "webhooks/5/hook-token");
		assert_eq!(bot().route(), "webhooks/5");
		assert!(token_bound().get().no_auth);
		assert!(!bot().delete().no_auth);
		assert_eq!(bot().delete().method, RequestMethod::Delete);
	}

	#[test]
	fn edits_render_avatar_data_uris() {
		let edit = WebhookEdit::default()
			.with_name("Captain Hook")
			.with_channel(ChannelId::from(9))
			.with_avatar(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A]);
		let descriptor = bot().modify(&edit).expect("Non-empty edits should build.");

		assert_eq!(descriptor.method, RequestMethod::Patch);
		assert_eq!(
			descriptor.body,
			Some(json!({
				"name": "Captain Hook",
				"channel_id": "9",
				"avatar": "data:image/png;base64,iVBORw0K",
			}))
		);
	}

	#[test]
	fn empty_edits_are_rejected() {
		let err = bot().modify(&WebhookEdit::default()).expect_err("Empty edits should fail.");

		assert!(matches!(err, ConfigError::EmptyWebhookEdit));
	}

	#[test]
	fn execute_waits_and_skips_unset_fields() {
		let descriptor = token_bound()
			.execute(
				ExecuteWebhook::new("hello")
					.with_username("bot")
					.with_file(FileAttachment::from_bytes(b"log".to_vec()).with_filename("a.log")),
			)
			.expect("Token-bound webhooks can execute.");

		assert_eq!(descriptor.route, "webhooks/5/hook-token");
		assert_eq!(descriptor.query, [("wait".to_owned(), "true".to_owned())]);
		assert_eq!(descriptor.body, Some(json!({ "content": "hello", "username": "bot" })));
		assert_eq!(descriptor.files.len(), 1);
		assert!(descriptor.no_auth);
	}

	#[test]
	fn executing_without_a_token_fails() {
		let err = bot().execute(ExecuteWebhook::new("hi")).expect_err("Bot targets cannot execute.");

		assert!(matches!(err, ConfigError::WebhookTokenRequired { id } if id == "5"));
	}

	#[test]
	fn unknown_images_fall_back_to_octet_stream() {
		assert_eq!(data_uri(b"abc"), "data:application/octet-stream;base64,YWJj");
		assert!(data_uri(&[0xFF, 0xD8, 0xFF, 0xE0]).starts_with("data:image/jpeg;"));
	}
}
