//! Snowflake identifiers used when building routes.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_snowflake($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<u64> for $name {
			fn from(value: u64) -> Self {
				Self(value.to_string())
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_snowflake($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

/// Longest decimal rendering of a 64-bit snowflake.
const SNOWFLAKE_MAX_LEN: usize = 20;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (webhook, channel).
		kind: &'static str,
	},
	/// The identifier contains something other than ASCII digits.
	#[error("{kind} identifier must contain only ASCII digits.")]
	NotNumeric {
		/// Kind of identifier (webhook, channel).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (webhook, channel).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { WebhookId, "Snowflake identifying a webhook.", "Webhook" }
def_id! { ChannelId, "Snowflake identifying a channel.", "Channel" }

/// Returns `true` when `segment` looks like a snowflake (non-empty, digits only).
pub fn is_snowflake(segment: &str) -> bool {
	!segment.is_empty()
		&& segment.len() <= SNOWFLAKE_MAX_LEN
		&& segment.bytes().all(|b| b.is_ascii_digit())
}

fn validate_snowflake(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if !view.bytes().all(|b| b.is_ascii_digit()) {
		return Err(IdentifierError::NotNumeric { kind });
	}
	if view.len() > SNOWFLAKE_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: SNOWFLAKE_MAX_LEN });
	}

	Ok(())
}
