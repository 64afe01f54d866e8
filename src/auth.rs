//! Credentials and validated identifiers attached to outbound requests.

pub mod id;
pub mod secret;

pub use id::*;
pub use secret::*;
