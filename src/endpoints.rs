//! Descriptor builders for concrete REST endpoints.

pub mod webhook;

pub use webhook::*;
