//! Client for the SP HTTP JSON API.
//!
//! - `http_client`: transport and envelope decoding
//! - `client`: typed endpoints behind the backend traits
//! - `types`: request and response shapes

pub mod client;
pub mod http_client;
pub mod types;

pub use client::{PromptBackend, ServiceBackend, SessionBackend};
pub use http_client::{decode_envelope, ApiClient};
pub use types::*;
