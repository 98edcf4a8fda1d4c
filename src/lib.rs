//! TrackGPX - client library and CLI for the TrackGPX fleet-tracking platform
//!
//! This library provides the REST client, the persistent session, typed
//! service wrappers for every backend area, card tokenization through the
//! payment provider, and fleet map rendering.

// Core modules
pub mod cli;
pub mod client;
pub mod config;
pub mod map;
pub mod models;
pub mod services;
pub mod session;
pub mod utils;

// Re-exports for convenience
pub use client::{ApiClient, ApiError};
pub use config::Config;
pub use session::SessionStore;
