//! Core library for clinic-dash.
//!
//! Provides the authenticated API client for the clinic backend, the
//! session/token storage it relies on, data models, configuration, and the
//! client-side joins used to build list views.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
pub mod views;

pub use api::{ApiClient, ApiError, RequestOptions};
pub use auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, Session, TokenStore};
pub use config::{Config, TokenBackend};
