//! Session and token storage.
//!
//! This module provides:
//! - `Session`: the in-memory + durable bearer token holder shared by the client
//! - `TokenStore`: durable storage backends (file, OS keyring, memory)
//!
//! The token is persisted under a single fixed key; absence means logged out.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::KeyringTokenStore;
pub use session::Session;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
