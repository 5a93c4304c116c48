//! REST API client for the clinic backend.
//!
//! This module provides the `ApiClient` for issuing authenticated requests
//! against a single base origin, plus typed wrappers for the clinic
//! resources (patients, appointments, bills, diagnoses, treatments).
//!
//! Requests carry a JWT bearer token from the shared `Session`; expired
//! tokens are refreshed once per request through the refresh endpoint.

pub mod client;
pub mod clinic;
pub mod error;
pub mod retry;

pub use client::{ApiClient, FormBuilder, RequestOptions, LOGIN_PATH, REFRESH_PATH, SIGNUP_PATH};
pub use error::ApiError;
pub use reqwest::Method;
