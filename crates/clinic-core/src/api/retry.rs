//! Refresh-and-retry wrapper around a single authenticated send.
//!
//! Kept free of HTTP and session types: the caller supplies a `send`
//! closure (issue the request with a given token) and a `refresh` closure
//! (obtain a new token after a rejection). The refresh budget is an explicit
//! counter, so the "at most one refresh per request" rule does not depend on
//! mutating the request.

use std::future::Future;

use tracing::{debug, warn};

use super::ApiError;

/// Refresh-and-retry cycles allowed per original request.
pub const MAX_REFRESH_ATTEMPTS: u32 = 1;

/// Run `send`, refreshing the token and re-sending on `Unauthorized` while
/// `budget` allows.
///
/// A rejection with no budget left, or a failed refresh, resolves to
/// `ApiError::Unauthenticated`. Every other error is returned unchanged.
pub async fn with_refresh<T, S, SFut, R, RFut>(
    token: Option<String>,
    mut budget: u32,
    mut send: S,
    mut refresh: R,
) -> Result<T, ApiError>
where
    S: FnMut(Option<String>) -> SFut,
    SFut: Future<Output = Result<T, ApiError>>,
    R: FnMut(Option<String>) -> RFut,
    RFut: Future<Output = Result<String, ApiError>>,
{
    let mut token = token;
    loop {
        match send(token.clone()).await {
            Err(ApiError::Unauthorized) if budget > 0 => {
                budget -= 1;
                debug!(remaining = budget, "Request rejected with 401, refreshing token");
                match refresh(token.take()).await {
                    Ok(fresh) => token = Some(fresh),
                    Err(e) => {
                        warn!(error = %e, "Token refresh failed");
                        return Err(ApiError::Unauthenticated);
                    }
                }
            }
            Err(ApiError::Unauthorized) => {
                warn!("Request rejected after token refresh");
                return Err(ApiError::Unauthenticated);
            }
            other => return other,
        }
    }
}
