//! Access token issuance strategy.

use async_trait::async_trait;

use crate::GrantResult;
use crate::oauth::{AccessRequest, AccessResponse};

/// Mints an access token for a validated request.
///
/// The grant handler decides the token lifespan; the issuer decides the
/// token format.
#[async_trait]
pub trait AccessTokenIssuer: Send + Sync {
    /// Issues an access token valid for `lifespan` and writes it, its
    /// type, lifetime and granted scopes into `response`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the token cannot be produced.
    async fn issue_access_token(
        &self,
        lifespan: time::Duration,
        request: &AccessRequest,
        response: &mut AccessResponse,
    ) -> GrantResult<()>;
}
