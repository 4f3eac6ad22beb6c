//! Token endpoint dispatch.
//!
//! A token endpoint hosts several grant handlers. Each request goes through
//! two phases: every handler validates it (`handle_token_endpoint_request`),
//! then every handler contributes to the response
//! (`populate_token_endpoint_response`). Handlers that answer
//! [`GrantError::UnknownRequest`] are skipped.

use std::sync::Arc;

use async_trait::async_trait;

use super::request::AccessRequest;
use super::response::AccessResponse;
use crate::GrantResult;
use crate::error::GrantError;

/// A grant type implementation plugged into the token endpoint.
#[async_trait]
pub trait TokenEndpointHandler: Send + Sync {
    /// Returns `true` if the handler is responsible for `request`.
    fn can_handle_token_endpoint_request(&self, request: &AccessRequest) -> bool;

    /// Returns `true` if the request may proceed without client authentication.
    fn can_skip_client_auth(&self, request: &AccessRequest) -> bool;

    /// Validation phase: checks the request and prepares its session.
    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> GrantResult<()>;

    /// Issuance phase: writes the issued token(s) into `response`.
    async fn populate_token_endpoint_response(
        &self,
        request: &AccessRequest,
        response: &mut AccessResponse,
    ) -> GrantResult<()>;
}

/// Runs a request through a list of grant handlers.
#[derive(Clone, Default)]
pub struct TokenEndpoint {
    handlers: Vec<Arc<dyn TokenEndpointHandler>>,
}

impl TokenEndpoint {
    /// Creates an endpoint with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Handlers run in registration order.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn TokenEndpointHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Returns `true` if any handler would let `request` skip client
    /// authentication.
    #[must_use]
    pub fn can_skip_client_auth(&self, request: &AccessRequest) -> bool {
        self.handlers.iter().any(|h| {
            h.can_handle_token_endpoint_request(request) && h.can_skip_client_auth(request)
        })
    }

    /// Validation phase.
    ///
    /// # Errors
    ///
    /// Returns the first handler error other than `UnknownRequest`, or
    /// `UnsupportedGrantType` if no handler accepted the request.
    pub async fn handle_access_request(&self, request: &mut AccessRequest) -> GrantResult<()> {
        let mut handled = false;
        for handler in &self.handlers {
            match handler.handle_token_endpoint_request(request).await {
                Ok(()) => handled = true,
                Err(GrantError::UnknownRequest) => continue,
                Err(err) => return Err(err),
            }
        }

        if !handled {
            return Err(GrantError::unsupported_grant_type(
                request.grant_types().join(" "),
            ));
        }
        Ok(())
    }

    /// Issuance phase.
    ///
    /// # Errors
    ///
    /// Returns the first handler error other than `UnknownRequest`, or a
    /// server error if no handler issued an access token.
    pub async fn populate_access_response(
        &self,
        request: &AccessRequest,
    ) -> GrantResult<AccessResponse> {
        let mut response = AccessResponse::new();
        for handler in &self.handlers {
            match handler
                .populate_token_endpoint_response(request, &mut response)
                .await
            {
                Ok(()) | Err(GrantError::UnknownRequest) => {}
                Err(err) => return Err(err),
            }
        }

        if response.access_token.is_empty() || response.token_type.is_empty() {
            return Err(GrantError::server_error(
                "An internal error occurred while trying to issue an access token.",
            ));
        }
        Ok(response)
    }

    /// Runs both phases.
    ///
    /// # Errors
    ///
    /// See [`Self::handle_access_request`] and [`Self::populate_access_response`].
    pub async fn exchange(&self, request: &mut AccessRequest) -> GrantResult<AccessResponse> {
        self.handle_access_request(request).await?;
        self.populate_access_response(request).await
    }
}
