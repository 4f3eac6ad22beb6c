//! Token endpoint access request.
//!
//! Transport is out of scope: an [`AccessRequest`] is built from an already
//! received `application/x-www-form-urlencoded` body plus the client and the
//! session the enclosing framework resolved for it.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use super::session::Session;
use crate::types::Client;

/// A token endpoint request moving through validation and issuance.
#[derive(Debug)]
pub struct AccessRequest {
    id: Uuid,
    grant_types: Vec<String>,
    form: HashMap<String, Vec<String>>,
    requested_scopes: Vec<String>,
    requested_audience: Vec<String>,
    granted_scopes: Vec<String>,
    granted_audience: Vec<String>,
    client: Arc<Client>,
    session: Box<dyn Session>,
}

impl AccessRequest {
    /// Creates an empty request for `client` bound to `session`.
    pub fn new(client: Arc<Client>, session: Box<dyn Session>) -> Self {
        Self {
            id: Uuid::new_v4(),
            grant_types: Vec::new(),
            form: HashMap::new(),
            requested_scopes: Vec::new(),
            requested_audience: Vec::new(),
            granted_scopes: Vec::new(),
            granted_audience: Vec::new(),
            client,
            session,
        }
    }

    /// Builds a request from a form-encoded token request body.
    ///
    /// `grant_type`, `scope` and `audience` are space-delimited lists;
    /// `audience` may also be repeated.
    pub fn from_form(body: &str, client: Arc<Client>, session: Box<dyn Session>) -> Self {
        let mut request = Self::new(client, session);
        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            request
                .form
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        request.grant_types = request.split_form_values("grant_type");
        request.requested_scopes = request.split_form_values("scope");
        request.requested_audience = request.split_form_values("audience");
        request
    }

    fn split_form_values(&self, key: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for value in self.form.get(key).into_iter().flatten() {
            for item in value.split_whitespace() {
                if !out.iter().any(|v| v == item) {
                    out.push(item.to_string());
                }
            }
        }
        out
    }

    /// Sets the declared grant types.
    #[must_use]
    pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.grant_types.push(grant_type.into());
        self
    }

    /// Sets a form parameter, replacing previous values.
    #[must_use]
    pub fn with_form_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), vec![value.into()]);
        self
    }

    /// Adds a requested scope.
    #[must_use]
    pub fn with_requested_scope(mut self, scope: impl Into<String>) -> Self {
        let scope = scope.into();
        if !self.requested_scopes.contains(&scope) {
            self.requested_scopes.push(scope);
        }
        self
    }

    /// Adds a requested audience.
    #[must_use]
    pub fn with_requested_audience(mut self, audience: impl Into<String>) -> Self {
        let audience = audience.into();
        if !self.requested_audience.contains(&audience) {
            self.requested_audience.push(audience);
        }
        self
    }

    /// Unique identifier of this request.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Grant types declared by the request.
    #[must_use]
    pub fn grant_types(&self) -> &[String] {
        &self.grant_types
    }

    /// Returns `true` if the request declares exactly one grant type and it
    /// is `grant_type`.
    #[must_use]
    pub fn has_exactly_one_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types.len() == 1 && self.grant_types[0] == grant_type
    }

    /// First value of a form parameter, or `None` if absent or empty.
    #[must_use]
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Scopes requested by the client.
    #[must_use]
    pub fn requested_scopes(&self) -> &[String] {
        &self.requested_scopes
    }

    /// Audiences requested by the client.
    #[must_use]
    pub fn requested_audience(&self) -> &[String] {
        &self.requested_audience
    }

    /// Grants `scope`; granting twice has no effect.
    pub fn grant_scope(&mut self, scope: &str) {
        if !self.granted_scopes.iter().any(|s| s == scope) {
            self.granted_scopes.push(scope.to_string());
        }
    }

    /// Grants `audience`; granting twice has no effect.
    pub fn grant_audience(&mut self, audience: &str) {
        if !self.granted_audience.iter().any(|a| a == audience) {
            self.granted_audience.push(audience.to_string());
        }
    }

    /// Scopes granted so far, in grant order.
    #[must_use]
    pub fn granted_scopes(&self) -> &[String] {
        &self.granted_scopes
    }

    /// Audiences granted so far, in grant order.
    #[must_use]
    pub fn granted_audience(&self) -> &[String] {
        &self.granted_audience
    }

    /// The client the request was made by.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The session the issued token will be bound to.
    #[must_use]
    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Mutable access to the session.
    pub fn session_mut(&mut self) -> &mut dyn Session {
        self.session.as_mut()
    }
}
