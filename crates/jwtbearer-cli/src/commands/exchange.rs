use std::sync::Arc;

use anyhow::{Context, Result, bail};
use jwtbearer_grant::{
    AccessRequest, Client, GrantType, JWT_BEARER_GRANT_TYPE, JwtAccessTokenIssuer,
    JwtBearerConfig, JwtBearerGrantHandler, JwtBearerSession, TokenEndpoint,
};
use jwtbearer_memory::{InMemoryJtiStorage, KeyRegistry};

use crate::cli::ExchangeArgs;
use crate::output::{print_json, print_success};

use super::read_assertion;

pub async fn exchange(args: &ExchangeArgs) -> Result<()> {
    let config = JwtBearerConfig::load(&args.config)
        .with_context(|| format!("Invalid configuration {}", args.config.display()))?;
    let keys = KeyRegistry::load(&args.keys)
        .with_context(|| format!("Invalid key registry {}", args.keys.display()))?
        .into_storage();
    let assertion = read_assertion(&args.assertion)?;

    let token_issuer =
        JwtAccessTokenIssuer::hmac(&args.token_issuer, args.signing_secret.as_bytes());
    let handler = JwtBearerGrantHandler::new(
        config,
        Arc::new(keys),
        Arc::new(InMemoryJtiStorage::new()),
        Arc::new(token_issuer),
    );
    let endpoint = TokenEndpoint::new().with_handler(Arc::new(handler));

    let client = Arc::new(Client::new(&args.client_id).with_grant_type(GrantType::JwtBearer));
    let body = form_body(&assertion, &args.scopes, &args.audiences);
    let mut request = AccessRequest::from_form(&body, client, Box::new(JwtBearerSession::new()));

    if endpoint.can_skip_client_auth(&request) {
        tracing::debug!("Client authentication skipped for this request");
    }

    match endpoint.exchange(&mut request).await {
        Ok(response) => {
            print_json(&serde_json::to_value(&response)?)?;
            print_success(&format!(
                "Access token issued for subject \"{}\"",
                request.session().subject()
            ));
            Ok(())
        }
        Err(err) => {
            print_json(&err.to_error_body())?;
            bail!("Token request rejected ({})", err.oauth_error_code())
        }
    }
}

fn form_body(assertion: &str, scopes: &[String], audiences: &[String]) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("grant_type", JWT_BEARER_GRANT_TYPE);
    form.append_pair("assertion", assertion);
    if !scopes.is_empty() {
        form.append_pair("scope", &scopes.join(" "));
    }
    for audience in audiences {
        form.append_pair("audience", audience);
    }
    form.finish()
}
