//! Authorization gate for template creation.
//!
//! The policy engine lives outside this service. Here we only check the
//! shared API token and supply the account/author context recorded on
//! created templates.

use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::state::AppConfig;

/// Identity a request operates under once authorized.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub author_id: String,
}

/// Gate for the template-create operation.
///
/// With no token configured the gate is open (local development).
pub fn can_create_template(
    config: &AppConfig,
    headers: &HeaderMap,
) -> Result<AuthContext, ApiError> {
    if let Some(expected) = &config.api_token {
        let presented = headers.get("x-auth-token").and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized);
        }
    }

    Ok(AuthContext {
        account_id: config.account_id.clone(),
        author_id: config.author_id.clone(),
    })
}
