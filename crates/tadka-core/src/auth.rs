//! Login, registration and logout against the dj-rest-auth endpoints.
//!
//! These are the only writers of the token store besides explicit logout.

use crate::error::{AuthResult, GatewayError};
use crate::gateway::Gateway;
use crate::token_store::{Credential, TokenStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const REGISTRATION_PATH: &str = "/api/auth/registration/";

pub const LOGIN_FAILED: &str = "Login failed. Check your credentials.";
pub const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegistrationRequest<'a> {
    email: &'a str,
    password1: &'a str,
    password2: &'a str,
}

/// Login response; JWT setups send `access`, others `access_token`.
#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

impl LoginResponse {
    fn into_token(self) -> Option<String> {
        self.access
            .filter(|t| !t.is_empty())
            .or(self.access_token.filter(|t| !t.is_empty()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A bearer token came back and is now persisted.
    TokenStored,
    /// Login succeeded but the server issued no token (cookie-only session).
    NoToken,
}

pub struct AuthClient {
    gateway: Gateway,
    store: Arc<dyn TokenStore>,
}

impl AuthClient {
    pub fn new(gateway: Gateway) -> Self {
        let store = Arc::clone(gateway.token_store());
        Self { gateway, store }
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<LoginOutcome> {
        let response: Option<LoginResponse> = self
            .gateway
            .post(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        match response.and_then(LoginResponse::into_token) {
            Some(token) => {
                self.store.set(Credential::new(token))?;
                info!("Login succeeded, credential stored");
                Ok(LoginOutcome::TokenStored)
            }
            None => {
                warn!("Login succeeded without an access token");
                Ok(LoginOutcome::NoToken)
            }
        }
    }

    /// Create an account. The caller then sends the user to the login page;
    /// registration does not sign in.
    pub async fn register(&self, email: &str, password1: &str, password2: &str) -> AuthResult<()> {
        let _: Option<serde_json::Value> = self
            .gateway
            .post(
                REGISTRATION_PATH,
                &RegistrationRequest {
                    email,
                    password1,
                    password2,
                },
            )
            .await?;
        info!("Registration accepted");
        Ok(())
    }

    pub fn logout(&self) -> AuthResult<()> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    /// React to a failed API call: an `Unauthorized` ends the session so the
    /// next protected navigation goes through login again. Returns whether
    /// the credential was cleared.
    pub fn handle_failure(&self, err: &GatewayError) -> AuthResult<bool> {
        if !err.is_unauthorized() {
            return Ok(false);
        }
        self.store.clear()?;
        warn!("Credential rejected by API, session cleared");
        Ok(true)
    }
}
