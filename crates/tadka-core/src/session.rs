//! Session guard. Decides whether a protected view may render.
//!
//! The guard reads the token store on every call and caches nothing, so it
//! always reflects the current credential. It never mutates anything and is
//! safe to call on every render.

use crate::config::ClientConfig;
use crate::token_store::TokenStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Login entry point used when no other is configured.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    NoCredential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(DenialReason),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed)
    }
}

/// Redirect signal for a denied protected destination. `from` is preserved so
/// navigation can resume there after login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRedirect {
    pub to: String,
    pub from: String,
}

/// What a protected view should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(LoginRedirect),
}

#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn TokenStore>,
    login_path: String,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self::with_login_path(store, DEFAULT_LOGIN_PATH)
    }

    /// Guard redirecting to the configured `login_path`.
    pub fn from_config(config: &ClientConfig, store: Arc<dyn TokenStore>) -> Self {
        Self::with_login_path(store, config.login_path.clone())
    }

    pub fn with_login_path(store: Arc<dyn TokenStore>, login_path: impl Into<String>) -> Self {
        Self {
            store,
            login_path: login_path.into(),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// `Denied` iff the store holds no credential right now.
    pub fn authorize(&self) -> Authorization {
        if self.store.get().is_some() {
            Authorization::Allowed
        } else {
            Authorization::Denied(DenialReason::NoCredential)
        }
    }

    /// Decide for a protected `destination` (path plus query, as requested).
    pub fn guard(&self, destination: &str) -> GuardDecision {
        match self.authorize() {
            Authorization::Allowed => GuardDecision::Render,
            Authorization::Denied(reason) => {
                debug!(destination, ?reason, "Protected view denied, redirecting to login");
                GuardDecision::Redirect(LoginRedirect {
                    to: self.login_path.clone(),
                    from: destination.to_string(),
                })
            }
        }
    }
}
