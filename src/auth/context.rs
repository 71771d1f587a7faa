use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ApiToken;

/// Authenticated caller, attached to request extensions by the middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Label of the API token that was presented
    pub label: String,
}

impl Principal {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Loading,
    Authenticated(Principal),
    Unauthenticated,
}

/// Resolves bearer tokens against the configured API tokens.
///
/// With no tokens configured every caller is anonymous but authenticated.
#[derive(Debug)]
pub struct AuthProvider {
    /// secret -> label; `None` disables auth
    tokens: Option<HashMap<String, String>>,
    ready: AtomicBool,
}

impl AuthProvider {
    /// Provider that is ready to answer immediately.
    pub fn from_tokens(tokens: &[ApiToken]) -> Self {
        let provider = Self::pending(tokens);
        provider.mark_ready();
        provider
    }

    /// Provider that reports `Loading` until [`AuthProvider::mark_ready`].
    pub fn pending(tokens: &[ApiToken]) -> Self {
        let tokens = (!tokens.is_empty()).then(|| {
            tokens
                .iter()
                .map(|t| (t.secret.clone(), t.label.clone()))
                .collect()
        });

        Self {
            tokens,
            ready: AtomicBool::new(false),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn resolve(&self, bearer: Option<&str>) -> AuthStatus {
        if !self.ready.load(Ordering::SeqCst) {
            return AuthStatus::Loading;
        }

        let Some(tokens) = &self.tokens else {
            return AuthStatus::Authenticated(Principal::anonymous());
        };

        match bearer.and_then(|secret| tokens.get(secret)) {
            Some(label) => AuthStatus::Authenticated(Principal::new(label.clone())),
            None => AuthStatus::Unauthenticated,
        }
    }
}
