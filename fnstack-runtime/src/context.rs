//! Per-invocation execution context

use crate::client::{Client, ClientError, ClientFactory, ClientOptions};
use crate::config::RuntimeConfig;
use crate::scope::{self, GlobalScope, ScopeError};
use fnstack_core::Credentials;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Synthetic context key holding the derived domain name
pub const DOMAIN_NAME: &str = "DOMAIN_NAME";

/// Read-only record handed to a function alongside its event.
///
/// A snapshot of the configuration taken at construction time. Every
/// invocation gets its own context.
#[derive(Clone)]
pub struct ExecutionContext {
    domain_name: String,
    credentials: Credentials,
    env: HashMap<String, String>,
    factory: Arc<dyn ClientFactory>,
    scope: Option<Arc<GlobalScope>>,
}

impl ExecutionContext {
    /// `host[:port]` of the configured base URL
    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn account_sid(&self) -> Option<&str> {
        self.credentials.account_sid()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.credentials.auth_token()
    }

    /// Every configured environment entry, verbatim
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Look up an environment value, or the derived `DOMAIN_NAME`
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == DOMAIN_NAME {
            return Some(&self.domain_name);
        }
        self.env.get(key).map(String::as_str)
    }

    /// Construct a new authenticated client from the captured credentials.
    ///
    /// Not cached: each call goes through the client factory.
    pub fn get_client(
        &self,
        options: Option<ClientOptions>,
    ) -> Result<Arc<dyn Client>, ClientError> {
        self.factory.create(
            self.credentials.account_sid(),
            self.credentials.auth_token(),
            &options.unwrap_or_default(),
        )
    }

    /// Attach the scope this invocation runs in
    pub fn with_scope(mut self, scope: Arc<GlobalScope>) -> Self {
        self.scope = Some(scope);
        self
    }

    /// The attached scope, or the process-wide one when none was attached
    pub fn scope(&self) -> Result<Arc<GlobalScope>, ScopeError> {
        match &self.scope {
            Some(scope) => Ok(Arc::clone(scope)),
            None => scope::global_scope().ok_or(ScopeError::NotInitialized),
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("domain_name", &self.domain_name)
            .field("credentials", &self.credentials)
            .field("env_keys", &self.env.keys().collect::<Vec<_>>())
            .field("scoped", &self.scope.is_some())
            .finish_non_exhaustive()
    }
}

/// Build the execution context for one invocation
pub fn construct_context(config: &RuntimeConfig, factory: Arc<dyn ClientFactory>) -> ExecutionContext {
    ExecutionContext {
        domain_name: domain_name(&config.url),
        credentials: config.credentials(),
        env: config.env.clone(),
        factory,
        scope: None,
    }
}

/// Extract `host[:port]` from a URL, dropping scheme, userinfo and path.
///
/// The port is kept exactly as written, including a scheme default like `:443`.
pub fn domain_name(url: &str) -> String {
    match Url::parse(url) {
        Ok(_) => {
            let rest = url.split_once("://").map_or("", |(_, rest)| rest);
            let authority = rest
                .split(|c| matches!(c, '/' | '?' | '#'))
                .next()
                .unwrap_or_default();
            let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
            host.to_ascii_lowercase()
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Unable to derive domain name from base URL");
            String::new()
        }
    }
}
