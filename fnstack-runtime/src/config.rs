//! Runtime configuration consumed by context and scope construction

use fnstack_core::Credentials;
use std::collections::HashMap;

/// Base URL and environment handed to every invocation
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Public base URL of the runtime, e.g. `http://localhost:3000`
    pub url: String,
    /// Environment passed through to functions, including `ACCOUNT_SID` and `AUTH_TOKEN`
    pub env: HashMap<String, String>,
}

impl RuntimeConfig {
    pub fn new(url: impl Into<String>, env: HashMap<String, String>) -> Self {
        Self {
            url: url.into(),
            env,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::from_env(&self.env)
    }
}
