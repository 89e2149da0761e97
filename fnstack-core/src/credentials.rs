//! Account credentials captured from the runtime environment

/// Environment key holding the account identifier
pub const ACCOUNT_SID: &str = "ACCOUNT_SID";

/// Environment key holding the auth token
pub const AUTH_TOKEN: &str = "AUTH_TOKEN";

/// Account sid and auth token pair used to authenticate API clients.
///
/// Either half may be missing. Credentials are never validated here; the
/// client constructor decides what it accepts.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Credentials {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
}

impl Credentials {
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: Some(account_sid.into()),
            auth_token: Some(auth_token.into()),
        }
    }

    /// Pick the credentials out of an environment mapping
    pub fn from_env<'a, I>(env: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut credentials = Self::default();
        for (key, value) in env {
            match key.as_str() {
                ACCOUNT_SID => credentials.account_sid = Some(value.clone()),
                AUTH_TOKEN => credentials.auth_token = Some(value.clone()),
                _ => {}
            }
        }
        credentials
    }

    pub fn account_sid(&self) -> Option<&str> {
        self.account_sid.as_deref()
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

// The auth token stays out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
