//! Authenticated API client construction
//!
//! The adapter never talks to the vendor API itself. It only constructs
//! clients through a [`ClientFactory`] and hands them to user code.

use reqwest::{Method, RequestBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("username is required")]
    MissingUsername,

    #[error("password is required")]
    MissingPassword,

    #[error("accountSid must start with AC")]
    InvalidAccountSid,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Extra configuration accepted when constructing a client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub region: Option<String>,
    pub edge: Option<String>,
    pub timeout: Option<Duration>,
}

/// An authenticated API client handed to functions
pub trait Client: Send + Sync + fmt::Debug {
    /// Account the client authenticates as
    fn account_sid(&self) -> &str;

    /// Start an authenticated request against `path`
    fn request(&self, method: Method, path: &str) -> RequestBuilder;
}

/// Constructs authenticated clients from an account sid and auth token.
///
/// Both credentials are passed exactly as configured, missing ones as `None`.
/// Validation is the factory's business and its errors propagate unchanged.
pub trait ClientFactory: Send + Sync {
    fn create(
        &self,
        account_sid: Option<&str>,
        auth_token: Option<&str>,
        options: &ClientOptions,
    ) -> Result<Arc<dyn Client>, ClientError>;
}

/// Thin REST client: validated credentials plus basic-auth request building
pub struct ApiClient {
    account_sid: String,
    auth_token: String,
    options: ClientOptions,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(
        account_sid: Option<&str>,
        auth_token: Option<&str>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let account_sid = account_sid
            .filter(|sid| !sid.is_empty())
            .ok_or(ClientError::MissingUsername)?;
        let auth_token = auth_token
            .filter(|token| !token.is_empty())
            .ok_or(ClientError::MissingPassword)?;
        if !account_sid.starts_with("AC") {
            return Err(ClientError::InvalidAccountSid);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            options,
            http: builder.build()?,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// API host, taking region and edge routing into account
    pub fn base_url(&self) -> String {
        let region = match (&self.options.region, &self.options.edge) {
            (Some(region), _) => Some(region.as_str()),
            // An edge without a region routes through the default region.
            (None, Some(_)) => Some("us1"),
            (None, None) => None,
        };

        let mut host = String::from("api");
        if let Some(edge) = &self.options.edge {
            host.push('.');
            host.push_str(edge);
        }
        if let Some(region) = region {
            host.push('.');
            host.push_str(region);
        }
        format!("https://{}.twilio.com", host)
    }
}

impl Client for ApiClient {
    fn account_sid(&self) -> &str {
        &self.account_sid
    }

    // `path` is relative to the API host.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url(), path.trim_start_matches('/'));
        self.http
            .request(method, url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("account_sid", &self.account_sid)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Default factory producing [`ApiClient`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiClientFactory;

impl ClientFactory for ApiClientFactory {
    fn create(
        &self,
        account_sid: Option<&str>,
        auth_token: Option<&str>,
        options: &ClientOptions,
    ) -> Result<Arc<dyn Client>, ClientError> {
        let client = ApiClient::new(account_sid, auth_token, options.clone())?;
        Ok(Arc::new(client))
    }
}
