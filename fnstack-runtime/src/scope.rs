//! Process-wide capabilities exposed to functions
//!
//! A [`GlobalScope`] bundles three bindings:
//!
//! - a [`Namespace`] with client construction, the `Response` builder and the
//!   TwiML builders
//! - a [`SharedClient`] constructed at most once from the configured
//!   credentials and reused afterwards
//! - a [`RuntimeRegistry`] answering asset, function and sync lookups
//!
//! Scopes are normally handed to functions through their context. The
//! installed scope is also reachable through [`global_scope`].

use crate::client::{Client, ClientError, ClientFactory, ClientOptions};
use crate::config::RuntimeConfig;
use crate::discovery::{
    AssetInfo, DiscoveryError, FunctionInfo, ResourceDiscovery, SyncServiceRef,
    DEFAULT_SYNC_SERVICE,
};
use crate::response::Response;
use crate::twiml::{FaxResponse, MessagingResponse, VoiceResponse};
use fnstack_core::Credentials;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Global scope has not been initialized")]
    NotInitialized,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Collaborators a scope is built from
#[derive(Clone)]
pub struct ScopeDependencies {
    pub factory: Arc<dyn ClientFactory>,
    pub discovery: Arc<dyn ResourceDiscovery>,
}

/// Constructors available to functions
#[derive(Clone)]
pub struct Namespace {
    factory: Arc<dyn ClientFactory>,
}

impl Namespace {
    /// Build a client from explicit credentials; errors come from the factory
    pub fn client(
        &self,
        account_sid: Option<&str>,
        auth_token: Option<&str>,
        options: Option<ClientOptions>,
    ) -> Result<Arc<dyn Client>, ClientError> {
        self.factory
            .create(account_sid, auth_token, &options.unwrap_or_default())
    }

    pub fn response(&self) -> Response {
        Response::new()
    }

    pub fn voice_response(&self) -> VoiceResponse {
        VoiceResponse::new()
    }

    pub fn messaging_response(&self) -> MessagingResponse {
        MessagingResponse::new()
    }

    pub fn fax_response(&self) -> FaxResponse {
        FaxResponse::new()
    }
}

/// Lazily constructed client shared by every invocation
pub struct SharedClient {
    credentials: Credentials,
    factory: Arc<dyn ClientFactory>,
    cell: OnceCell<Arc<dyn Client>>,
}

impl SharedClient {
    pub fn new(credentials: Credentials, factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            credentials,
            factory,
            cell: OnceCell::new(),
        }
    }

    /// The cached client, constructing it on first use.
    ///
    /// Concurrent first callers block until a single construction finishes.
    /// A failed construction is not cached.
    pub fn get(&self) -> Result<Arc<dyn Client>, ClientError> {
        self.cell
            .get_or_try_init(|| {
                debug!("Constructing shared client");
                self.factory.create(
                    self.credentials.account_sid(),
                    self.credentials.auth_token(),
                    &ClientOptions::default(),
                )
            })
            .map(Arc::clone)
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl fmt::Debug for SharedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedClient")
            .field("credentials", &self.credentials)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Asset, function and sync lookups
#[derive(Clone)]
pub struct RuntimeRegistry {
    discovery: Arc<dyn ResourceDiscovery>,
}

impl RuntimeRegistry {
    pub fn get_assets(&self) -> Result<BTreeMap<String, AssetInfo>, DiscoveryError> {
        self.discovery.assets()
    }

    pub fn get_functions(&self) -> Result<BTreeMap<String, FunctionInfo>, DiscoveryError> {
        self.discovery.functions()
    }

    /// Look up a sync service, `default` when unnamed
    pub fn get_sync(&self, service_name: Option<&str>) -> Result<SyncServiceRef, DiscoveryError> {
        self.discovery
            .sync_service(service_name.unwrap_or(DEFAULT_SYNC_SERVICE))
    }
}

pub struct GlobalScope {
    credentials: Credentials,
    namespace: Namespace,
    client: Arc<SharedClient>,
    runtime: RuntimeRegistry,
}

impl GlobalScope {
    /// Build a scope without installing it
    pub fn new(config: &RuntimeConfig, dependencies: ScopeDependencies) -> Self {
        let credentials = config.credentials();
        let client = Arc::new(SharedClient::new(
            credentials.clone(),
            Arc::clone(&dependencies.factory),
        ));
        Self::with_client(credentials, client, dependencies)
    }

    fn with_client(
        credentials: Credentials,
        client: Arc<SharedClient>,
        dependencies: ScopeDependencies,
    ) -> Self {
        Self {
            credentials,
            namespace: Namespace {
                factory: dependencies.factory,
            },
            client,
            runtime: RuntimeRegistry {
                discovery: dependencies.discovery,
            },
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The shared client built from the scope's credentials
    pub fn client(&self) -> Result<Arc<dyn Client>, ClientError> {
        self.client.get()
    }

    pub fn shared_client(&self) -> &Arc<SharedClient> {
        &self.client
    }

    pub fn runtime(&self) -> &RuntimeRegistry {
        &self.runtime
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

impl fmt::Debug for GlobalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalScope")
            .field("credentials", &self.credentials)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

static GLOBAL_SCOPE: Lazy<RwLock<Option<Arc<GlobalScope>>>> = Lazy::new(|| RwLock::new(None));

/// Build a scope and install it process-wide.
///
/// Replaces every previous binding. The client holder survives when both the
/// credentials and the client factory are unchanged, so repeated calls keep
/// handing out the same client.
pub fn construct_global_scope(
    config: &RuntimeConfig,
    dependencies: ScopeDependencies,
) -> Arc<GlobalScope> {
    let credentials = config.credentials();
    let mut slot = GLOBAL_SCOPE.write();

    let client = match slot.as_ref() {
        Some(previous)
            if previous.credentials == credentials
                && Arc::ptr_eq(&previous.client.factory, &dependencies.factory) =>
        {
            Arc::clone(&previous.client)
        }
        _ => Arc::new(SharedClient::new(
            credentials.clone(),
            Arc::clone(&dependencies.factory),
        )),
    };

    let scope = Arc::new(GlobalScope::with_client(credentials, client, dependencies));
    *slot = Some(Arc::clone(&scope));
    info!(
        account_sid = scope.credentials.account_sid().unwrap_or("<unset>"),
        "Installed global scope"
    );
    scope
}

/// The installed scope, if any
pub fn global_scope() -> Option<Arc<GlobalScope>> {
    GLOBAL_SCOPE.read().clone()
}

/// Remove the installed scope
pub fn reset_global_scope() {
    GLOBAL_SCOPE.write().take();
}
