//! Asset, function and sync service discovery
//!
//! The scope registry delegates every lookup to a [`ResourceDiscovery`].
//! [`LocalDiscovery`] serves a local assets directory and the in-process
//! function registry.

use crate::function::FunctionRegistry;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Sync service used when a function does not name one
pub const DEFAULT_SYNC_SERVICE: &str = "default";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Sync service name must not be empty")]
    EmptyServiceName,
}

/// A static file exposed to functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub path: PathBuf,
}

impl AssetInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the asset as UTF-8 text
    pub fn open(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// A registered function and the route it answers on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub route: String,
}

impl FunctionInfo {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let route = format!("/{}", name.trim_start_matches('/'));
        Self { name, route }
    }
}

/// Reference to a sync service; documents are fetched through the API client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncServiceRef {
    pub service_name: String,
    pub url: String,
}

impl SyncServiceRef {
    pub fn new(service_name: impl Into<String>) -> Self {
        let service_name = service_name.into();
        let url = format!("https://sync.twilio.com/v1/Services/{}", service_name);
        Self { service_name, url }
    }
}

/// Source of the listings exposed through the scope registry
pub trait ResourceDiscovery: Send + Sync {
    fn assets(&self) -> Result<BTreeMap<String, AssetInfo>, DiscoveryError>;
    fn functions(&self) -> Result<BTreeMap<String, FunctionInfo>, DiscoveryError>;
    fn sync_service(&self, service_name: &str) -> Result<SyncServiceRef, DiscoveryError>;
}

/// Discovery over an optional assets directory and a function registry
pub struct LocalDiscovery {
    assets_dir: Option<PathBuf>,
    functions: Arc<FunctionRegistry>,
}

impl LocalDiscovery {
    pub fn new(assets_dir: Option<PathBuf>, functions: Arc<FunctionRegistry>) -> Self {
        Self {
            assets_dir,
            functions,
        }
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets_dir.as_deref()
    }
}

impl ResourceDiscovery for LocalDiscovery {
    fn assets(&self) -> Result<BTreeMap<String, AssetInfo>, DiscoveryError> {
        let mut assets = BTreeMap::new();
        if let Some(root) = &self.assets_dir {
            if root.is_dir() {
                collect_assets(root, root, &mut assets)?;
            }
        }
        Ok(assets)
    }

    fn functions(&self) -> Result<BTreeMap<String, FunctionInfo>, DiscoveryError> {
        Ok(self
            .functions
            .names()
            .into_iter()
            .map(|name| (name.clone(), FunctionInfo::new(name)))
            .collect())
    }

    fn sync_service(&self, service_name: &str) -> Result<SyncServiceRef, DiscoveryError> {
        if service_name.is_empty() {
            return Err(DiscoveryError::EmptyServiceName);
        }
        Ok(SyncServiceRef::new(service_name))
    }
}

// Hidden files are skipped; keys are `/`-prefixed paths relative to the root.
fn collect_assets(
    root: &Path,
    dir: &Path,
    assets: &mut BTreeMap<String, AssetInfo>,
) -> Result<(), DiscoveryError> {
    let io_error = |source| DiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let hidden = path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(true, |name| name.starts_with('.'));
        if hidden {
            continue;
        }

        if path.is_dir() {
            collect_assets(root, &path, assets)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            assets.insert(format!("/{}", key), AssetInfo::new(path.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::InvocationResult;

    fn registry() -> Arc<FunctionRegistry> {
        let registry = FunctionRegistry::new();
        registry.register("hello-world", |_ctx, _event, callback: crate::Callback| {
            callback.succeed(InvocationResult::from("hi"));
            Ok(())
        });
        registry.register("sms/reply", |_ctx, _event, callback: crate::Callback| {
            callback.succeed(InvocationResult::from("ok"));
            Ok(())
        });
        Arc::new(registry)
    }

    #[test]
    fn test_assets_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        fs::create_dir(dir.path().join("img")).unwrap();
        fs::write(dir.path().join("img").join("logo.svg"), "<svg/>").unwrap();
        fs::write(dir.path().join(".hidden"), "secret").unwrap();

        let discovery = LocalDiscovery::new(Some(dir.path().to_path_buf()), registry());
        let assets = discovery.assets().unwrap();

        assert_eq!(
            assets.keys().cloned().collect::<Vec<_>>(),
            vec!["/img/logo.svg".to_string(), "/index.html".to_string()]
        );
        assert_eq!(assets["/index.html"].open().unwrap(), "<h1>hi</h1>");
    }

    #[test]
    fn test_missing_assets_dir_is_empty() {
        let discovery = LocalDiscovery::new(Some(PathBuf::from("/definitely/not/here")), registry());
        assert!(discovery.assets().unwrap().is_empty());

        let discovery = LocalDiscovery::new(None, registry());
        assert!(discovery.assets().unwrap().is_empty());
    }

    #[test]
    fn test_functions_listing() {
        let discovery = LocalDiscovery::new(None, registry());
        let functions = discovery.functions().unwrap();

        assert_eq!(functions.len(), 2);
        assert_eq!(functions["hello-world"].route, "/hello-world");
        assert_eq!(functions["sms/reply"].route, "/sms/reply");
    }

    #[test]
    fn test_sync_service() {
        let discovery = LocalDiscovery::new(None, registry());
        let service = discovery.sync_service(DEFAULT_SYNC_SERVICE).unwrap();
        assert_eq!(service.service_name, "default");
        assert_eq!(service.url, "https://sync.twilio.com/v1/Services/default");

        assert!(matches!(
            discovery.sync_service(""),
            Err(DiscoveryError::EmptyServiceName)
        ));
    }
}
