//! Configuration management

use fnstack_runtime::RuntimeConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub runtime: RuntimeSection,

    /// Passed through to every function context
    #[serde(default)]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RuntimeSection {
    /// Public base URL; derived from the listen address when unset
    #[serde(default)]
    pub url: Option<String>,

    /// Directory served as static assets
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,

    /// Markup document kinds recognized on top of the built-in ones
    #[serde(default)]
    pub markup_kinds: Vec<String>,
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Config {
    /// Load configuration from `fnstack.toml` (optional) and `FNSTACK_*` variables
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("fnstack"))
    }

    /// Load configuration from the given file (extension optional, file optional)
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("FNSTACK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config = config.try_deserialize::<Config>()?;
        // The builder folds keys to lower case
        for (key, value) in read_env_table(path)? {
            config.env.remove(&key.to_lowercase());
            config.env.insert(key, value);
        }
        Ok(config)
    }

    /// Base URL functions see, e.g. `http://localhost:3000`
    pub fn base_url(&self) -> String {
        match &self.runtime.url {
            Some(url) => url.clone(),
            None => {
                let host = match self.server.host.as_str() {
                    "0.0.0.0" | "::" | "[::]" => "localhost",
                    host => host,
                };
                format!("http://{}:{}", host, self.server.port)
            }
        }
    }

    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::new(self.base_url(), self.env.clone())
    }
}

#[derive(Debug, Default, Deserialize)]
struct EnvTable {
    #[serde(default)]
    env: HashMap<String, String>,
}

/// `[env]` table of the config file with key case preserved
fn read_env_table(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let path = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => path.to_path_buf(),
        None => path.with_extension("toml"),
        Some(_) => return Ok(HashMap::new()),
    };
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let table: EnvTable = toml::from_str(&fs::read_to_string(&path)?)?;
    Ok(table.env)
}
