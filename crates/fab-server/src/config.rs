use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use fab_sdk::FabConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const ENV_BIND_ADDR: &str = "FAB_BIND_ADDR";
pub const ENV_BUCKET: &str = "FAB_BUCKET";
pub const ENV_BLOB_ROOT: &str = "FAB_BLOB_ROOT";
pub const ENV_DATABASE_URL: &str = "FAB_DATABASE_URL";
pub const ENV_SESSION_URL: &str = "FAB_SESSION_URL";
pub const ENV_MAX_BLOB_SIZE: &str = "FAB_MAX_BLOB_SIZE";
pub const ENV_SESSION_TTL_SECS: &str = "FAB_SESSION_TTL_SECS";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_BLOB_ROOT: &str = "./data/blobs";

/// Server configuration.
///
/// Built from an optional TOML file overlaid with `FAB_*` environment
/// variables. The bucket, database URL and session URL have no defaults;
/// starting without them is an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub bucket: String,
    pub blob_root: PathBuf,
    pub database_url: String,
    pub session_url: String,
    pub max_blob_size: usize,
    pub session_ttl_secs: u64,
}

/// One configuration source. Every key is optional here; required keys are
/// checked once all sources are merged.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigLayer {
    bind_addr: Option<SocketAddr>,
    bucket: Option<String>,
    blob_root: Option<PathBuf>,
    database_url: Option<String>,
    session_url: Option<String>,
    max_blob_size: Option<usize>,
    session_ttl_secs: Option<u64>,
}

impl ConfigLayer {
    fn read(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("invalid {}: {e}", path.display())))
    }

    fn overlay_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> ServerResult<()> {
        let var = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var(ENV_BIND_ADDR) {
            self.bind_addr = Some(parse(ENV_BIND_ADDR, &v)?);
        }
        if let Some(v) = var(ENV_BUCKET) {
            self.bucket = Some(v);
        }
        if let Some(v) = var(ENV_BLOB_ROOT) {
            self.blob_root = Some(PathBuf::from(v));
        }
        if let Some(v) = var(ENV_DATABASE_URL) {
            self.database_url = Some(v);
        }
        if let Some(v) = var(ENV_SESSION_URL) {
            self.session_url = Some(v);
        }
        if let Some(v) = var(ENV_MAX_BLOB_SIZE) {
            self.max_blob_size = Some(parse(ENV_MAX_BLOB_SIZE, &v)?);
        }
        if let Some(v) = var(ENV_SESSION_TTL_SECS) {
            self.session_ttl_secs = Some(parse(ENV_SESSION_TTL_SECS, &v)?);
        }
        Ok(())
    }

    fn finish(self) -> ServerResult<ServerConfig> {
        let mut missing = Vec::new();
        if self.bucket.is_none() {
            missing.push(ENV_BUCKET);
        }
        if self.database_url.is_none() {
            missing.push(ENV_DATABASE_URL);
        }
        if self.session_url.is_none() {
            missing.push(ENV_SESSION_URL);
        }
        let (Some(bucket), Some(database_url), Some(session_url)) =
            (self.bucket, self.database_url, self.session_url)
        else {
            return Err(ServerError::Config(format!(
                "missing required setting(s): {}",
                missing.join(", ")
            )));
        };

        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => parse(ENV_BIND_ADDR, DEFAULT_BIND_ADDR)?,
        };
        let defaults = FabConfig::in_memory();
        Ok(ServerConfig {
            bind_addr,
            bucket,
            blob_root: self.blob_root.unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_ROOT)),
            database_url,
            session_url,
            max_blob_size: self.max_blob_size.unwrap_or(defaults.max_blob_size),
            session_ttl_secs: self
                .session_ttl_secs
                .unwrap_or(defaults.session_ttl.as_secs()),
        })
    }
}

fn parse<T>(name: &str, value: &str) -> ServerResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ServerError::Config(format!("{name}={value:?}: {e}")))
}

impl ServerConfig {
    /// Load from the process environment alone.
    pub fn from_env() -> ServerResult<Self> {
        Self::load(None)
    }

    /// Load from `file` (if given), then let the process environment
    /// override it.
    pub fn load(file: Option<&Path>) -> ServerResult<Self> {
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Like [`load`](Self::load), reading variables through `env`.
    pub fn resolve(file: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        let mut layer = match file {
            Some(path) => ConfigLayer::read(path)?,
            None => ConfigLayer::default(),
        };
        layer.overlay_env(&env)?;
        layer.finish()
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// The store settings handed to [`Fab::open`](fab_sdk::Fab::open).
    pub fn fab_config(&self) -> FabConfig {
        FabConfig {
            bucket: self.bucket.clone(),
            blob_root: Some(self.blob_root.clone()),
            database_url: self.database_url.clone(),
            session_url: self.session_url.clone(),
            max_blob_size: self.max_blob_size,
            session_ttl: self.session_ttl(),
        }
    }
}
