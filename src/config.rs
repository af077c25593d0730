//! Server configuration.
//!
//! Defines the bind address, the routes the server exposes and the window
//! tunables. Loaded from JSON; every field has a default so partial files
//! are fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::WindowConfig;

pub const DEFAULT_PORT: u16 = 3030;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Invalid route spec '{0}', expected NAME=PATH")]
    InvalidRouteSpec(String),
}

/// Configuration for the feed server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    /// Default: 0.0.0.0
    pub bind: String,

    /// TCP port.
    /// Default: 3030
    pub port: u16,

    /// Send `Access-Control-Allow-*` headers.
    /// Default: true
    pub cors: bool,

    /// Served resources, matched by exact path.
    pub routes: Vec<Route>,

    /// Locator and sampler tunables.
    pub window: WindowConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            cors: true,
            routes: Vec::new(),
            window: WindowConfig::default(),
        }
    }
}

/// What a route serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Append-only CSV log with windowed queries.
    Csv,
    /// File served as-is.
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// URL path without the leading `/`, e.g. `KPI_Metrics.csv`.
    pub path: String,
    /// File on disk.
    pub file: PathBuf,
    pub kind: RouteKind,
}

impl Route {
    pub fn csv(path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: file.into(),
            kind: RouteKind::Csv,
        }
    }

    pub fn asset(path: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: file.into(),
            kind: RouteKind::Static,
        }
    }

    /// Parse a `NAME=PATH` command-line spec.
    pub fn parse_spec(spec: &str, kind: RouteKind) -> Result<Self, ConfigError> {
        let (name, file) = spec
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidRouteSpec(spec.to_string()))?;
        let name = name.trim_start_matches('/');
        if name.is_empty() || file.is_empty() {
            return Err(ConfigError::InvalidRouteSpec(spec.to_string()));
        }
        Ok(Self {
            path: name.to_string(),
            file: PathBuf::from(file),
            kind,
        })
    }
}

impl ServerConfig {
    /// Load a JSON config. Relative route files resolve against the
    /// config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        let mut config: ServerConfig =
            serde_json::from_str(&text).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        for route in &mut self.routes {
            if route.file.is_relative() {
                route.file = base.join(&route.file);
            }
        }
    }

    pub fn route(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.path == path)
    }
}
