//! Configuration Loader
//!
//! Environment-aware loading of [`PoolHookConfig`] on top of the `config` crate.
//!
//! Sources are layered in the order they are added, with `POOLHOOK__*`
//! environment variables applied last. A directory source contributes
//! `poolhook.toml` plus an optional `poolhook.{environment}.toml`, where the
//! environment comes from `POOLHOOK_ENV` (falling back to `APP_ENV`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::constants::env;
use crate::error::Result;
use crate::logging::get_environment;

use super::PoolHookConfig;

const BASE_FILE_STEM: &str = "poolhook";

enum Source {
    File { path: PathBuf, required: bool },
    Inline(String),
}

/// Builder that layers configuration sources and produces a validated [`PoolHookConfig`]
pub struct ConfigLoader {
    sources: Vec<Source>,
    environment: Option<String>,
    env_overrides: Option<HashMap<String, String>>,
    read_environment: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            environment: None,
            env_overrides: None,
            read_environment: true,
        }
    }

    /// Add a required file; the format is taken from its extension
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.sources.push(Source::File {
            path: path.as_ref().to_path_buf(),
            required: true,
        });
        self
    }

    /// Add an inline TOML document
    pub fn with_toml_str(mut self, toml: impl Into<String>) -> Self {
        self.sources.push(Source::Inline(toml.into()));
        self
    }

    /// Add `poolhook.toml` and `poolhook.{environment}.toml` from `dir`, both optional
    pub fn with_directory(mut self, dir: impl AsRef<Path>) -> Self {
        let environment = self.environment.clone().unwrap_or_else(get_environment);
        let dir = dir.as_ref();
        self.sources.push(Source::File {
            path: dir.join(format!("{BASE_FILE_STEM}.toml")),
            required: false,
        });
        self.sources.push(Source::File {
            path: dir.join(format!("{BASE_FILE_STEM}.{environment}.toml")),
            required: false,
        });
        self
    }

    /// Use an explicit environment name instead of reading `POOLHOOK_ENV`
    ///
    /// Must be called before [`ConfigLoader::with_directory`] to take effect.
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Read `POOLHOOK__*` overrides from `vars` instead of the process environment
    pub fn with_env_overrides(mut self, vars: HashMap<String, String>) -> Self {
        self.env_overrides = Some(vars);
        self
    }

    /// Ignore environment variable overrides entirely
    pub fn without_env_overrides(mut self) -> Self {
        self.read_environment = false;
        self
    }

    /// Build, deserialize and validate the layered configuration
    pub fn load(self) -> Result<PoolHookConfig> {
        let mut builder = Config::builder();

        for source in &self.sources {
            builder = match source {
                Source::File { path, required } => {
                    debug!(path = %path.display(), required, "Adding configuration file");
                    builder.add_source(File::from(path.as_path()).required(*required))
                }
                Source::Inline(toml) => builder.add_source(File::from_str(toml, FileFormat::Toml)),
            };
        }

        if self.read_environment {
            let environment = Environment::with_prefix(env::CONFIG_PREFIX)
                .separator(env::CONFIG_SEPARATOR)
                .try_parsing(true)
                .source(self.env_overrides);
            builder = builder.add_source(environment);
        }

        let config: PoolHookConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            pools = config.pools.len(),
            default_tier = config.plugins.is_some(),
            "Configuration loaded successfully"
        );
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
