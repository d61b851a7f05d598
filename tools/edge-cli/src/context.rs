//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use edge_executor::{CompiledConfig, ConfigFile};

use crate::output::Output;

const CONFIG_NAMES: [&str; 3] = ["edge.toml", ".edge.toml", "edge.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Output handler.
    pub output: Output,
    /// Configuration file in use, if one was given or found.
    pub config_path: Option<PathBuf>,
}

impl Context {
    /// Locate the configuration file.
    ///
    /// An explicit path must exist; otherwise the working directory and its
    /// parents are searched for a known file name.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let config_path = match config_path {
            Some(path) => {
                let path = resolve(&cwd, path);
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path)
            }
            None => find_config(&cwd),
        };

        if let Some(path) = &config_path {
            output.debug(&format!("Using config {}", path.display()));
        }

        Ok(Self {
            output,
            config_path,
        })
    }

    /// The path of the configuration file, or an error explaining how to pass one.
    pub fn require_config(&self) -> Result<&Path> {
        match &self.config_path {
            Some(path) => Ok(path),
            None => bail!(
                "No config file found (looked for {}); pass one with --config",
                CONFIG_NAMES.join(", ")
            ),
        }
    }

    /// Parse the configuration file.
    pub fn config_file(&self) -> Result<ConfigFile> {
        let path = self.require_config()?;
        ConfigFile::load(path).with_context(|| format!("Failed to load {}", path.display()))
    }

    /// Parse and compile the configuration file.
    pub fn compiled(&self) -> Result<CompiledConfig> {
        let path = self.require_config()?;
        self.config_file()?
            .compile()
            .with_context(|| format!("Failed to compile {}", path.display()))
    }
}

fn resolve(cwd: &Path, path: &str) -> PathBuf {
    let path = PathBuf::from(path);
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Find a config file in the directory tree.
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}
