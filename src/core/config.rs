//! # Persistent Configuration
//!
//! Two-tier key/value store: a permanent file and a local override file, both in
//! the working directory. Reads consult the local tier first; writes only ever go
//! to the local tier. Keys are flat dotted strings (`volt.catalog`) stored as
//! quoted TOML keys so they never turn into nested tables.

use crate::core::utility;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration of the working directory. Local values shadow permanent ones.
#[derive(Debug, Clone)]
pub struct VoltConfig {
    permanent_path: PathBuf,
    local_path: PathBuf,
    permanent: BTreeMap<String, String>,
    local: BTreeMap<String, String>,
    /// Command name quoted in the guidance of `get_required`.
    command_name: String,
}

fn read_tier(path: &Path) -> Result<BTreeMap<String, String>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file '{}'", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse configuration file '{}'", path.display()))
}

impl VoltConfig {
    /// Loads both tiers. Missing files are treated as empty.
    pub fn load(
        permanent_path: impl Into<PathBuf>,
        local_path: impl Into<PathBuf>,
        command_name: &str,
    ) -> Result<Self> {
        let permanent_path = permanent_path.into();
        let local_path = local_path.into();
        let permanent = read_tier(&permanent_path)?;
        let local = read_tier(&local_path)?;
        log::debug!(
            "Loaded configuration: {} permanent and {} local value(s).",
            permanent.len(),
            local.len()
        );
        Ok(Self {
            permanent_path,
            local_path,
            permanent,
            local,
            command_name: command_name.to_string(),
        })
    }

    /// The value of `key`, local tier first.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.local
            .get(key)
            .or_else(|| self.permanent.get(key))
            .map(String::as_str)
    }

    /// Like [`get`](Self::get) with `~` and `$VAR` references expanded.
    pub fn get_expanded(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            Some(raw) => {
                let expanded = shellexpand::full(raw).map_err(|e| {
                    anyhow::anyhow!("Failed to expand configuration value '{}': {}", key, e)
                })?;
                Ok(Some(expanded.into_owned()))
            }
            None => Ok(None),
        }
    }

    /// Returns the value or a fatal error explaining how to set it.
    pub fn get_required(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| {
            let mut messages = vec![
                format!("Configuration parameter \"{}\" was not found.", key),
                "Set parameters using the \"config\" command, for example:".to_string(),
            ];
            messages.extend(utility::indented([format!(
                "{} config {}=VALUE",
                self.command_name, key
            )]));
            utility::abort(messages)
        })
    }

    /// Stores `key` in the local tier and rewrites the local file.
    pub fn set_local(&mut self, key: &str, value: &str) -> Result<()> {
        self.local.insert(key.to_string(), value.to_string());
        let content =
            toml::to_string_pretty(&self.local).context("Failed to serialize configuration.")?;
        fs::write(&self.local_path, content).with_context(|| {
            format!(
                "Failed to write configuration file '{}'",
                self.local_path.display()
            )
        })
    }

    /// Path of the permanent configuration file.
    pub fn permanent_path(&self) -> &Path {
        &self.permanent_path
    }

    /// Path of the local configuration file.
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }
}
