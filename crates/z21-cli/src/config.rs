//! Context store: named station profiles in a TOML file.
//!
//! Each context holds the station endpoint plus the persisted local
//! endpoint of the last fresh session, which later invocations re-bind to
//! resume the station-side subscription state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use z21_core::SessionDescriptor;

use crate::error::CliError;

const CONFIG_FILE: &str = "config.toml";

/// Resolve the config file location.
///
/// `Z21_CONFIG` overrides the platform default, which also keeps tests
/// away from the real user config.
pub fn config_path() -> Result<PathBuf, CliError> {
    if let Some(path) = std::env::var_os("Z21_CONFIG") {
        return Ok(PathBuf::from(path));
    }
    let dirs = directories::ProjectDirs::from("io", "trains", "z21").ok_or_else(|| {
        std::io::Error::other("could not determine a configuration directory")
    })?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSession {
    pub local_host: String,
    pub local_port: u16,
}

impl From<&SessionDescriptor> for StoredSession {
    fn from(d: &SessionDescriptor) -> Self {
        Self {
            local_host: d.local_host.clone(),
            local_port: d.local_port,
        }
    }
}

impl From<&StoredSession> for SessionDescriptor {
    fn from(s: &StoredSession) -> Self {
        Self {
            local_host: s.local_host.clone(),
            local_port: s.local_port,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<StoredSession>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Store {
    /// Name of the selected context, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,

    #[serde(default)]
    pub contexts: BTreeMap<String, Profile>,
}

impl Store {
    /// Load the store from disk. A missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let store = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("Z21_CONFIG_"))
            .extract()?;
        Ok(store)
    }

    /// Persist the store, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self).map_err(|e| CliError::Validation {
            field: "config".into(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, rendered)?;
        Ok(())
    }

    /// Resolve the active context: an explicit `--context` override wins,
    /// otherwise the stored selection.
    pub fn resolve(&self, name_override: Option<&str>) -> Result<(&str, &Profile), CliError> {
        let name = match name_override.or(self.current.as_deref()) {
            Some(name) => name,
            None => return Err(CliError::NoContext),
        };
        match self.contexts.get_key_value(name) {
            Some((name, profile)) => Ok((name, profile)),
            None => Err(CliError::ContextNotFound {
                name: name.to_string(),
                available: self.available(),
            }),
        }
    }

    pub fn add(&mut self, name: &str, host: String, port: u16) -> Result<(), CliError> {
        if self.contexts.contains_key(name) {
            return Err(CliError::ContextExists {
                name: name.to_string(),
            });
        }
        self.contexts.insert(
            name.to_string(),
            Profile {
                host,
                port,
                session: None,
            },
        );
        // First context becomes the selection.
        if self.current.is_none() {
            self.current = Some(name.to_string());
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), CliError> {
        if self.contexts.remove(name).is_none() {
            return Err(CliError::ContextNotFound {
                name: name.to_string(),
                available: self.available(),
            });
        }
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(())
    }

    pub fn select(&mut self, name: &str) -> Result<(), CliError> {
        if !self.contexts.contains_key(name) {
            return Err(CliError::ContextNotFound {
                name: name.to_string(),
                available: self.available(),
            });
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    pub fn set_session(&mut self, name: &str, descriptor: &SessionDescriptor) {
        if let Some(profile) = self.contexts.get_mut(name) {
            profile.session = Some(StoredSession::from(descriptor));
        }
    }

    pub fn clear_session(&mut self, name: &str) {
        if let Some(profile) = self.contexts.get_mut(name) {
            profile.session = None;
        }
    }

    fn available(&self) -> String {
        if self.contexts.is_empty() {
            "(none)".to_string()
        } else {
            self.contexts.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}
