// Persisted settings: a small JSON key/value file holding the service
// endpoint and partner credentials. Keys that are missing are written back
// with a placeholder so the user has something to edit.

use crate::error::WorkflowError;
use crate::model::{Credentials, DEFAULT_USER_LABEL};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Sentinel meaning "not configured yet".
pub const PLACEHOLDER: &str = "PLACEHOLDER";

const APP_DIR: &str = "kaltura-ingest";
const FILE_NAME: &str = "settings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    ApiEndpoint,
    PartnerId,
    AdminSecret,
}

impl Setting {
    pub const ALL: [Setting; 3] = [Setting::ApiEndpoint, Setting::PartnerId, Setting::AdminSecret];

    pub fn key(self) -> &'static str {
        match self {
            Setting::ApiEndpoint => "api_endpoint",
            Setting::PartnerId => "partner_id",
            Setting::AdminSecret => "admin_secret",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    pub fn is_secret(self) -> bool {
        matches!(self, Setting::AdminSecret)
    }
}

/// Validated settings, ready to start a session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_endpoint: String,
    pub credentials: Credentials,
}

/// File-backed settings store.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

/// Default location: `<config dir>/kaltura-ingest/settings.json`, falling
/// back to the home directory and then the working directory.
pub fn default_path() -> PathBuf {
    let base = dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_DIR).join(FILE_NAME)
}

impl SettingsStore {
    /// Load the store at `path`, creating it (filled with placeholders) when
    /// it does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let values: BTreeMap<String, String> = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("Settings file {} is not a JSON object of strings", path.display()))?
        } else {
            BTreeMap::new()
        };

        let mut store = SettingsStore {
            path: path.to_path_buf(),
            values,
        };
        let mut missing = false;
        for setting in Setting::ALL {
            if !store.values.contains_key(setting.key()) {
                store.values.insert(setting.key().to_string(), PLACEHOLDER.to_string());
                missing = true;
            }
        }
        if missing {
            tracing::debug!(path = %store.path.display(), "writing placeholder settings");
            store.save()?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, setting: Setting) -> &str {
        self.values
            .get(setting.key())
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER)
    }

    pub fn is_unset(&self, setting: Setting) -> bool {
        self.get(setting) == PLACEHOLDER
    }

    /// Store a value and persist the file immediately.
    pub fn set(&mut self, setting: Setting, value: &str) -> Result<()> {
        self.values
            .insert(setting.key().to_string(), value.trim().to_string());
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let data = serde_json::to_string_pretty(&self.values).context("Serialize settings")?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write settings file {}", self.path.display()))?;
        Ok(())
    }

    /// Refuse to go on while any setting still holds the placeholder.
    pub fn check(&self) -> Result<Settings, WorkflowError> {
        let unset: Vec<&str> = Setting::ALL
            .into_iter()
            .filter(|s| self.is_unset(*s))
            .map(Setting::key)
            .collect();
        if !unset.is_empty() {
            return Err(WorkflowError::Configuration(format!(
                "please replace the placeholder values for {} in {}",
                unset.join(", "),
                self.path.display()
            )));
        }

        Ok(Settings {
            api_endpoint: self.get(Setting::ApiEndpoint).to_string(),
            credentials: Credentials {
                partner_id: self.get(Setting::PartnerId).to_string(),
                secret: self.get(Setting::AdminSecret).to_string(),
                user_label: DEFAULT_USER_LABEL.to_string(),
            },
        })
    }

    /// Key/value pairs for display, with the secret masked.
    pub fn display_pairs(&self) -> Vec<(&'static str, String)> {
        Setting::ALL
            .into_iter()
            .map(|s| {
                let value = self.get(s);
                let shown = if s.is_secret() && value != PLACEHOLDER {
                    mask(value)
                } else {
                    value.to_string()
                };
                (s.key(), shown)
            })
            .collect()
    }
}

fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{}****", visible)
}
