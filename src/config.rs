use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::crypto::NoteCipher;
use crate::error::{Result, ShortFormError};

const CONFIG_FILE: &str = "config.json";
const DEFAULT_DB_FILE: &str = "notes.db";

/// Persisted settings, stored as `<home>/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub database_path: PathBuf,
    /// Base64 of the secret that keys secure notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_encoded: Option<String>,
}

impl Config {
    /// `$SHORT_FORM_HOME`, else `$HOME/.sf`.
    pub fn home() -> Result<PathBuf> {
        if let Ok(dir) = env::var("SHORT_FORM_HOME") {
            if !dir.trim().is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        let home = env::var("HOME").map_err(|_| {
            ShortFormError::Config("HOME not set; set SHORT_FORM_HOME explicitly".to_string())
        })?;
        Ok(PathBuf::from(home).join(".sf"))
    }

    /// Fresh settings for `home` with a random secret.
    pub fn default_for(home: &Path) -> Self {
        let secret = Uuid::new_v4().to_string();
        Self {
            database_path: home.join(DEFAULT_DB_FILE),
            secret_encoded: Some(base64::engine::general_purpose::STANDARD.encode(secret)),
        }
    }

    pub fn path(home: &Path) -> PathBuf {
        home.join(CONFIG_FILE)
    }

    /// Read `<home>/config.json`, writing defaults on first run.
    pub fn load_or_init(home: &Path) -> Result<Self> {
        let path = Self::path(home);
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&raw).map_err(|e| {
                ShortFormError::Config(format!("{}: {}", path.display(), e))
            })?;
            return Ok(config);
        }

        let config = Self::default_for(home);
        config.save(home)?;
        info!(path = %path.display(), "wrote default configuration");
        Ok(config)
    }

    pub fn save(&self, home: &Path) -> Result<()> {
        fs::create_dir_all(home)?;
        let json = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(home), json)?;
        Ok(())
    }

    /// Decoded secret, if one is configured.
    pub fn secret(&self) -> Result<Option<String>> {
        let Some(encoded) = self.secret_encoded.as_deref() else {
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| ShortFormError::Config(format!("secret_encoded is not base64: {}", e)))?;
        let secret = String::from_utf8(bytes)
            .map_err(|_| ShortFormError::Config("secret_encoded is not UTF-8".to_string()))?;
        Ok(Some(secret).filter(|s| !s.is_empty()))
    }

    pub fn cipher(&self) -> Result<Option<NoteCipher>> {
        Ok(self.secret()?.map(|s| NoteCipher::from_secret(&s)))
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            database_path: self.database_path.clone(),
            secret_encoded: self.secret_encoded.as_ref().map(|_| "[REDACTED]".to_string()),
        }
    }
}
