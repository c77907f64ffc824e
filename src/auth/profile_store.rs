//! File backed token provider.
//!
//! Profiles live in a YAML file, each one pointing at its access token either
//! literally, through an environment variable, or through a file:
//!
//! ```yaml
//! profiles:
//!   admin:
//!     access_token:
//!       value: ya29.a0Af...
//!   ci:
//!     access_token:
//!       from_env: GDIRECTORY_TOKEN
//!   vault:
//!     access_token:
//!       path: /run/secrets/gdirectory
//! ```
//!
//! With `persist` the resolved token is written back as a literal value.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::auth::credential::AccessToken;
use crate::auth::resolver::TokenProvider;
use crate::error::{DirectoryError, Result};

/// Token value sources
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TokenValue {
    Literal { value: String },
    FromEnv { from_env: String },
    FromFile { path: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileEntry {
    pub access_token: TokenValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProfileFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
}

#[derive(Debug, Clone)]
pub struct FileProfileStore {
    default_location: PathBuf,
}

impl FileProfileStore {
    pub fn new(default_location: impl Into<PathBuf>) -> Self {
        Self { default_location: default_location.into() }
    }

    pub fn location<'a>(&'a self, location: Option<&'a Path>) -> &'a Path {
        location.unwrap_or(self.default_location.as_path())
    }

    pub async fn load(path: &Path) -> Result<ProfileFile> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DirectoryError::auth(format!("profile store {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| DirectoryError::auth(format!("profile store {} is malformed: {}", path.display(), e)))
    }

    /// Atomic write: private sibling tmp file, fsync, then rename over `path`.
    pub async fn save(path: &Path, profiles: &ProfileFile) -> Result<()> {
        let content = serde_yaml::to_string(profiles)
            .map_err(|e| DirectoryError::auth(format!("cannot serialize profiles: {}", e)))?;
        let io_err = |e: std::io::Error| DirectoryError::auth(format!("cannot persist profile store {}: {}", path.display(), e));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = temp_sibling_path(path);
        let written = async {
            let mut file = create_private_file(&tmp).await?;
            file.write_all(content.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, path).await
        }
        .await;

        if let Err(err) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(err));
        }
        Ok(())
    }
}

/// `.<name>.<random>.tmp` next to `path`, so concurrent writers never share one.
pub fn temp_sibling_path(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().and_then(|s| s.to_str()).unwrap_or("profiles");
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    parent.join(format!(".{}.{}.tmp", file_name, suffix))
}

/// New file readable by the owner only from the moment it exists.
pub async fn create_private_file(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

impl TokenProvider for FileProfileStore {
    async fn get_token(&self, profile_id: &str, location: Option<&Path>, persist: bool) -> Result<AccessToken> {
        let path = self.location(location);
        let mut profiles = Self::load(path).await?;

        let entry = profiles
            .profiles
            .get_mut(profile_id)
            .ok_or_else(|| DirectoryError::auth(format!("profile '{}' does not exist in {}", profile_id, path.display())))?;

        let token = resolve_token_value(&entry.access_token)?;
        debug!("profile '{}' resolved from {}", profile_id, path.display());

        if persist {
            entry.access_token = TokenValue::Literal { value: token.clone() };
            entry.persisted_at = Some(Utc::now());
            Self::save(path, &profiles).await?;
            info!("profile '{}' persisted to {}", profile_id, path.display());
        }

        Ok(AccessToken::new(token))
    }
}

fn resolve_token_value(value: &TokenValue) -> Result<String> {
    let token = match value {
        TokenValue::Literal { value } => value.to_owned(),
        TokenValue::FromEnv { from_env } => env::var(from_env)
            .map_err(|e| DirectoryError::auth(format!("token refresh failed, env '{}': {}", from_env, e)))?,
        TokenValue::FromFile { path } => fs::read_to_string(path)
            .map(|res| res.trim().to_string())
            .map_err(|e| DirectoryError::auth(format!("token refresh failed, file '{}': {}", path, e)))?,
    };
    if token.is_empty() {
        return Err(DirectoryError::auth("token refresh failed, resolved token is empty"));
    }
    Ok(token)
}

/// `$HOME/.config/gdirectory/profiles.yaml`, or a relative fallback.
pub fn default_profile_store_path() -> PathBuf {
    env::var("HOME")
        .map(|home| Path::new(&home).join(".config").join("gdirectory").join("profiles.yaml"))
        .unwrap_or_else(|_| PathBuf::from("profiles.yaml"))
}
