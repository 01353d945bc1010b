//! Persisted runtime settings with validate-before-apply updates.
//!
//! The settings type itself (and its validation) lives in
//! [`torivahti_core::settings`]; this store adds file persistence and the
//! snapshot/update concurrency contract: readers get an immutable clone,
//! and a rejected update leaves both memory and disk untouched.

use std::path::PathBuf;

use tokio::sync::RwLock;
use torivahti_core::{Settings, SettingsPatch};

use crate::error::StoreError;

pub struct SettingsStore {
    path: PathBuf,
    inner: RwLock<Settings>,
}

impl SettingsStore {
    /// Opens the settings file at `path`, creating it from defaults when
    /// missing. Older files merge missing keys from defaults via serde
    /// (see `torivahti_core::settings`); an unreadable or unparsable file
    /// falls back to defaults with an error log.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only when a fresh defaults file cannot be
    /// written.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let settings = if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!(path = %path.display(), error = %e, "settings file unparsable; using defaults");
                        Settings::default()
                    }
                },
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "settings file unreadable; using defaults");
                    Settings::default()
                }
            }
        } else {
            tracing::info!(path = %path.display(), "settings file not found; creating with defaults");
            let defaults = Settings::default();
            persist_sync(&path, &defaults)?;
            defaults
        };
        Ok(Self {
            path,
            inner: RwLock::new(settings),
        })
    }

    /// Immutable snapshot of the current settings. Concurrent updates take
    /// effect on the next snapshot, never mid-operation.
    pub async fn snapshot(&self) -> Settings {
        self.inner.read().await.clone()
    }

    /// Validates and applies `patch`, persisting on success.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when the patch is out of range
    /// (nothing is mutated or persisted), or [`StoreError::Io`] when the
    /// updated file cannot be written.
    pub async fn update(&self, patch: &SettingsPatch) -> Result<Settings, StoreError> {
        let mut guard = self.inner.write().await;
        let next = guard.apply(patch)?;
        persist(&self.path, &next).await?;
        *guard = next.clone();
        Ok(next)
    }
}

async fn persist(path: &PathBuf, settings: &Settings) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(settings).map_err(|source| StoreError::Serialize {
        path: path.clone(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
}

fn persist_sync(path: &PathBuf, settings: &Settings) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(settings).map_err(|source| StoreError::Serialize {
        path: path.clone(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.clone(),
        source,
    })
}
