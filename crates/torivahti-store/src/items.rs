//! Durable keyed store for discovered items, backed by one JSON document.
//!
//! Document shape on disk:
//!
//! ```json
//! { "meta": { "created_at", "updated_at", "schema_version" }, "items": { "<id>": {...} } }
//! ```
//!
//! All operations take the internal async lock only for their own duration;
//! callers must never hold results across a network call and expect them to
//! stay current. [`ItemStore::upsert`] is atomic and durable before it
//! returns: the document is written to a temp file in the same directory and
//! renamed over the live file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use torivahti_core::ItemRecord;

use crate::error::StoreError;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Meta {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    schema_version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    meta: Meta,
    items: BTreeMap<String, ItemRecord>,
}

impl Document {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            meta: Meta {
                created_at: now,
                updated_at: now,
                schema_version: SCHEMA_VERSION,
            },
            items: BTreeMap::new(),
        }
    }
}

pub struct ItemStore {
    path: PathBuf,
    inner: Mutex<Document>,
}

impl ItemStore {
    /// Opens the store at `path`, loading the existing document or creating
    /// an empty one. A file that fails to parse is logged and replaced with
    /// a fresh document rather than aborting startup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str::<Document>(&raw) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "item store corrupt; starting fresh");
                    Document::new()
                }
            }
        } else {
            tracing::info!(path = %path.display(), "item store not found; creating new");
            Document::new()
        };
        Ok(Self {
            path,
            inner: Mutex::new(document),
        })
    }

    pub async fn exists(&self, id: &str) -> bool {
        self.inner.lock().await.items.contains_key(id)
    }

    pub async fn get(&self, id: &str) -> Option<ItemRecord> {
        self.inner.lock().await.items.get(id).cloned()
    }

    /// Inserts or replaces the record for `id` and persists the document
    /// before returning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the document cannot be written; the
    /// in-memory state still holds the new record in that case.
    pub async fn upsert(&self, id: &str, record: ItemRecord) -> Result<(), StoreError> {
        let mut doc = self.inner.lock().await;
        doc.items.insert(id.to_owned(), record);
        doc.meta.updated_at = Utc::now();
        persist(&self.path, &doc).await
    }

    /// All records, in no guaranteed order.
    pub async fn all(&self) -> Vec<ItemRecord> {
        self.inner.lock().await.items.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.items.is_empty()
    }

    /// Records with no valuation yet, or one still pending.
    pub async fn needing_valuation(&self) -> Vec<(String, ItemRecord)> {
        self.inner
            .lock()
            .await
            .items
            .iter()
            .filter(|(_, item)| item.needs_valuation())
            .map(|(id, item)| (id.clone(), item.clone()))
            .collect()
    }
}

async fn persist(path: &Path, doc: &Document) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(doc).map_err(|source| StoreError::Serialize {
        path: path.to_owned(),
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
            path: path.to_owned(),
            source,
        })
}
