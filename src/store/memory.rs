//! In-memory reference store.
//!
//! Holds media and entry records in process memory, records every query it
//! receives and can be told to fail specific queries. Intended for tests and
//! for embedding the populate core without a database.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::ReferenceStore;
use crate::errors::{PopulateError, Result};
use crate::types::ResolvedMedia;

/// A query received by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Media {
        document_ids: Vec<String>,
    },
    Entries {
        content_type: String,
        document_ids: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    media: BTreeMap<String, ResolvedMedia>,
    /// content type -> document id -> raw record
    entries: HashMap<String, BTreeMap<String, Value>>,
    failing_content_types: HashSet<String>,
    fail_media: bool,
    calls: Vec<StoreCall>,
}

/// Thread-safe in-memory store; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_media(&self, media: ResolvedMedia) {
        self.lock().media.insert(media.document_id.clone(), media);
    }

    /// Stores a raw entry record under `content_type`, keyed by its
    /// `documentId`. Records without a string `documentId` are ignored.
    pub fn insert_entry(&self, content_type: &str, record: Value) {
        let Some(document_id) = record.get("documentId").and_then(Value::as_str) else {
            return;
        };
        let document_id = document_id.to_string();
        self.lock()
            .entries
            .entry(content_type.to_string())
            .or_default()
            .insert(document_id, record);
    }

    /// Makes every subsequent query for `content_type` fail.
    pub fn fail_content_type(&self, content_type: &str) {
        self.lock()
            .failing_content_types
            .insert(content_type.to_string());
    }

    /// Makes every subsequent media query fail.
    pub fn fail_media(&self) {
        self.lock().fail_media = true;
    }

    /// All queries received so far, in arrival order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }
}

/// Each id once, in first-seen order; a record matches at most once however
/// often its id is requested.
fn distinct(document_ids: &[String]) -> impl Iterator<Item = &String> {
    let mut seen = HashSet::new();
    document_ids
        .iter()
        .filter(move |id| seen.insert(*id))
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn find_media(&self, document_ids: &[String]) -> Result<Vec<ResolvedMedia>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Media {
            document_ids: document_ids.to_vec(),
        });
        if inner.fail_media {
            return Err(PopulateError::Store {
                message: "media query failed".to_string(),
                content_type: "plugin::upload.file".to_string(),
            });
        }
        Ok(distinct(document_ids)
            .filter_map(|id| inner.media.get(id).cloned())
            .collect())
    }

    async fn find_entries(
        &self,
        content_type: &str,
        document_ids: &[String],
    ) -> Result<Vec<Value>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Entries {
            content_type: content_type.to_string(),
            document_ids: document_ids.to_vec(),
        });
        if inner.failing_content_types.contains(content_type) {
            return Err(PopulateError::Store {
                message: "entry query failed".to_string(),
                content_type: content_type.to_string(),
            });
        }
        let Some(records) = inner.entries.get(content_type) else {
            return Ok(Vec::new());
        };
        Ok(distinct(document_ids)
            .filter_map(|id| records.get(id).cloned())
            .collect())
    }
}
