//! Backing-store seam.
//!
//! The populate core only reads from the system of record, and only through
//! the batched fetch-by-identifier operations on [`ReferenceStore`]. The
//! SQLite implementation lives in [`crate::db`]; [`memory::MemoryStore`] is an
//! in-process implementation used by tests.

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Result;
use crate::types::ResolvedMedia;

pub use memory::{MemoryStore, StoreCall};

/// Read-only access to media assets and content entries.
///
/// Every method is a single bounded query. Identifiers that do not exist are
/// silently omitted from the result, and a record is returned at most once
/// however often its identifier is requested.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Fetches the media records whose `documentId` is in `document_ids`.
    async fn find_media(&self, document_ids: &[String]) -> Result<Vec<ResolvedMedia>>;

    /// Fetches the raw records of `content_type` whose `documentId` is in
    /// `document_ids`. Each record is a JSON object carrying at least
    /// `documentId`.
    async fn find_entries(&self, content_type: &str, document_ids: &[String])
        -> Result<Vec<Value>>;

    /// Fetches a single record of `content_type`.
    async fn find_entry(&self, content_type: &str, document_id: &str) -> Result<Option<Value>> {
        let mut found = self
            .find_entries(content_type, &[document_id.to_string()])
            .await?;
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }
}
