use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use serde_json::Value;

use super::title::TitleFields;
use crate::store::ReferenceStore;
use crate::types::*;

/// Default number of per-content-type entry queries kept in flight at once.
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 8;

/// Resolves extracted references against a backing store in batches.
///
/// Media is fetched with one query for the whole identifier set. Entries are
/// grouped by content type and fetched with one query per group. Failures
/// never propagate: a failed query contributes no records, which the merger
/// then treats as lookup misses.
pub struct BatchResolver<'a> {
    store: &'a dyn ReferenceStore,
    titles: &'a TitleFields,
    max_concurrent: usize,
}

impl<'a> BatchResolver<'a> {
    pub fn new(store: &'a dyn ReferenceStore, titles: &'a TitleFields) -> Self {
        Self {
            store,
            titles,
            max_concurrent: DEFAULT_MAX_CONCURRENT_QUERIES,
        }
    }

    /// Caps how many entry group queries run concurrently (minimum 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Resolves both media and entries of `set`. The two sub-operations run
    /// concurrently since they touch disjoint store namespaces.
    pub async fn resolve(&self, set: &ReferenceSet) -> ResolvedSet {
        let media_ids = set.media_ids();
        let (media, entries) = tokio::join!(
            self.resolve_media(&media_ids),
            self.resolve_entries(set.entries())
        );
        ResolvedSet { media, entries }
    }

    /// Fetches the media records for `document_ids` with at most one query.
    ///
    /// Empty input returns immediately. Missing identifiers are omitted.
    pub async fn resolve_media(&self, document_ids: &[String]) -> Vec<ResolvedMedia> {
        let mut seen = HashSet::new();
        let ids: Vec<String> = document_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if ids.is_empty() {
            return Vec::new();
        }

        match self.store.find_media(&ids).await {
            Ok(media) => {
                tracing::debug!(
                    requested = ids.len(),
                    found = media.len(),
                    "resolved media references"
                );
                media
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    requested = ids.len(),
                    "media query failed; treating all media references as unresolved"
                );
                Vec::new()
            }
        }
    }

    /// Fetches the entry records for `refs`, one query per distinct content type.
    ///
    /// Groups that fail contribute nothing; other groups still resolve.
    pub async fn resolve_entries(&self, refs: &[EntryReference]) -> Vec<ResolvedEntry> {
        let groups = group_by_content_type(refs);
        if groups.is_empty() {
            return Vec::new();
        }

        let per_group: Vec<Vec<ResolvedEntry>> = stream::iter(groups)
            .map(|(content_type, ids)| async move {
                match self.store.find_entries(&content_type, &ids).await {
                    Ok(records) => {
                        tracing::debug!(
                            content_type = %content_type,
                            requested = ids.len(),
                            found = records.len(),
                            "resolved entry references"
                        );
                        records
                            .into_iter()
                            .filter_map(|record| self.to_resolved_entry(&content_type, record))
                            .collect()
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            content_type = %content_type,
                            requested = ids.len(),
                            "entry query failed; group left unresolved"
                        );
                        Vec::new()
                    }
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        per_group.into_iter().flatten().collect()
    }

    /// Builds a `ResolvedEntry` from a raw store record. Records without a
    /// string `documentId` are dropped.
    fn to_resolved_entry(&self, content_type: &str, record: Value) -> Option<ResolvedEntry> {
        let text = |key: &str| record.get(key).and_then(Value::as_str).map(str::to_string);

        let document_id = text("documentId")?;
        Some(ResolvedEntry {
            document_id,
            content_type: content_type.to_string(),
            title: self.titles.select(content_type, &record),
            published_at: text("publishedAt"),
            updated_at: text("updatedAt"),
            locale: text("locale"),
            raw: record,
        })
    }
}

/// Groups entry references by content type.
///
/// Groups appear in order of each content type's first occurrence; ids within
/// a group keep input order and are deduplicated.
pub fn group_by_content_type(refs: &[EntryReference]) -> Vec<(String, Vec<String>)> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut seen: HashSet<(&str, &str)> = HashSet::new();

    for r in refs {
        if !seen.insert((r.content_type.as_str(), r.document_id.as_str())) {
            continue;
        }
        let index = *slot.entry(r.content_type.as_str()).or_insert_with(|| {
            groups.push((r.content_type.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[index].1.push(r.document_id.clone());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_content_type_is_stable() {
        let refs = vec![
            EntryReference::new("a", "api::post.post"),
            EntryReference::new("b", "api::page.page"),
            EntryReference::new("c", "api::post.post"),
            EntryReference::new("a", "api::post.post"),
        ];
        let groups = group_by_content_type(&refs);
        assert_eq!(
            groups,
            vec![
                (
                    "api::post.post".to_string(),
                    vec!["a".to_string(), "c".to_string()]
                ),
                ("api::page.page".to_string(), vec!["b".to_string()]),
            ]
        );
    }

    #[test]
    fn test_group_empty() {
        assert!(group_by_content_type(&[]).is_empty());
    }
}
