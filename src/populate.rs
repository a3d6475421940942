//! End-to-end populate operations.
//!
//! [`Populator`] composes extraction, batch resolution and merging into the
//! operations exposed at the service boundary. Every call is self-contained:
//! nothing is cached between calls and the store is only read.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::PopulateConfig;
use crate::document::read_document_field;
use crate::errors::Result;
use crate::extraction::{ReferenceExtractor, DEFAULT_MAX_DEPTH};
use crate::merge::TreeMerger;
use crate::resolution::{BatchResolver, TitleFields, DEFAULT_MAX_CONCURRENT_QUERIES};
use crate::store::ReferenceStore;
use crate::types::*;

/// Result of populating one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulateOutcome {
    /// The enriched entity, or the original when there was nothing to do.
    pub entity: Value,
    /// References extracted from the entity's document field.
    pub references: ReferenceSet,
    pub stats: MergeStats,
}

/// Result of populating a batch of entities.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    /// Entities in input order; ones without a readable document field are
    /// returned unpopulated.
    pub entities: Vec<Value>,
    /// Union of all references across the batch, resolved once.
    pub references: ReferenceSet,
    /// Sum of each entity's own entry reference count.
    pub entry_reference_total: usize,
}

/// Inputs split by whether the store holds a matching record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition<T> {
    pub valid: Vec<T>,
    pub invalid: Vec<T>,
}

impl<T> Default for Partition<T> {
    fn default() -> Self {
        Self {
            valid: Vec::new(),
            invalid: Vec::new(),
        }
    }
}

/// Result of checking references against the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub media: Partition<String>,
    pub entries: Partition<EntryReference>,
}

/// Orchestrates extract, resolve and merge over a shared backing store.
pub struct Populator {
    store: Arc<dyn ReferenceStore>,
    titles: TitleFields,
    max_depth: usize,
    max_concurrent: usize,
}

impl Populator {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self {
            store,
            titles: TitleFields::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_concurrent: DEFAULT_MAX_CONCURRENT_QUERIES,
        }
    }

    /// Creates a populator using the limits and title fields of `config`.
    pub fn from_config(store: Arc<dyn ReferenceStore>, config: &PopulateConfig) -> Self {
        Self::new(store)
            .with_title_fields(config.title_fields())
            .with_max_depth(config.max_depth)
            .with_max_concurrent(config.max_concurrent_queries)
    }

    pub fn with_title_fields(mut self, titles: TitleFields) -> Self {
        self.titles = titles;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn store(&self) -> &dyn ReferenceStore {
        self.store.as_ref()
    }

    fn extractor(&self) -> ReferenceExtractor {
        ReferenceExtractor::new(self.max_depth)
    }

    fn merger(&self) -> TreeMerger {
        TreeMerger::new(self.max_depth)
    }

    fn resolver(&self) -> BatchResolver<'_> {
        BatchResolver::new(self.store.as_ref(), &self.titles)
            .with_max_concurrent(self.max_concurrent)
    }

    /// Extracts the references of the document stored at `entity[field]`.
    pub fn extract(&self, entity: &Value, field: &str) -> ReferenceSet {
        self.extractor().extract_field(entity, field)
    }

    /// Resolves every reference of `set` against the store.
    pub async fn resolve(&self, set: &ReferenceSet) -> ResolvedSet {
        self.resolver().resolve(set).await
    }

    /// Populates the document stored at `entity[field]`.
    ///
    /// Returns the entity unchanged when the field is absent or malformed, or
    /// when the document holds no references.
    pub async fn populate(&self, entity: &Value, field: &str) -> PopulateOutcome {
        let Some(doc) = read_document_field(entity, field) else {
            return PopulateOutcome {
                entity: entity.clone(),
                references: ReferenceSet::new(),
                stats: MergeStats::default(),
            };
        };

        let references = self.extractor().extract(&doc.tree);
        if references.is_empty() {
            return PopulateOutcome {
                entity: entity.clone(),
                references,
                stats: MergeStats::default(),
            };
        }

        let resolved = self.resolve(&references).await;
        let merged = self.merger().merge_resolved(&doc.tree, &resolved);

        PopulateOutcome {
            entity: doc.replace(merged.tree),
            references,
            stats: merged.stats,
        }
    }

    /// Populates a batch of entities with a single resolve pass.
    ///
    /// References from all entities are unioned before resolving, then each
    /// entity is merged independently. An entity whose document field cannot
    /// be read is returned in its original form without affecting the rest.
    pub async fn populate_many(&self, entities: &[Value], field: &str) -> BulkOutcome {
        let extractor = self.extractor();
        let docs: Vec<_> = entities
            .iter()
            .map(|entity| read_document_field(entity, field))
            .collect();

        let mut union = ReferenceSet::new();
        let mut entry_reference_total = 0;
        for doc in docs.iter().flatten() {
            let references = extractor.extract(&doc.tree);
            entry_reference_total += references.entries().len();
            union.extend_from(&references);
        }

        if union.is_empty() {
            return BulkOutcome {
                entities: entities.to_vec(),
                references: union,
                entry_reference_total,
            };
        }

        let resolved = self.resolve(&union).await;
        let merger = self.merger();
        let populated: Vec<Value> = entities
            .iter()
            .zip(docs)
            .map(|(entity, doc)| {
                let Some(doc) = doc else {
                    tracing::debug!(
                        field,
                        document_id = ?entity.get("documentId"),
                        "no readable document field; returning entity as is"
                    );
                    return entity.clone();
                };
                doc.replace(merger.merge_resolved(&doc.tree, &resolved).tree)
            })
            .collect();

        tracing::debug!(
            entities = entities.len(),
            media = union.media().len(),
            entries = union.entries().len(),
            "bulk populate finished"
        );

        BulkOutcome {
            entities: populated,
            references: union,
            entry_reference_total,
        }
    }

    /// Splits `media` ids and `entries` by whether the store has them.
    pub async fn validate_references(
        &self,
        media: &[String],
        entries: &[EntryReference],
    ) -> ValidationReport {
        let resolver = self.resolver();
        let (found_media, found_entries) =
            tokio::join!(resolver.resolve_media(media), resolver.resolve_entries(entries));

        let found_media: HashSet<&str> = found_media
            .iter()
            .map(|m| m.document_id.as_str())
            .collect();
        let found_entries: HashSet<(&str, &str)> = found_entries
            .iter()
            .map(|e| (e.document_id.as_str(), e.content_type.as_str()))
            .collect();

        let mut report = ValidationReport {
            media: Partition::default(),
            entries: Partition::default(),
        };
        for id in media {
            if found_media.contains(id.as_str()) {
                report.media.valid.push(id.clone());
            } else {
                report.media.invalid.push(id.clone());
            }
        }
        for entry in entries {
            if found_entries.contains(&(entry.document_id.as_str(), entry.content_type.as_str())) {
                report.entries.valid.push(entry.clone());
            } else {
                report.entries.invalid.push(entry.clone());
            }
        }
        report
    }

    /// Fetches one entity from the store.
    pub async fn find_entity(&self, content_type: &str, document_id: &str) -> Result<Option<Value>> {
        self.store.find_entry(content_type, document_id).await
    }

    /// Fetches several entities of one content type from the store.
    pub async fn find_entities(
        &self,
        content_type: &str,
        document_ids: &[String],
    ) -> Result<Vec<Value>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.store.find_entries(content_type, document_ids).await
    }
}
