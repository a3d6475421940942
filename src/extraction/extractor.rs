use serde_json::Value;

use crate::document::{read_document_field, root_children, NodeView};
use crate::types::ReferenceSet;

/// Default nesting limit for tree walks. Nodes below it are not inspected.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Collects typed references from document trees.
///
/// Extraction is total: absent, malformed or partially malformed input yields
/// whatever references could be found, never an error. The input is never
/// modified.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceExtractor {
    max_depth: usize,
}

impl Default for ReferenceExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl ReferenceExtractor {
    /// Creates an extractor that stops descending below `max_depth` levels
    /// (the root's children sit at depth 1).
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Extracts references from a whole tree (`{"root": {"children": [...]}}`).
    ///
    /// Result order equals first occurrence in a pre-order walk.
    pub fn extract(&self, tree: &Value) -> ReferenceSet {
        let mut set = ReferenceSet::new();
        if let Some(children) = root_children(tree) {
            let mut truncated = false;
            self.walk(children, 1, &mut set, &mut truncated);
            if truncated {
                tracing::warn!(
                    max_depth = self.max_depth,
                    "document tree exceeds depth limit; deeper nodes were not inspected"
                );
            }
        }
        set
    }

    /// Extracts references from the tree stored at `entity[field]`, which may
    /// be inline JSON or a JSON-encoded string.
    pub fn extract_field(&self, entity: &Value, field: &str) -> ReferenceSet {
        match read_document_field(entity, field) {
            Some(doc) => self.extract(&doc.tree),
            None => ReferenceSet::new(),
        }
    }

    fn walk(&self, nodes: &[Value], depth: usize, set: &mut ReferenceSet, truncated: &mut bool) {
        if depth > self.max_depth {
            *truncated = true;
            return;
        }

        for node in nodes {
            let Some(view) = NodeView::classify(node) else {
                continue;
            };

            match view {
                NodeView::MediaReference { document_id, .. } => {
                    set.insert_media(document_id);
                }
                NodeView::EntryReference {
                    document_id,
                    content_type,
                    ..
                } => {
                    set.insert_entry(document_id, content_type);
                }
                NodeView::Opaque { .. } => {}
            }

            if let Some(children) = view.children() {
                self.walk(children, depth + 1, set, truncated);
            }
        }
    }
}

/// Extracts references with the default depth limit.
pub fn extract_references(tree: &Value) -> ReferenceSet {
    ReferenceExtractor::default().extract(tree)
}
