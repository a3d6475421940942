//! Merging resolved records back into document trees.
//!
//! The merger re-walks the tree in the same pre-order as the extractor and
//! produces a new tree: reference nodes get fresh `src`/`title`/`metadata`/
//! `data` attributes, every other node is copied with only its children
//! merged. The input tree is never modified and node positions are preserved.

use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::document::{root_children, NodeView};
use crate::extraction::DEFAULT_MAX_DEPTH;
use crate::types::{MergeStats, ResolvedEntry, ResolvedMedia, ResolvedSet};

/// Metadata keys owned by media resolution; other keys on a node survive.
pub const MEDIA_METADATA_KEYS: &[&str] = &[
    "url",
    "alternativeText",
    "caption",
    "width",
    "height",
    "mime",
    "size",
    "updatedAt",
];

/// Metadata keys owned by entry resolution; other keys on a node survive.
pub const ENTRY_METADATA_KEYS: &[&str] = &["title", "publishedAt", "updatedAt", "locale", "status"];

/// A merged tree together with the counters collected while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTree {
    pub tree: Value,
    pub stats: MergeStats,
}

/// Resolved records indexed by reference identity.
struct ResolvedIndex<'a> {
    media: HashMap<&'a str, &'a ResolvedMedia>,
    /// content type -> document id -> record
    entries: HashMap<&'a str, HashMap<&'a str, &'a ResolvedEntry>>,
}

impl<'a> ResolvedIndex<'a> {
    fn new(media: &'a [ResolvedMedia], entries: &'a [ResolvedEntry]) -> Self {
        let mut media_index = HashMap::new();
        for m in media {
            media_index.entry(m.document_id.as_str()).or_insert(m);
        }

        let mut entry_index: HashMap<&str, HashMap<&str, &ResolvedEntry>> = HashMap::new();
        for e in entries {
            entry_index
                .entry(e.content_type.as_str())
                .or_default()
                .entry(e.document_id.as_str())
                .or_insert(e);
        }

        Self {
            media: media_index,
            entries: entry_index,
        }
    }

    fn media(&self, document_id: &str) -> Option<&'a ResolvedMedia> {
        self.media.get(document_id).copied()
    }

    fn entry(&self, document_id: &str, content_type: &str) -> Option<&'a ResolvedEntry> {
        self.entries.get(content_type)?.get(document_id).copied()
    }
}

/// Produces enriched copies of document trees from resolved records.
#[derive(Debug, Clone, Copy)]
pub struct TreeMerger {
    max_depth: usize,
}

impl Default for TreeMerger {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl TreeMerger {
    /// Creates a merger that copies subtrees below `max_depth` unchanged.
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Merges `media` and `entries` into `tree`.
    ///
    /// Malformed trees (no `root.children` array) are returned as an unchanged
    /// copy. Merging is idempotent for a fixed pair of resolved lists.
    pub fn merge(
        &self,
        tree: &Value,
        media: &[ResolvedMedia],
        entries: &[ResolvedEntry],
    ) -> MergedTree {
        let mut stats = MergeStats::default();

        let (Some(children), Some(top), Some(root)) = (
            root_children(tree),
            tree.as_object(),
            tree.get("root").and_then(Value::as_object),
        ) else {
            return MergedTree {
                tree: tree.clone(),
                stats,
            };
        };

        let index = ResolvedIndex::new(media, entries);
        let merged_children = self.merge_nodes(children, 1, &index, &mut stats);

        let mut new_root = copy_without_children(root);
        new_root.insert("children".to_string(), Value::Array(merged_children));

        let mut new_top = Map::with_capacity(top.len());
        for (key, value) in top {
            if key != "root" {
                new_top.insert(key.clone(), value.clone());
            }
        }
        new_top.insert("root".to_string(), Value::Object(new_root));

        if stats.depth_limited {
            tracing::warn!(
                max_depth = self.max_depth,
                "document tree exceeds depth limit; deeper nodes were copied unchanged"
            );
        }

        MergedTree {
            tree: Value::Object(new_top),
            stats,
        }
    }

    /// Convenience wrapper taking a `ResolvedSet`.
    pub fn merge_resolved(&self, tree: &Value, resolved: &ResolvedSet) -> MergedTree {
        self.merge(tree, &resolved.media, &resolved.entries)
    }

    fn merge_nodes(
        &self,
        nodes: &[Value],
        depth: usize,
        index: &ResolvedIndex<'_>,
        stats: &mut MergeStats,
    ) -> Vec<Value> {
        if depth > self.max_depth {
            stats.depth_limited = true;
            return nodes.to_vec();
        }
        nodes
            .iter()
            .map(|node| self.merge_node(node, depth, index, stats))
            .collect()
    }

    fn merge_node(
        &self,
        node: &Value,
        depth: usize,
        index: &ResolvedIndex<'_>,
        stats: &mut MergeStats,
    ) -> Value {
        let Some(view) = NodeView::classify(node) else {
            return node.clone();
        };

        let attrs = view.attrs();
        let mut out = copy_without_children(attrs);

        match view {
            NodeView::MediaReference { document_id, .. } => match index.media(document_id) {
                Some(media) => {
                    apply_media(&mut out, attrs, media);
                    stats.media_resolved += 1;
                }
                None => {
                    stats.misses += 1;
                    tracing::warn!(
                        document_id,
                        "media reference not resolved; keeping stale node data"
                    );
                }
            },
            NodeView::EntryReference {
                document_id,
                content_type,
                ..
            } => match index.entry(document_id, content_type) {
                Some(entry) => {
                    apply_entry(&mut out, attrs, entry);
                    stats.entries_resolved += 1;
                }
                None => {
                    stats.misses += 1;
                    tracing::warn!(
                        document_id,
                        content_type,
                        "entry reference not resolved; keeping stale node data"
                    );
                }
            },
            NodeView::Opaque { .. } => {}
        }

        if let Some(children) = view.children() {
            out.insert(
                "children".to_string(),
                Value::Array(self.merge_nodes(children, depth + 1, index, stats)),
            );
        }

        Value::Object(out)
    }
}

/// Copies every attribute except an array-valued `children`, which the
/// caller rebuilds.
fn copy_without_children(attrs: &Map<String, Value>) -> Map<String, Value> {
    attrs
        .iter()
        .filter(|(key, value)| !(key.as_str() == "children" && value.is_array()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn prior_metadata(attrs: &Map<String, Value>) -> Map<String, Value> {
    attrs
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn apply_media(out: &mut Map<String, Value>, attrs: &Map<String, Value>, media: &ResolvedMedia) {
    let display = media.display_url();
    if !display.is_empty() {
        out.insert("src".to_string(), Value::String(display.to_string()));
    }

    let mut metadata = prior_metadata(attrs);
    let fresh = json!({
        "url": media.url,
        "alternativeText": media.alternative_text,
        "caption": media.caption,
        "width": media.width,
        "height": media.height,
        "mime": media.mime_type,
        "size": media.size,
        "updatedAt": media.updated_at,
    });
    if let Value::Object(fresh) = fresh {
        metadata.extend(fresh);
    }
    out.insert("metadata".to_string(), Value::Object(metadata));
}

fn apply_entry(out: &mut Map<String, Value>, attrs: &Map<String, Value>, entry: &ResolvedEntry) {
    let title = entry
        .title
        .clone()
        .or_else(|| attrs.get("title").and_then(Value::as_str).map(str::to_string));
    if let Some(title) = &title {
        out.insert("title".to_string(), Value::String(title.clone()));
    }

    let mut metadata = prior_metadata(attrs);
    let fresh = json!({
        "title": title,
        "publishedAt": entry.published_at,
        "updatedAt": entry.updated_at,
        "locale": entry.locale,
        "status": entry.status(),
    });
    if let Value::Object(fresh) = fresh {
        metadata.extend(fresh);
    }
    out.insert("metadata".to_string(), Value::Object(metadata));
    out.insert("data".to_string(), entry.raw.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_without_children_keeps_non_array_children() {
        let attrs = json!({"type": "x", "children": null, "a": 1});
        let copied = copy_without_children(attrs.as_object().unwrap());
        assert_eq!(copied.get("children"), Some(&Value::Null));

        let attrs = json!({"type": "x", "children": [], "a": 1});
        let copied = copy_without_children(attrs.as_object().unwrap());
        assert!(copied.get("children").is_none());
        assert_eq!(copied.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_index_first_record_wins() {
        let media = vec![
            ResolvedMedia::new("m1", "/first.png"),
            ResolvedMedia::new("m1", "/second.png"),
        ];
        let index = ResolvedIndex::new(&media, &[]);
        assert_eq!(index.media("m1").map(|m| m.url.as_str()), Some("/first.png"));
        assert!(index.entry("e1", "api::post.post").is_none());
    }
}
