use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Node type tag of a media reference node.
pub const MEDIA_REFERENCE_TYPE: &str = "media-reference";

/// Node type tag of an entry reference node.
pub const ENTRY_REFERENCE_TYPE: &str = "entry-reference";

/// A reference to a media asset. Identity is the `document_id` alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaReference {
    pub document_id: String,
}

/// A reference to a content entry. Identity is the `(document_id, content_type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReference {
    pub document_id: String,
    pub content_type: String,
}

impl EntryReference {
    pub fn new(document_id: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            content_type: content_type.into(),
        }
    }
}

/// Deduplicated, insertion-ordered references extracted from a document tree.
///
/// No two `media` elements share a `document_id` and no two `entries` share
/// the `(document_id, content_type)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ReferenceSetRepr", into = "ReferenceSetRepr")]
pub struct ReferenceSet {
    media: Vec<MediaReference>,
    entries: Vec<EntryReference>,
    seen_media: HashSet<String>,
    seen_entries: HashSet<(String, String)>,
}

#[derive(Serialize, Deserialize)]
struct ReferenceSetRepr {
    #[serde(default)]
    media: Vec<MediaReference>,
    #[serde(default)]
    entries: Vec<EntryReference>,
}

impl From<ReferenceSetRepr> for ReferenceSet {
    fn from(repr: ReferenceSetRepr) -> Self {
        let mut set = ReferenceSet::new();
        for m in repr.media {
            set.insert_media(m.document_id);
        }
        for e in repr.entries {
            set.insert_entry(e.document_id, e.content_type);
        }
        set
    }
}

impl From<ReferenceSet> for ReferenceSetRepr {
    fn from(set: ReferenceSet) -> Self {
        Self {
            media: set.media,
            entries: set.entries,
        }
    }
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a media reference unless one with the same `document_id` exists.
    /// Returns `true` when the reference was new.
    pub fn insert_media(&mut self, document_id: impl Into<String>) -> bool {
        let document_id = document_id.into();
        if !self.seen_media.insert(document_id.clone()) {
            return false;
        }
        self.media.push(MediaReference { document_id });
        true
    }

    /// Adds an entry reference unless the exact identity pair exists.
    /// Returns `true` when the reference was new.
    pub fn insert_entry(
        &mut self,
        document_id: impl Into<String>,
        content_type: impl Into<String>,
    ) -> bool {
        let reference = EntryReference::new(document_id, content_type);
        let key = (
            reference.document_id.clone(),
            reference.content_type.clone(),
        );
        if !self.seen_entries.insert(key) {
            return false;
        }
        self.entries.push(reference);
        true
    }

    /// Merges every reference of `other` into this set, keeping first-seen order.
    pub fn extend_from(&mut self, other: &ReferenceSet) {
        for m in &other.media {
            self.insert_media(m.document_id.clone());
        }
        for e in &other.entries {
            self.insert_entry(e.document_id.clone(), e.content_type.clone());
        }
    }

    pub fn media(&self) -> &[MediaReference] {
        &self.media
    }

    pub fn entries(&self) -> &[EntryReference] {
        &self.entries
    }

    /// Media document ids in first-occurrence order.
    pub fn media_ids(&self) -> Vec<String> {
        self.media.iter().map(|m| m.document_id.clone()).collect()
    }

    pub fn contains_media(&self, document_id: &str) -> bool {
        self.seen_media.contains(document_id)
    }

    pub fn contains_entry(&self, document_id: &str, content_type: &str) -> bool {
        self.seen_entries
            .contains(&(document_id.to_string(), content_type.to_string()))
    }

    /// Total number of references, media and entries combined.
    pub fn len(&self) -> usize {
        self.media.len() + self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty() && self.entries.is_empty()
    }

    /// Order-independent SHA-256 digest of the set's identities.
    ///
    /// Two sets share a fingerprint exactly when they contain the same
    /// references, regardless of insertion order.
    pub fn fingerprint(&self) -> String {
        let mut keys: Vec<String> = self
            .media
            .iter()
            .map(|m| format!("m\u{0}{}", m.document_id))
            .chain(
                self.entries
                    .iter()
                    .map(|e| format!("e\u{0}{}\u{0}{}", e.content_type, e.document_id)),
            )
            .collect();
        keys.sort();

        let mut hasher = Sha256::new();
        for key in &keys {
            hasher.update(key.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// A media record fetched from the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMedia {
    pub document_id: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    /// Variant name (`small`, `medium`, ...) to URL.
    #[serde(default)]
    pub formats: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub alternative_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ResolvedMedia {
    /// A record with only the mandatory fields set.
    pub fn new(document_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            url: url.into(),
            thumbnail_url: None,
            formats: Default::default(),
            name: None,
            alternative_text: None,
            caption: None,
            width: None,
            height: None,
            mime_type: None,
            size: None,
            updated_at: None,
        }
    }

    /// URL used for inline display: thumbnail when available, else the full URL.
    pub fn display_url(&self) -> &str {
        self.thumbnail_url.as_deref().unwrap_or(&self.url)
    }
}

/// An entry record fetched from the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEntry {
    pub document_id: String,
    pub content_type: String,
    /// Display title chosen from the record's candidate title fields.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
    /// The full raw record as returned by the store.
    #[serde(rename = "data")]
    pub raw: Value,
}

impl ResolvedEntry {
    /// `"published"` when the record has a publication timestamp, else `"draft"`.
    pub fn status(&self) -> &'static str {
        if self.published_at.is_some() {
            "published"
        } else {
            "draft"
        }
    }
}

/// The outcome of resolving a `ReferenceSet`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSet {
    pub media: Vec<ResolvedMedia>,
    pub entries: Vec<ResolvedEntry>,
}

/// Counters reported by a merge walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub media_resolved: usize,
    pub entries_resolved: usize,
    /// Reference nodes whose identity had no resolved record.
    pub misses: usize,
    /// Whether the walk hit the depth cap and passed a subtree through unread.
    pub depth_limited: bool,
}
