use std::collections::HashSet;

use crate::types::ReferenceSet;

/// Returns `true` unless `prev` and `next` hold exactly the same references.
///
/// This is a set comparison: element order is irrelevant, only membership by
/// reference identity counts. Used to skip resolve/merge cycles when an edit
/// did not touch any reference node.
pub fn references_changed(prev: &ReferenceSet, next: &ReferenceSet) -> bool {
    if prev.media().len() != next.media().len() || prev.entries().len() != next.entries().len() {
        return true;
    }

    let next_media: HashSet<&str> = next.media().iter().map(|m| m.document_id.as_str()).collect();
    if prev
        .media()
        .iter()
        .any(|m| !next_media.contains(m.document_id.as_str()))
    {
        return true;
    }

    let next_entries: HashSet<(&str, &str)> = next
        .entries()
        .iter()
        .map(|e| (e.document_id.as_str(), e.content_type.as_str()))
        .collect();
    prev.entries().iter().any(|e| {
        !next_entries.contains(&(e.document_id.as_str(), e.content_type.as_str()))
    })
}

/// Returns `true` when `set` no longer matches a previously stored
/// [`ReferenceSet::fingerprint`].
pub fn fingerprint_changed(stored_fingerprint: &str, set: &ReferenceSet) -> bool {
    set.fingerprint() != stored_fingerprint
}
