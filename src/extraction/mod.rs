/// Reference extraction module.
///
/// Walks a serialized document tree depth-first and collects the media and
/// entry references embedded in it, deduplicated by reference identity.
mod extractor;

pub use extractor::{extract_references, ReferenceExtractor, DEFAULT_MAX_DEPTH};
