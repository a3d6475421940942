/// Reference resolution module.
///
/// Turns extracted references into resolved records by querying the backing
/// store in batches: one query for all media, one query per entry content type.
mod resolver;
mod title;

pub use resolver::{group_by_content_type, BatchResolver, DEFAULT_MAX_CONCURRENT_QUERIES};
pub use title::{TitleFields, DEFAULT_TITLE_FIELDS};
