/// SQLite-backed reference store.
///
/// Holds media assets and content entries and answers the batched
/// fetch-by-identifier queries the resolver issues.
mod connection;
mod queries;

pub use connection::Database;
