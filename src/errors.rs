use thiserror::Error;

/// Errors that can occur while extracting, resolving or populating references.
#[derive(Error, Debug)]
pub enum PopulateError {
    #[error("file error: {message} (path: {path})")]
    File { message: String, path: String },

    #[error("database error: {message} (operation: {operation})")]
    Database { message: String, operation: String },

    #[error("store error: {message} (content type: {content_type})")]
    Store {
        message: String,
        content_type: String,
    },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results using `PopulateError`.
pub type Result<T> = std::result::Result<T, PopulateError>;
