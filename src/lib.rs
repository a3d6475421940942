pub mod change;
pub mod config;
pub mod db;
pub mod document;
pub mod errors;
pub mod extraction;
pub mod merge;
pub mod populate;
pub mod resolution;
pub mod server;
pub mod store;
pub mod types;
