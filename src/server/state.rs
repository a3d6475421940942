use std::sync::Arc;
use std::time::Instant;

use crate::config::PopulateConfig;
use crate::populate::Populator;
use crate::store::ReferenceStore;

/// Application state shared across handlers.
pub struct AppState {
    pub config: PopulateConfig,
    pub populator: Populator,
    started_at: Instant,
}

impl AppState {
    pub fn new(config: PopulateConfig, store: Arc<dyn ReferenceStore>) -> Self {
        let populator = Populator::from_config(store, &config);
        Self {
            config,
            populator,
            started_at: Instant::now(),
        }
    }

    /// The document field to use when a request names none.
    pub fn lexical_field<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|field| !field.is_empty())
            .unwrap_or(&self.config.lexical_field)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
