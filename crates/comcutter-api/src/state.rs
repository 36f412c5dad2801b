//! Application state.

use std::sync::Arc;

use comcutter_queue::Dispatcher;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub dispatcher: Arc<Dispatcher>,
    /// Size of the worker pool draining the dispatcher's queue
    pub workers: usize,
}

impl AppState {
    pub fn new(config: ApiConfig, dispatcher: Dispatcher, workers: usize) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
            workers,
        }
    }

    /// Whether `key` matches the configured api key. Empty keys never match.
    pub fn authorized(&self, key: Option<&str>) -> bool {
        matches!(key, Some(k) if !k.is_empty() && k == self.config.apikey)
    }
}
