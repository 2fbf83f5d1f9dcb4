//! Scheme-keyed adapter registries.

use crate::error::{WorkerError, WorkerResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of adapters keyed by DB URL scheme.
///
/// Built once before the worker loop starts and read-only thereafter; the
/// worker resolves an adapter by inspecting the configured DB URL prefix.
pub struct AdapterRegistry<T: ?Sized> {
    adapters: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Default for AdapterRegistry<T> {
    fn default() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }
}

impl<T: ?Sized> AdapterRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for a URL scheme (e.g. `mongodb`, `postgresql`).
    pub fn register(&mut self, scheme: impl Into<String>, adapter: Arc<T>) {
        self.adapters.insert(scheme.into(), adapter);
    }

    /// Resolve the adapter for a DB URL by its scheme.
    pub fn resolve(&self, db_url: &str) -> WorkerResult<Arc<T>> {
        let scheme = scheme_of(db_url);
        self.adapters
            .get(scheme)
            .cloned()
            .ok_or_else(|| WorkerError::AdapterNotFound {
                scheme: scheme.to_string(),
            })
    }

    /// Registered schemes, for startup logging.
    pub fn schemes(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }
}

fn scheme_of(url: &str) -> &str {
    url.split("://").next().unwrap_or(url)
}
