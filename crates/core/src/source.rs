//! Source document registry
//!
//! Maps source identifiers to opened document handles. A source stays
//! registered only while at least one of its pages is present in the
//! collection; the collection prunes it when its last entry goes.

use pdf_binder_render::PageSource;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Unique identifier for a registered source document.
///
/// Assigned monotonically and never reused, so cache keys derived from a
/// pruned source can never collide with a later import.
pub type SourceId = u64;

struct RegisteredSource {
    label: String,
    handle: Arc<dyn PageSource>,
}

struct RegistryState {
    sources: HashMap<SourceId, RegisteredSource>,
    next_id: SourceId,
}

/// Registry of opened source documents.
///
/// Clones share the same underlying state, so the collection and the
/// importer can hold the registry jointly.
pub struct SourceRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState {
                sources: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Register an opened document and return its source id.
    pub fn register(&self, handle: Arc<dyn PageSource>, label: &str) -> SourceId {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id;
        state.next_id += 1;
        state.sources.insert(
            id,
            RegisteredSource {
                label: label.to_string(),
                handle,
            },
        );
        id
    }

    /// Look up a document handle by source id.
    pub fn lookup(&self, id: SourceId) -> Option<Arc<dyn PageSource>> {
        self.state
            .lock()
            .unwrap()
            .sources
            .get(&id)
            .map(|s| Arc::clone(&s.handle))
    }

    /// Get the display label recorded for a source.
    pub fn label(&self, id: SourceId) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sources
            .get(&id)
            .map(|s| s.label.clone())
    }

    /// Drop a source. Returns `true` if it was registered.
    pub fn remove(&self, id: SourceId) -> bool {
        self.state.lock().unwrap().sources.remove(&id).is_some()
    }

    /// Check whether a source is registered.
    pub fn contains(&self, id: SourceId) -> bool {
        self.state.lock().unwrap().sources.contains_key(&id)
    }

    /// Get the number of registered sources.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().sources.len()
    }

    /// Check whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().sources.is_empty()
    }

    /// Drop every registered source.
    pub fn clear(&self) {
        self.state.lock().unwrap().sources.clear();
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SourceRegistry {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}
