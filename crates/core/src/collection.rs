//! Page collection engine
//!
//! The single source of truth for page order, display indices, and the
//! selection set. Every structural mutation and every thumbnail publish
//! goes through one state mutex, so operations are fully serialized;
//! rendering itself runs on the pipeline's worker threads and only touches
//! the state briefly to write a result back.

use crate::entry::{PageEntry, PageId, PageSummary};
use crate::pipeline::{PublishFn, RenderRequest, ThumbnailPipeline};
use crate::source::{SourceId, SourceRegistry};
use pdf_binder_cache::{CacheStats, ThumbnailCache, DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES};
use pdf_binder_render::{PageSource, ThumbnailTarget};
use pdf_binder_scheduler::{BatchHandle, DEFAULT_BATCH_SIZE};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Errors reported by collection operations
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// Delete requested with an unusable selection; the collection is left
    /// unmodified.
    #[error("invalid selection: {0}")]
    InvalidSelection(&'static str),

    /// Export requested on an empty collection.
    #[error("nothing to export")]
    NothingToExport,

    /// The export sink reported a failure; surfaced verbatim.
    #[error("export failed: {0}")]
    ExportFailed(String),
}

/// Outcome of the most recent operation, for transient UI feedback.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperationStatus {
    pub success: bool,
    pub message: String,
}

impl OperationStatus {
    /// A successful outcome with a user-facing message.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// A failed outcome with a user-facing message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl Default for OperationStatus {
    fn default() -> Self {
        Self::ok("")
    }
}

/// Tunables for a page collection
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Number of thumbnails rendered concurrently per batch
    pub batch_size: usize,

    /// Entry-count budget for the thumbnail cache
    pub cache_max_entries: usize,

    /// Byte budget for the thumbnail cache
    pub cache_max_bytes: usize,

    /// Target bounding box for rendered thumbnails
    pub thumbnail_target: ThumbnailTarget,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cache_max_entries: DEFAULT_MAX_ENTRIES,
            cache_max_bytes: DEFAULT_MAX_BYTES,
            thumbnail_target: ThumbnailTarget::DEFAULT,
        }
    }
}

impl CollectionConfig {
    /// Create a configuration with the default tunables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the render batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the thumbnail cache budgets.
    pub fn with_cache_budgets(mut self, max_entries: usize, max_bytes: usize) -> Self {
        self.cache_max_entries = max_entries;
        self.cache_max_bytes = max_bytes;
        self
    }

    /// Set the thumbnail target box.
    pub fn with_thumbnail_target(mut self, target: ThumbnailTarget) -> Self {
        self.thumbnail_target = target;
        self
    }
}

/// Callback registered by the UI layer, invoked after every structural
/// mutation and every published thumbnail.
type ChangeListener = Arc<dyn Fn() + Send + Sync>;

struct CollectionState {
    entries: Vec<PageEntry>,
    selection: HashSet<PageId>,
    importing: bool,
    status: OperationStatus,
}

/// Ordered collection of page entries drawn from multiple sources.
///
/// Owns the selection set and drives the thumbnail pipeline on insert and
/// delete. Clones share the same underlying state, so the importer, the
/// export surface, and the UI layer can hold the collection jointly.
///
/// Display indices are the invariant this type maintains: after any
/// operation returns, entry `display_index` values are exactly `1..=N` in
/// sequence order.
pub struct PageCollection {
    state: Arc<Mutex<CollectionState>>,
    registry: SourceRegistry,
    pipeline: Arc<ThumbnailPipeline>,
    render_handles: Arc<Mutex<Vec<BatchHandle>>>,
    listener: Arc<Mutex<Option<ChangeListener>>>,
}

impl PageCollection {
    /// Create a collection with the default configuration.
    pub fn new() -> Self {
        Self::with_config(CollectionConfig::default())
    }

    /// Create a collection with explicit tunables.
    pub fn with_config(config: CollectionConfig) -> Self {
        let cache = Arc::new(ThumbnailCache::new(
            config.cache_max_entries,
            config.cache_max_bytes,
        ));
        let pipeline = ThumbnailPipeline::new(config.batch_size, config.thumbnail_target, cache);

        Self {
            state: Arc::new(Mutex::new(CollectionState {
                entries: Vec::new(),
                selection: HashSet::new(),
                importing: false,
                status: OperationStatus::default(),
            })),
            registry: SourceRegistry::new(),
            pipeline: Arc::new(pipeline),
            render_handles: Arc::new(Mutex::new(Vec::new())),
            listener: Arc::new(Mutex::new(None)),
        }
    }

    // ---- structural operations ----

    /// Expand a source document into page entries appended at the tail.
    ///
    /// One entry per page, preserving the source's page order, with fresh
    /// display indices continuing from the current tail. Thumbnail renders
    /// are scheduled for exactly the new entries. A source with no pages is
    /// a no-op and is not registered.
    ///
    /// Returns the ids of the appended entries.
    pub fn add_source(&self, handle: Arc<dyn PageSource>, label: &str) -> Vec<PageId> {
        let page_count = handle.page_count();
        if page_count == 0 {
            return Vec::new();
        }

        let source_id = self.registry.register(Arc::clone(&handle), label);

        let mut requests = Vec::with_capacity(page_count as usize);
        let ids = {
            let mut state = self.state.lock().unwrap();
            let mut ids = Vec::with_capacity(page_count as usize);
            for origin_index in 0..page_count {
                let entry =
                    PageEntry::new(source_id, label.to_string(), origin_index, Arc::clone(&handle));
                requests.push(RenderRequest {
                    page_id: entry.id,
                    source_id,
                    origin_index,
                    source: Arc::clone(&handle),
                });
                ids.push(entry.id);
                state.entries.push(entry);
            }
            renumber(&mut state.entries);
            state.status =
                OperationStatus::ok(format!("Added {} pages from {}", page_count, label));
            ids
        };

        self.schedule_renders(requests);
        self.notify();
        ids
    }

    /// Remove a set of entries.
    ///
    /// Rejected with [`CollectionError::InvalidSelection`] if `ids` is empty
    /// or if it would remove every remaining entry; in both cases nothing is
    /// mutated. On success pending renders for the removed entries are
    /// cancelled, the entries leave the selection, display indices are
    /// recomputed, and sources with no remaining pages are dropped.
    ///
    /// Ids not present in the collection are ignored; a delete that matches
    /// nothing is a successful no-op. Returns the number of entries removed.
    pub fn delete(&self, ids: &HashSet<PageId>) -> Result<usize, CollectionError> {
        if ids.is_empty() {
            let err = CollectionError::InvalidSelection("no pages selected");
            self.set_status(OperationStatus::failed(err.to_string()));
            return Err(err);
        }

        let removed = {
            let mut state = self.state.lock().unwrap();
            let affected: Vec<PageId> = state
                .entries
                .iter()
                .filter(|entry| ids.contains(&entry.id))
                .map(|entry| entry.id)
                .collect();

            if !state.entries.is_empty() && affected.len() == state.entries.len() {
                let err = CollectionError::InvalidSelection("cannot remove every page");
                state.status = OperationStatus::failed(err.to_string());
                return Err(err);
            }

            self.remove_entries(&mut state, &affected);
            state.status = OperationStatus::ok(format!("Removed {} pages", affected.len()));
            affected.len()
        };

        self.notify();
        Ok(removed)
    }

    /// Remove a single entry, even if it is the last one.
    ///
    /// Returns `true` if the entry was present.
    pub fn remove_one(&self, id: PageId) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if !state.entries.iter().any(|entry| entry.id == id) {
                return false;
            }
            self.remove_entries(&mut state, &[id]);
            state.status = OperationStatus::ok("Removed 1 page");
        }
        self.notify();
        true
    }

    /// Relocate one entry to another entry's current slot.
    ///
    /// Both positions are resolved before any mutation, then the moved entry
    /// is removed and reinserted at the target's resolved index. A move
    /// never touches thumbnails or pipeline state; cache keys are
    /// position-independent. No-op returning `false` if either id is absent.
    pub fn move_page(&self, id_from: PageId, id_to: PageId) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            let Some(pos_from) = position_of(&state.entries, id_from) else {
                return false;
            };
            let Some(pos_to) = position_of(&state.entries, id_to) else {
                return false;
            };

            if pos_from != pos_to {
                let entry = state.entries.remove(pos_from);
                state.entries.insert(pos_to, entry);
                renumber(&mut state.entries);
            }
            state.status = OperationStatus::ok("Moved page");
        }

        self.notify();
        true
    }

    /// Reverse the entry order. No pipeline effect.
    pub fn reverse(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.entries.reverse();
            renumber(&mut state.entries);
            state.status = OperationStatus::ok("Reversed page order");
        }
        self.notify();
    }

    /// Cancel all pending renders and drop entries, selection, sources, and
    /// the thumbnail cache.
    pub fn clear(&self) {
        self.pipeline.cancel_all();
        {
            let mut state = self.state.lock().unwrap();
            state.entries.clear();
            state.selection.clear();
            state.status = OperationStatus::ok("Cleared all pages");
        }
        self.registry.clear();
        self.pipeline.cache().clear();
        self.notify();
    }

    // ---- selection ----

    /// Add an entry to the selection. No-op on an absent id.
    pub fn select(&self, id: PageId) -> bool {
        let changed = {
            let mut state = self.state.lock().unwrap();
            if state.entries.iter().any(|entry| entry.id == id) {
                state.selection.insert(id)
            } else {
                false
            }
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// Remove an entry from the selection. No-op on an absent id.
    pub fn deselect(&self, id: PageId) -> bool {
        let changed = self.state.lock().unwrap().selection.remove(&id);
        if changed {
            self.notify();
        }
        changed
    }

    /// Select every entry.
    pub fn select_all(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.selection = state.entries.iter().map(|entry| entry.id).collect();
        }
        self.notify();
    }

    /// Empty the selection.
    pub fn clear_selection(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.selection.clear();
        }
        self.notify();
    }

    // ---- observable state ----

    /// Snapshot of the entries in display order.
    pub fn entries(&self) -> Vec<PageEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    /// Look up one entry by id.
    pub fn entry(&self, id: PageId) -> Option<PageEntry> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
    }

    /// Serializable snapshots of the entries in display order.
    pub fn summaries(&self) -> Vec<PageSummary> {
        self.state
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(PageEntry::summary)
            .collect()
    }

    /// Snapshot of the selected entry ids.
    pub fn selection(&self) -> HashSet<PageId> {
        self.state.lock().unwrap().selection.clone()
    }

    /// Get the number of selected entries.
    pub fn selected_count(&self) -> usize {
        self.state.lock().unwrap().selection.len()
    }

    /// Check whether an entry is selected.
    pub fn is_selected(&self, id: PageId) -> bool {
        self.state.lock().unwrap().selection.contains(&id)
    }

    /// Get the number of entries.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    /// Check whether the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().entries.is_empty()
    }

    /// Get the number of distinct sources currently represented.
    pub fn source_count(&self) -> usize {
        self.registry.len()
    }

    /// Get the outcome of the most recent operation.
    pub fn last_status(&self) -> OperationStatus {
        self.state.lock().unwrap().status.clone()
    }

    /// Check whether an import is running or renders are pending.
    pub fn is_busy(&self) -> bool {
        self.state.lock().unwrap().importing || self.pipeline.has_pending()
    }

    /// Get current thumbnail cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.pipeline.cache_stats()
    }

    /// Get the render batch size.
    pub fn batch_size(&self) -> usize {
        self.pipeline.batch_size()
    }

    /// Get the thumbnail target box.
    pub fn thumbnail_target(&self) -> ThumbnailTarget {
        self.pipeline.target()
    }

    /// Register the change-notification callback the UI layer redraws on.
    ///
    /// Replaces any previously registered callback. The callback runs on
    /// whichever thread finished the operation, never under the state lock.
    pub fn set_change_listener<F>(&self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.listener.lock().unwrap() = Some(Arc::new(listener));
    }

    /// Block until every scheduled render run has settled.
    ///
    /// Support surface for tests and shutdown paths; the UI layer normally
    /// relies on change notifications instead.
    pub fn wait_for_renders(&self) {
        let drained: Vec<BatchHandle> = self.render_handles.lock().unwrap().drain(..).collect();
        for handle in drained {
            handle.wait();
        }
    }

    // ---- crate-internal plumbing ----

    pub(crate) fn set_status(&self, status: OperationStatus) {
        self.state.lock().unwrap().status = status;
    }

    pub(crate) fn set_importing(&self, importing: bool) {
        self.state.lock().unwrap().importing = importing;
    }

    pub(crate) fn notify(&self) {
        notify_listener(&self.listener);
    }

    /// Remove entries by id under an already-held state lock: cancel their
    /// renders, drop them from the list and the selection, renumber, and
    /// prune sources left without pages.
    fn remove_entries(&self, state: &mut CollectionState, ids: &[PageId]) {
        if ids.is_empty() {
            return;
        }

        self.pipeline.cancel_many(ids);

        let removed: HashSet<PageId> = ids.iter().copied().collect();
        let touched: HashSet<SourceId> = state
            .entries
            .iter()
            .filter(|entry| removed.contains(&entry.id))
            .map(|entry| entry.source_id)
            .collect();

        state.entries.retain(|entry| !removed.contains(&entry.id));
        state.selection.retain(|id| !removed.contains(id));
        renumber(&mut state.entries);

        for source_id in touched {
            if !state.entries.iter().any(|entry| entry.source_id == source_id) {
                self.registry.remove(source_id);
            }
        }
    }

    fn schedule_renders(&self, requests: Vec<RenderRequest>) {
        let state = Arc::clone(&self.state);
        let listener = Arc::clone(&self.listener);
        let publish: PublishFn = Arc::new(move |id, thumbnail| {
            let published = {
                let mut state = state.lock().unwrap();
                match state.entries.iter_mut().find(|entry| entry.id == id) {
                    Some(entry) => {
                        entry.thumbnail = Some(thumbnail);
                        true
                    }
                    None => {
                        log::debug!("dropping thumbnail for removed entry {}", id);
                        false
                    }
                }
            };
            if published {
                notify_listener(&listener);
            }
        });

        let handle = self.pipeline.schedule(requests, publish);

        let mut handles = self.render_handles.lock().unwrap();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }
}

impl Default for PageCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for PageCollection {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            registry: self.registry.clone(),
            pipeline: Arc::clone(&self.pipeline),
            render_handles: Arc::clone(&self.render_handles),
            listener: Arc::clone(&self.listener),
        }
    }
}

/// Reassign display indices to match sequence order.
fn renumber(entries: &mut [PageEntry]) {
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.display_index = position + 1;
    }
}

fn position_of(entries: &[PageEntry], id: PageId) -> Option<usize> {
    entries.iter().position(|entry| entry.id == id)
}

fn notify_listener(listener: &Mutex<Option<ChangeListener>>) {
    let callback = listener.lock().unwrap().clone();
    if let Some(callback) = callback {
        callback();
    }
}
