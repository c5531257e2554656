//! Thumbnail generation pipeline
//!
//! Populates thumbnails for newly added page entries: consults the cache
//! first, otherwise renders through the entry's page source, then publishes
//! the result back into the collection by entry identity. Work runs in
//! fixed-size batches with per-entry cooperative cancellation; a render that
//! loses the race against deletion is dropped at publish time.

use crate::entry::PageId;
use crate::source::SourceId;
use pdf_binder_cache::{CacheStats, ThumbnailCache};
use pdf_binder_render::{PageSource, Thumbnail, ThumbnailTarget};
use pdf_binder_scheduler::{BatchHandle, BatchRunner, CancellationToken, TaskRegistry};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Callback the pipeline invokes with every finished thumbnail.
///
/// The callback runs on a render worker thread and is responsible for
/// locating the entry by id; if the entry has been removed in the meantime
/// the write must be dropped silently.
pub type PublishFn = Arc<dyn Fn(PageId, Thumbnail) + Send + Sync>;

/// Cache lookup key for a rendered thumbnail.
///
/// Derived from the page's identity within its source and the render target
/// size — never from the page's position, so reordering does not invalidate
/// cached thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub source_id: SourceId,
    pub origin_index: u16,
    pub target: ThumbnailTarget,
}

impl RenderKey {
    /// Create a render key.
    pub fn new(source_id: SourceId, origin_index: u16, target: ThumbnailTarget) -> Self {
        Self {
            source_id,
            origin_index,
            target,
        }
    }

    /// Compute the u64 cache key for this render.
    pub fn cache_key(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// One page entry's worth of render work.
pub struct RenderRequest {
    /// Entry the result will be published to
    pub page_id: PageId,

    /// Owning source, for the position-independent cache key
    pub source_id: SourceId,

    /// Page index within the source
    pub origin_index: u16,

    /// Backend that rasterizes the page
    pub source: Arc<dyn PageSource>,
}

impl RenderRequest {
    fn render_key(&self, target: ThumbnailTarget) -> RenderKey {
        RenderKey::new(self.source_id, self.origin_index, target)
    }
}

/// Batched, cancellable thumbnail renderer.
///
/// `schedule` registers every entry synchronously (replacing and cancelling
/// any in-flight task for the same entry) and then works through the
/// requests in batches, so peak render concurrency never exceeds the batch
/// size regardless of how many pages were added at once.
pub struct ThumbnailPipeline {
    cache: Arc<ThumbnailCache>,
    tasks: TaskRegistry<PageId>,
    runner: BatchRunner,
    target: ThumbnailTarget,
}

impl ThumbnailPipeline {
    /// Create a pipeline rendering into `target`-sized thumbnails.
    pub fn new(batch_size: usize, target: ThumbnailTarget, cache: Arc<ThumbnailCache>) -> Self {
        Self {
            cache,
            tasks: TaskRegistry::new(),
            runner: BatchRunner::new(batch_size),
            target,
        }
    }

    /// Get the render target box.
    pub fn target(&self) -> ThumbnailTarget {
        self.target
    }

    /// Get the batch size.
    pub fn batch_size(&self) -> usize {
        self.runner.batch_size()
    }

    /// Get the shared thumbnail cache.
    pub fn cache(&self) -> &Arc<ThumbnailCache> {
        &self.cache
    }

    /// Get current cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Schedule thumbnail renders for a batch of entries.
    ///
    /// Every request is registered in the pending-task map before this
    /// method returns, so a deletion issued immediately afterwards can
    /// cancel work in batches that have not started yet. Scheduling an
    /// entry that already has a pending task cancels and replaces it.
    ///
    /// Returns a handle that settles when every request has finished or
    /// been cancelled; dropping it detaches the run.
    pub fn schedule(&self, requests: Vec<RenderRequest>, publish: PublishFn) -> BatchHandle {
        let work: Vec<(RenderRequest, CancellationToken)> = requests
            .into_iter()
            .map(|request| {
                let token = self.tasks.begin(request.page_id);
                (request, token)
            })
            .collect();

        let cache = Arc::clone(&self.cache);
        let tasks = self.tasks.clone();
        let target = self.target;

        self.runner.run(work, move |(request, token)| {
            render_one(&cache, &tasks, target, &request, &token, &publish);
        })
    }

    /// Cancel the pending render for one entry. Returns `true` if one was
    /// in flight.
    pub fn cancel(&self, id: &PageId) -> bool {
        self.tasks.cancel(id)
    }

    /// Cancel the pending renders for a set of entries. Returns how many
    /// were in flight.
    pub fn cancel_many(&self, ids: &[PageId]) -> usize {
        self.tasks.cancel_many(ids)
    }

    /// Cancel everything in flight and forget the pending-task map.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.tasks.cancel_all();
        self.tasks.clear();
        cancelled
    }

    /// Get the number of entries with a pending render task.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Check whether any render task is pending.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// Render one entry: cancellation check, cache probe, render, second
/// cancellation check, cache insert and publish.
fn render_one(
    cache: &ThumbnailCache,
    tasks: &TaskRegistry<PageId>,
    target: ThumbnailTarget,
    request: &RenderRequest,
    token: &CancellationToken,
    publish: &PublishFn,
) {
    if token.is_cancelled() {
        log::debug!("skipping cancelled render for entry {}", request.page_id);
        tasks.complete(&request.page_id, token);
        return;
    }

    let key = request.render_key(target).cache_key();

    if let Some(hit) = cache.get(key) {
        log::debug!(
            "thumbnail cache hit for page {} of source {}",
            request.origin_index,
            request.source_id
        );
        publish(
            request.page_id,
            Thumbnail {
                pixels: hit.pixels,
                width: hit.width,
                height: hit.height,
            },
        );
        tasks.complete(&request.page_id, token);
        return;
    }

    match request.source.render_thumbnail(request.origin_index, target) {
        Ok(thumbnail) => {
            // A render that finished after cancellation must neither be
            // cached nor published.
            if token.is_cancelled() {
                log::debug!("dropping cancelled render for entry {}", request.page_id);
            } else {
                cache.put(key, thumbnail.pixels.clone(), thumbnail.width, thumbnail.height);
                publish(request.page_id, thumbnail);
            }
        }
        Err(err) => {
            // The entry keeps its absent thumbnail; siblings are unaffected.
            log::warn!(
                "thumbnail render failed for page {} of source {}: {}",
                request.origin_index,
                request.source_id,
                err
            );
        }
    }

    tasks.complete(&request.page_id, token);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn collecting_publish() -> (PublishFn, Arc<Mutex<HashMap<PageId, Thumbnail>>>) {
        let published = Arc::new(Mutex::new(HashMap::new()));
        let sink = Arc::clone(&published);
        let publish: PublishFn = Arc::new(move |id, thumbnail| {
            sink.lock().unwrap().insert(id, thumbnail);
        });
        (publish, published)
    }

    fn requests_for(source: &Arc<FakeSource>, source_id: SourceId, pages: u16) -> Vec<RenderRequest> {
        (0..pages)
            .map(|origin_index| RenderRequest {
                page_id: PageId::new_v4(),
                source_id,
                origin_index,
                source: Arc::clone(source) as Arc<dyn PageSource>,
            })
            .collect()
    }

    fn pipeline(batch_size: usize) -> ThumbnailPipeline {
        ThumbnailPipeline::new(
            batch_size,
            ThumbnailTarget::DEFAULT,
            Arc::new(ThumbnailCache::default()),
        )
    }

    #[test]
    fn test_render_key_ignores_position() {
        let key_a = RenderKey::new(1, 3, ThumbnailTarget::DEFAULT);
        let key_b = RenderKey::new(1, 3, ThumbnailTarget::DEFAULT);
        assert_eq!(key_a.cache_key(), key_b.cache_key());
    }

    #[test]
    fn test_render_key_varies_with_page_and_size() {
        let base = RenderKey::new(1, 3, ThumbnailTarget::DEFAULT);
        let other_page = RenderKey::new(1, 4, ThumbnailTarget::DEFAULT);
        let other_size = RenderKey::new(1, 3, ThumbnailTarget::new(280, 360));
        let other_source = RenderKey::new(2, 3, ThumbnailTarget::DEFAULT);

        assert_ne!(base.cache_key(), other_page.cache_key());
        assert_ne!(base.cache_key(), other_size.cache_key());
        assert_ne!(base.cache_key(), other_source.cache_key());
    }

    #[test]
    fn test_schedule_publishes_all_thumbnails() {
        let pipeline = pipeline(2);
        let source = Arc::new(FakeSource::new(5));
        let requests = requests_for(&source, 1, 5);
        let ids: Vec<PageId> = requests.iter().map(|r| r.page_id).collect();
        let (publish, published) = collecting_publish();

        pipeline.schedule(requests, publish).wait();

        let published = published.lock().unwrap();
        assert_eq!(published.len(), 5);
        for id in ids {
            assert!(published.contains_key(&id));
        }
        assert_eq!(source.render_count(), 5);
        assert!(!pipeline.has_pending());
    }

    #[test]
    fn test_second_request_served_from_cache() {
        let pipeline = pipeline(5);
        let source = Arc::new(FakeSource::new(1));
        let (publish, published) = collecting_publish();

        pipeline
            .schedule(requests_for(&source, 1, 1), Arc::clone(&publish))
            .wait();
        // Same page identity and size, new entry id
        pipeline.schedule(requests_for(&source, 1, 1), publish).wait();

        // One backend invocation; the second request hit the cache
        assert_eq!(source.render_count(), 1);
        assert_eq!(published.lock().unwrap().len(), 2);
        assert_eq!(pipeline.cache_stats().hits, 1);
    }

    #[test]
    fn test_batch_concurrency_is_bounded() {
        let pipeline = pipeline(5);
        let source = Arc::new(FakeSource::blocked(12));
        let requests = requests_for(&source, 1, 12);
        let (publish, published) = collecting_publish();

        let handle = pipeline.schedule(requests, publish);

        // The first batch fills up and holds; later batches must wait.
        source.wait_until_rendering(5);
        source.release();
        handle.wait();

        assert!(source.peak_concurrency() <= 5);
        assert_eq!(source.render_count(), 12);
        assert_eq!(published.lock().unwrap().len(), 12);
    }

    #[test]
    fn test_cancel_before_start_skips_backend() {
        let pipeline = pipeline(1);
        let source = Arc::new(FakeSource::blocked(2));
        let requests = requests_for(&source, 1, 2);
        let second_id = requests[1].page_id;
        let (publish, published) = collecting_publish();

        let handle = pipeline.schedule(requests, publish);

        // First render is in flight; the second has not started yet.
        source.wait_until_rendering(1);
        assert!(pipeline.cancel(&second_id));
        source.release();
        handle.wait();

        assert_eq!(source.render_count(), 1);
        assert_eq!(published.lock().unwrap().len(), 1);
        assert!(!published.lock().unwrap().contains_key(&second_id));
    }

    #[test]
    fn test_cancel_during_render_drops_result() {
        let pipeline = pipeline(1);
        let source = Arc::new(FakeSource::blocked(1));
        let requests = requests_for(&source, 1, 1);
        let id = requests[0].page_id;
        let (publish, published) = collecting_publish();

        let handle = pipeline.schedule(requests, publish);

        source.wait_until_rendering(1);
        assert!(pipeline.cancel(&id));
        source.release();
        handle.wait();

        // The render ran but its result was neither published nor cached.
        assert_eq!(source.render_count(), 1);
        assert!(published.lock().unwrap().is_empty());
        assert_eq!(pipeline.cache().len(), 0);
        assert!(!pipeline.has_pending());
    }

    #[test]
    fn test_render_failure_leaves_thumbnail_absent() {
        let pipeline = pipeline(5);
        let failing = Arc::new(FakeSource::failing(2));
        let healthy = Arc::new(FakeSource::new(1));

        let mut requests = requests_for(&failing, 1, 2);
        requests.extend(requests_for(&healthy, 2, 1));
        let healthy_id = requests[2].page_id;
        let (publish, published) = collecting_publish();

        pipeline.schedule(requests, publish).wait();

        // Failures are isolated per page; the sibling still publishes.
        let published = published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert!(published.contains_key(&healthy_id));
        assert!(!pipeline.has_pending());
    }

    #[test]
    fn test_reschedule_replaces_pending_task() {
        let pipeline = pipeline(1);
        let source = Arc::new(FakeSource::blocked(1));
        let first = requests_for(&source, 1, 1);
        let page_id = first[0].page_id;
        let (publish, _published) = collecting_publish();

        let first_handle = pipeline.schedule(first, Arc::clone(&publish));
        source.wait_until_rendering(1);

        // Re-adding the same entry id replaces (and cancels) the old task.
        let second = vec![RenderRequest {
            page_id,
            source_id: 1,
            origin_index: 0,
            source: Arc::clone(&source) as Arc<dyn PageSource>,
        }];
        let second_handle = pipeline.schedule(second, publish);

        assert_eq!(pipeline.pending_count(), 1);

        source.release();
        first_handle.wait();
        second_handle.wait();
        assert!(!pipeline.has_pending());
    }

    #[test]
    fn test_cancel_all_clears_pending() {
        let pipeline = pipeline(1);
        let source = Arc::new(FakeSource::blocked(3));
        let requests = requests_for(&source, 1, 3);
        let (publish, _published) = collecting_publish();

        let handle = pipeline.schedule(requests, publish);
        source.wait_until_rendering(1);

        assert_eq!(pipeline.cancel_all(), 3);
        assert!(!pipeline.has_pending());

        source.release();
        handle.wait();
    }
}
