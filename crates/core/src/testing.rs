//! Instrumented page source for tests
//!
//! A fake render backend with counters for backend invocations and
//! concurrency, an optional gate that holds renders open until released,
//! and a failure mode. Lets tests observe scheduling behavior without
//! a real PDF backend.

use pdf_binder_render::{PageSource, PdfError, PdfResult, Thumbnail, ThumbnailTarget};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

pub struct FakeSource {
    pages: u16,
    blocked: AtomicBool,
    fail_all: bool,
    renders: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeSource {
    /// A source whose renders complete immediately.
    pub fn new(pages: u16) -> Self {
        Self {
            pages,
            blocked: AtomicBool::new(false),
            fail_all: false,
            renders: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// A source whose renders block until [`release`](Self::release).
    pub fn blocked(pages: u16) -> Self {
        let source = Self::new(pages);
        source.blocked.store(true, Ordering::SeqCst);
        source
    }

    /// A source whose renders all fail.
    pub fn failing(pages: u16) -> Self {
        let mut source = Self::new(pages);
        source.fail_all = true;
        source
    }

    /// Let blocked renders finish.
    pub fn release(&self) {
        self.blocked.store(false, Ordering::SeqCst);
    }

    /// Total number of backend invocations so far.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// Highest number of renders observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Spin until at least `n` renders are in flight (2s timeout).
    pub fn wait_until_rendering(&self, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.in_flight.load(Ordering::SeqCst) < n {
            if Instant::now() > deadline {
                panic!(
                    "timed out waiting for {} in-flight renders (saw {})",
                    n,
                    self.in_flight.load(Ordering::SeqCst)
                );
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

impl PageSource for FakeSource {
    fn page_count(&self) -> u16 {
        self.pages
    }

    fn render_thumbnail(&self, page_index: u16, target: ThumbnailTarget) -> PdfResult<Thumbnail> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        while self.blocked.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all {
            return Err(PdfError::RenderError("synthetic render failure".to_string()));
        }

        Ok(Thumbnail {
            pixels: vec![page_index as u8; 64],
            width: target.width,
            height: target.height,
        })
    }
}
