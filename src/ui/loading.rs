use std::sync::atomic::{AtomicUsize, Ordering};

/// Busy overlay state. Nested `show` calls need matching `hide` calls.
#[derive(Debug, Default)]
pub struct LoadingIndicator {
    depth: AtomicUsize,
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&self) {
        self.depth.fetch_add(1, Ordering::SeqCst);
    }

    pub fn hide(&self) {
        let _ = self
            .depth
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1)));
    }

    pub fn is_visible(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }
}
