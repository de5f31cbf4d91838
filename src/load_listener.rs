// src/load_listener.rs
//! Polling-based texture load detection.
//!
//! Asset sources don't reliably expose a load event, so a repeating task
//! polls the texture's intrinsic dimensions on a fixed interval and fires a
//! callback exactly once when they become non-zero. There is no timeout: a
//! source that never loads keeps the watcher polling until it is cancelled
//! or dropped with the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::RwLock;

use crate::texture::ProjectionTexture;

/// Fixed polling cadence, roughly one display frame.
pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Handle to a running load poll. Cancelling stops the poll without firing
/// the callback; a watcher returned for an already-loaded texture is inert.
#[derive(Debug)]
pub struct LoadWatcher {
    cancelled: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl LoadWatcher {
    /// Stop the poll. The callback will not fire after this, though a
    /// firing already in flight may complete.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the poll task is still running.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

/// Run `on_loaded` once the texture's intrinsic dimensions become non-zero.
///
/// If the texture is already loaded this returns immediately with an inert
/// watcher and the callback is never invoked; the caller handles the
/// already-loaded path itself.
pub fn watch_texture_load<F>(texture: Arc<RwLock<ProjectionTexture>>, on_loaded: F) -> LoadWatcher
where
    F: FnOnce() + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));

    // already loaded, nothing to wait for
    if texture.read().is_loaded() {
        return LoadWatcher {
            cancelled,
            handle: None,
        };
    }

    let flag = Arc::clone(&cancelled);
    let handle = thread::spawn(move || loop {
        if flag.load(Ordering::Relaxed) {
            log::trace!("texture load watcher cancelled");
            return;
        }
        if texture.read().is_loaded() {
            on_loaded();
            return;
        }
        thread::sleep(POLL_INTERVAL);
    });

    LoadWatcher {
        cancelled,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    #[test]
    fn test_already_loaded_short_circuits_without_callback() {
        init_logs();
        let texture = Arc::new(RwLock::new(ProjectionTexture::image(64, 64)));
        let fired = Arc::new(AtomicBool::new(false));
        let fired_in_cb = Arc::clone(&fired);

        let watcher = watch_texture_load(texture, move || {
            fired_in_cb.store(true, Ordering::Relaxed);
        });

        assert!(!watcher.is_active());
        thread::sleep(Duration::from_millis(50));
        assert!(!fired.load(Ordering::Relaxed));
    }

    #[test]
    fn test_detects_late_load_exactly_once() {
        init_logs();
        let texture = Arc::new(RwLock::new(ProjectionTexture::video(0, 0)));
        let fired = Arc::new(AtomicBool::new(false));
        let fired_in_cb = Arc::clone(&fired);

        let watcher = watch_texture_load(Arc::clone(&texture), move || {
            fired_in_cb.store(true, Ordering::Relaxed);
        });
        assert!(watcher.is_active());
        assert!(!fired.load(Ordering::Relaxed));

        texture.write().mark_loaded(1280, 720);
        assert!(wait_until(Duration::from_secs(2), || fired
            .load(Ordering::Relaxed)));
        assert!(wait_until(Duration::from_secs(2), || !watcher.is_active()));
    }

    #[test]
    fn test_cancel_suppresses_callback() {
        init_logs();
        let texture = Arc::new(RwLock::new(ProjectionTexture::video(0, 0)));
        let fired = Arc::new(AtomicBool::new(false));
        let fired_in_cb = Arc::clone(&fired);

        let watcher = watch_texture_load(Arc::clone(&texture), move || {
            fired_in_cb.store(true, Ordering::Relaxed);
        });
        watcher.cancel();
        assert!(wait_until(Duration::from_secs(2), || !watcher.is_active()));

        texture.write().mark_loaded(1280, 720);
        thread::sleep(Duration::from_millis(60));
        assert!(!fired.load(Ordering::Relaxed));
    }
}
