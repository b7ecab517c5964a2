//! Session-scoped access to the shared browser driver handle.
//!
//! The underlying handle is lazily created and shared process-wide, but
//! callers never touch it directly: a task acquires a [`DriverSession`] from
//! the [`DriverPool`], which liveness-checks the handle and transparently
//! relaunches a dead one. The session is released when the task drops it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::driver::BrowserDriver;
use crate::error::Result;

/// Launches new driver instances when the shared handle is missing or dead.
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>>;
}

/// Owner of the shared, lazily-created driver handle.
pub struct DriverPool {
    launcher: Box<dyn DriverLauncher>,
    slot: Mutex<Option<Arc<dyn BrowserDriver>>>,
}

impl std::fmt::Debug for DriverPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverPool").finish_non_exhaustive()
    }
}

impl DriverPool {
    pub fn new(launcher: Box<dyn DriverLauncher>) -> Self {
        Self {
            launcher,
            slot: Mutex::new(None),
        }
    }

    /// Acquire a session for one task.
    ///
    /// Checks liveness of the shared handle and relaunches if the previous
    /// instance died, so callers never observe a stale handle.
    pub async fn acquire(&self) -> Result<DriverSession> {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|d| !d.is_connected()) {
            tracing::warn!("browser driver handle is stale, relaunching");
            *slot = None;
        }
        if let Some(driver) = slot.as_ref() {
            return Ok(DriverSession {
                driver: Arc::clone(driver),
            });
        }
        let driver = self.launcher.launch().await?;
        *slot = Some(Arc::clone(&driver));
        Ok(DriverSession { driver })
    }
}

/// An owning, task-scoped handle to the browser driver.
///
/// Dropping the session releases it; the pool keeps the underlying handle for
/// the next acquisition.
pub struct DriverSession {
    driver: Arc<dyn BrowserDriver>,
}

impl DriverSession {
    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{ActionOutcome, ScrollDirection, Snapshot, Viewport};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeDriver {
        connected: AtomicBool,
    }

    impl FakeDriver {
        fn new() -> Self {
            Self {
                connected: AtomicBool::new(true),
            }
        }
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        fn viewport(&self) -> Viewport {
            Viewport {
                width: 1000,
                height: 800,
            }
        }

        async fn navigate(&self, url: &str) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("navigated", url))
        }

        async fn click_at(&self, _x: u32, _y: u32) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("clicked", "about:blank"))
        }

        async fn type_text_at(
            &self,
            _x: u32,
            _y: u32,
            _text: &str,
            _press_enter: bool,
            _clear_before_typing: bool,
        ) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("typed", "about:blank"))
        }

        async fn scroll_document(
            &self,
            _direction: ScrollDirection,
            _amount: u32,
        ) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("scrolled", "about:blank"))
        }

        async fn drag_and_drop(
            &self,
            _x: u32,
            _y: u32,
            _dest_x: u32,
            _dest_y: u32,
        ) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("dragged", "about:blank"))
        }

        async fn page_down(&self) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("paged", "about:blank"))
        }

        async fn page_up(&self) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("paged", "about:blank"))
        }

        async fn key_combination(&self, _keys: &str) -> Result<ActionOutcome> {
            Ok(ActionOutcome::ok("keys", "about:blank"))
        }

        async fn snapshot(&self) -> Result<Snapshot> {
            Ok(Snapshot {
                url: "about:blank".to_string(),
                screenshot: None,
                structure: String::new(),
                viewport: self.viewport(),
            })
        }
    }

    struct CountingLauncher {
        launches: AtomicUsize,
        last: Mutex<Option<Arc<FakeDriver>>>,
    }

    impl CountingLauncher {
        fn new() -> Self {
            Self {
                launches: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl DriverLauncher for CountingLauncher {
        async fn launch(&self) -> Result<Arc<dyn BrowserDriver>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            let driver = Arc::new(FakeDriver::new());
            *self.last.lock().await = Some(Arc::clone(&driver));
            Ok(driver)
        }
    }

    #[tokio::test]
    async fn test_lazy_launch_on_first_acquire() {
        let launcher = Arc::new(CountingLauncher::new());
        let pool = DriverPool::new(Box::new(SharedLauncher(Arc::clone(&launcher))));
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);

        let session = pool.acquire().await.unwrap();
        assert!(session.driver().is_connected());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_live_handle_is_reused_across_sessions() {
        let launcher = Arc::new(CountingLauncher::new());
        let pool = DriverPool::new(Box::new(SharedLauncher(Arc::clone(&launcher))));

        let first = pool.acquire().await.unwrap();
        drop(first);
        let _second = pool.acquire().await.unwrap();
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dead_handle_is_relaunched() {
        let launcher = Arc::new(CountingLauncher::new());
        let pool = DriverPool::new(Box::new(SharedLauncher(Arc::clone(&launcher))));

        let session = pool.acquire().await.unwrap();
        drop(session);

        // Kill the launched instance behind the pool's back.
        if let Some(driver) = launcher.last.lock().await.as_ref() {
            driver.connected.store(false, Ordering::SeqCst);
        }

        let session = pool.acquire().await.unwrap();
        assert!(session.driver().is_connected());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 2);
    }

    struct SharedLauncher(Arc<CountingLauncher>);

    #[async_trait]
    impl DriverLauncher for SharedLauncher {
        async fn launch(&self) -> Result<Arc<dyn BrowserDriver>> {
            self.0.launch().await
        }
    }
}
