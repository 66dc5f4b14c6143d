//! Scoped browser session acquisition.
//!
//! At most one browser runs at a time. [`SessionManager::acquire`] hands out a
//! [`SessionLease`] that holds the session lock for the duration of a tool
//! call; concurrent calls wait on that lock. A lease must be given back with
//! [`SessionLease::release`]. If it is dropped instead (early return, panic)
//! the browser process is killed on the spot.

use rapidapi_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::{BrowserLauncher, PageDriver};

/// Profile name for the single marketplace session.
const SESSION_NAME: &str = "marketplace";

#[derive(Default)]
struct SessionSlot {
    /// Parked browser, present only between calls when reuse is enabled.
    driver: Option<Box<dyn PageDriver>>,
    /// Bumped on every acquire/park; idle reapers compare against it.
    generation: u64,
}

pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    slot: Arc<Mutex<SessionSlot>>,
    idle_timeout: Option<Duration>,
}

impl SessionManager {
    /// `idle_timeout` of `None` closes the browser after every call.
    pub fn new(launcher: Arc<dyn BrowserLauncher>, idle_timeout: Option<Duration>) -> Self {
        Self {
            launcher,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
            idle_timeout,
        }
    }

    /// Wait for the session lock, then reuse the parked browser or launch one.
    pub async fn acquire(&self) -> Result<SessionLease> {
        let mut guard = self.slot.clone().lock_owned().await;
        guard.generation += 1;

        let driver = match guard.driver.take() {
            Some(driver) => {
                debug!("Reusing parked browser session");
                driver
            }
            None => self.launcher.launch(SESSION_NAME).await?,
        };

        Ok(SessionLease {
            guard: Some(guard),
            driver: Some(driver),
            slot: self.slot.clone(),
            idle_timeout: self.idle_timeout,
        })
    }

    /// Close any parked browser. Waits for an in-flight call to finish first.
    pub async fn close_all(&self) {
        let mut guard = self.slot.lock().await;
        guard.generation += 1;
        if let Some(mut driver) = guard.driver.take() {
            driver.close().await;
            info!("Browser session closed on shutdown");
        }
    }

    pub async fn has_parked_session(&self) -> bool {
        self.slot.lock().await.driver.is_some()
    }
}

/// Exclusive use of the browser for one tool call.
pub struct SessionLease {
    guard: Option<OwnedMutexGuard<SessionSlot>>,
    driver: Option<Box<dyn PageDriver>>,
    slot: Arc<Mutex<SessionSlot>>,
    idle_timeout: Option<Duration>,
}

impl SessionLease {
    pub fn driver(&mut self) -> Result<&mut (dyn PageDriver + 'static)> {
        self.driver
            .as_deref_mut()
            .ok_or_else(|| Error::Browser("browser session already released".to_string()))
    }

    /// Give the browser back. A healthy session is parked for reuse when an
    /// idle timeout is configured; otherwise, and after any failure, the
    /// browser is closed.
    pub async fn release(mut self, healthy: bool) {
        let Some(mut driver) = self.driver.take() else {
            return;
        };
        let Some(mut guard) = self.guard.take() else {
            driver.close().await;
            return;
        };

        match self.idle_timeout.filter(|_| healthy) {
            Some(idle) => {
                guard.generation += 1;
                let generation = guard.generation;
                guard.driver = Some(driver);
                drop(guard);
                debug!(idle_secs = idle.as_secs(), "Browser session parked");
                spawn_idle_reaper(self.slot.clone(), generation, idle);
            }
            None => {
                driver.close().await;
                drop(guard);
                if !healthy {
                    debug!("Browser session torn down after failed call");
                }
            }
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            warn!("Browser session lease dropped without release; killing browser");
            driver.kill();
        }
    }
}

fn spawn_idle_reaper(slot: Arc<Mutex<SessionSlot>>, generation: u64, idle: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(idle).await;
        let mut guard = slot.lock().await;
        if guard.generation != generation {
            return;
        }
        if let Some(mut driver) = guard.driver.take() {
            info!(idle_secs = idle.as_secs(), "Closing idle browser session");
            driver.close().await;
        }
    });
}
