//! Browser session management
//!
//! Owns the lifecycle of the single headless Chrome process shared by all
//! jobs. Page contexts are handed out through a bounded checkout/checkin
//! protocol: one handle maps to one job at a time, and dropping the handle
//! returns its slot to the pool and destroys the page context.

use crate::config::{create_browser_config, CaptureOptions};
use crate::error::CaptureError;
use chromiumoxide::browser::Browser;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// A checked-out page context
///
/// Holds the pool slot for as long as the handle is alive. Dropping the
/// handle closes the page and frees the slot, so a job can never leak its
/// context past its own lifetime.
pub struct PageHandle {
    pub page: Page,
    _permit: OwnedSemaphorePermit,
}

impl PageHandle {
    fn new(page: Page, permit: OwnedSemaphorePermit) -> Self {
        Self {
            page,
            _permit: permit,
        }
    }
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        let page = self.page.clone();
        tokio::spawn(async move {
            if let Err(e) = page.close().await {
                debug!("Page close on checkin failed: {}", e);
            }
        });
    }
}

/// Bounded pool of page contexts over one shared Chrome process
pub struct BrowserPool {
    browser: Arc<Mutex<Browser>>,
    handler: Mutex<Option<tokio::task::JoinHandle<()>>>,
    semaphore: Arc<Semaphore>,
    pool_size: usize,
    is_shutting_down: AtomicBool,
}

impl BrowserPool {
    /// Launch the browser engine and prepare `pool_size` context slots.
    ///
    /// A launch failure is fatal for the whole run: no job can proceed
    /// without the engine.
    pub async fn launch(options: &CaptureOptions) -> Result<Self, CaptureError> {
        let browser_config = create_browser_config(options)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| CaptureError::EngineUnavailable(e.to_string()))?;

        // The handler drives Chrome DevTools Protocol traffic and must be
        // polled for the lifetime of the browser.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    error!("CDP handler error: {}", e);
                    break;
                }
            }
            debug!("CDP handler stream ended");
        });

        info!(
            "Browser engine launched, pool size {}",
            options.pool_size
        );

        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler: Mutex::new(Some(handler_task)),
            semaphore: Arc::new(Semaphore::new(options.pool_size)),
            pool_size: options.pool_size,
            is_shutting_down: AtomicBool::new(false),
        })
    }

    /// Check out a fresh page context, waiting for a free slot.
    pub async fn acquire(&self) -> Result<PageHandle, CaptureError> {
        if self.is_shutting_down.load(Ordering::Relaxed) {
            return Err(CaptureError::EngineUnavailable(
                "pool is shutting down".to_string(),
            ));
        }

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CaptureError::EngineUnavailable("pool closed".to_string()))?;

        let browser = self.browser.lock().await;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::EngineUnavailable(e.to_string()))?;

        Ok(PageHandle::new(page, permit))
    }

    /// Tear down all contexts and the browser process.
    ///
    /// Idempotent: the first call wins, later calls return immediately. Waits
    /// briefly for checked-out handles to come back so in-flight jobs can
    /// settle before the process dies.
    pub async fn shutdown(&self) {
        if self.is_shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Shutting down browser pool...");

        // Give in-flight jobs a grace period to release their handles.
        let mut retries = 0;
        while retries < 50 {
            if self.semaphore.available_permits() == self.pool_size {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            retries += 1;
        }

        if self.semaphore.available_permits() != self.pool_size {
            warn!("Shutting down with jobs still in flight");
        }

        {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Browser wait after close: {}", e);
            }
        }

        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }

        info!("Browser pool shutdown complete");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Relaxed)
    }

    pub fn available_contexts(&self) -> usize {
        self.semaphore.available_permits()
    }
}
