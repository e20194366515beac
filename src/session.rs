//! The shared browser session.
//!
//! One browser process and one page per server process, created lazily by
//! the first tool call that needs them and torn down only at shutdown.

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Live browser state. The page invariant holds by construction: a page
/// exists only alongside the browser it was created from.
struct SessionState {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

/// Process-wide browser session with lazy initialization.
pub struct Session {
    state: Mutex<Option<SessionState>>,
    headless: bool,
}

impl Session {
    /// Create an uninitialized session. No browser process is started.
    pub fn new(headless: bool) -> Self {
        Self {
            state: Mutex::new(None),
            headless,
        }
    }

    /// Whether the browser has been launched.
    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Get the shared page, launching the browser and creating the page on
    /// first use. Every call returns a handle to the same page.
    ///
    /// On launch failure the session stays uninitialized so a later call
    /// can retry; a browser that started but failed to produce a page is
    /// closed before the error is returned.
    pub async fn ensure_page(&self) -> Result<Page> {
        let mut guard = self.state.lock().await;

        if let Some(ref state) = *guard {
            return Ok(state.page.clone());
        }

        info!(headless = self.headless, "launching browser");

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 720)
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(Error::SessionUnavailable)?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| Error::SessionUnavailable(format!("browser launch failed: {e}")))?;

        // Pump CDP events for the lifetime of the browser connection.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    debug!("CDP event loop ended");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "failed to close browser after page creation failure");
                }
                handler_task.abort();
                return Err(Error::SessionUnavailable(format!(
                    "page creation failed: {e}"
                )));
            }
        };

        info!("browser session ready");

        *guard = Some(SessionState {
            browser,
            page: page.clone(),
            handler_task,
        });

        Ok(page)
    }

    /// Tear down the session. Idempotent and best-effort: close failures
    /// are logged, never raised, so shutdown always completes.
    pub async fn close(&self) {
        let mut guard = self.state.lock().await;
        if let Some(mut state) = guard.take() {
            if let Err(e) = state.page.close().await {
                warn!(error = %e, "failed to close page");
            }
            if let Err(e) = state.browser.close().await {
                warn!(error = %e, "failed to close browser");
            }
            state.handler_task.abort();
            info!("browser session closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_uninitialized() {
        let session = Session::new(true);
        assert!(!session.is_initialized().await);
    }

    #[tokio::test]
    async fn close_on_uninitialized_is_noop() {
        let session = Session::new(true);
        session.close().await;
        session.close().await;
        assert!(!session.is_initialized().await);
    }

    #[test]
    fn close_is_callable_from_sync_context() {
        let session = Session::new(true);
        tokio_test::block_on(session.close());
    }
}
