//! Chrome over the DevTools Protocol via `chromiumoxide`.
//!
//! `chromiumoxide` splits a browser into a [`Browser`] handle and a CDP
//! event handler that must be polled for anything to happen; the handler
//! runs on its own tokio task for the life of the session.

use super::{BrowserError, BrowserProfile, Launcher, PageSession};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

/// CDP request timeout; navigation has its own, shorter or longer, bound.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    profile: BrowserProfile,
}

impl ChromeLauncher {
    pub fn new(profile: BrowserProfile) -> Self {
        Self { profile }
    }

    fn config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(REQUEST_TIMEOUT)
            .args(self.profile.launch_args());

        if let BrowserProfile::Managed { executable } = &self.profile {
            builder = builder.chrome_executable(executable).no_sandbox();
        }

        builder.build().map_err(BrowserError::Launch)
    }
}

impl Launcher for ChromeLauncher {
    type Session = ChromeSession;

    #[instrument(level = "info", skip_all, fields(profile = ?self.profile))]
    async fn launch(&self) -> Result<ChromeSession, BrowserError> {
        let config = self.config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let pump = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                pump.abort();
                return Err(BrowserError::Launch(e.to_string()));
            }
        };

        info!("Browser launched");
        Ok(ChromeSession {
            browser,
            page,
            pump,
        })
    }
}

pub struct ChromeSession {
    browser: Browser,
    page: Page,
    pump: JoinHandle<()>,
}

/// Interval between `document.readyState` polls after a navigation commits.
const READY_POLL: Duration = Duration::from_millis(50);

/// `DOMContentLoaded` has fired once the state leaves `"loading"`.
fn dom_parsed(ready_state: &str) -> bool {
    ready_state != "loading"
}

/// Poll `ready_state` until the document is parsed. Unbounded; callers wrap it
/// in a timeout.
async fn wait_for_dom<F, Fut>(mut ready_state: F, interval: Duration) -> Result<(), BrowserError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, BrowserError>>,
{
    loop {
        if dom_parsed(&ready_state().await?) {
            return Ok(());
        }
        sleep(interval).await;
    }
}

/// Run `fut` under `limit`, mapping expiry through `on_timeout`.
async fn within<T, Fut>(
    limit: Duration,
    fut: Fut,
    on_timeout: impl FnOnce() -> BrowserError,
) -> Result<T, BrowserError>
where
    Fut: Future<Output = Result<T, BrowserError>>,
{
    timeout(limit, fut).await.unwrap_or_else(|_| Err(on_timeout()))
}

impl ChromeSession {
    /// `Page.navigate` without chromiumoxide's navigation watcher, which
    /// waits for the full `load` event; then wait for the DOM only.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let nav_err = |reason: String| BrowserError::Navigation {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| nav_err(e.to_string()))?;
        if let Some(reason) = resp.result.error_text.clone() {
            return Err(nav_err(reason));
        }

        let page = &self.page;
        let nav_err = &nav_err;
        wait_for_dom(
            || async move {
                page.evaluate("document.readyState")
                    .await
                    .map_err(|e| nav_err(e.to_string()))?
                    .into_value::<String>()
                    .map_err(|e| nav_err(e.to_string()))
            },
            READY_POLL,
        )
        .await
    }
}

impl PageSession for ChromeSession {
    #[instrument(level = "info", skip(self, limit), fields(timeout_secs = limit.as_secs()))]
    async fn goto(&mut self, url: &str, limit: Duration) -> Result<(), BrowserError> {
        let t0 = Instant::now();
        within(limit, self.navigate(url), || BrowserError::Timeout {
            url: url.to_string(),
            timeout: limit,
        })
        .await?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "DOM content loaded");
        Ok(())
    }

    async fn content(&mut self, limit: Duration) -> Result<String, BrowserError> {
        let read = async {
            self.page
                .content()
                .await
                .map_err(|e| BrowserError::Content(e.to_string()))
        };
        within(limit, read, || {
            BrowserError::Content(format!("timed out after {}s", limit.as_secs()))
        })
        .await
    }

    async fn close(mut self) -> Result<(), BrowserError> {
        let result = match self.browser.close().await {
            Ok(_) => {
                if let Err(e) = self.browser.wait().await {
                    warn!(error = %e, "Browser process did not exit cleanly");
                }
                info!("Browser closed");
                Ok(())
            }
            Err(e) => Err(BrowserError::Close(e.to_string())),
        };
        self.pump.abort();
        result
    }
}
