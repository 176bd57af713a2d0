//! Headless browser access.
//!
//! The run needs exactly four things from a browser: launch it, navigate a
//! page with a timeout, read the loaded DOM back as HTML, and shut it down.
//! [`Launcher`] and [`PageSession`] capture that; [`chrome`] implements
//! them over the Chrome DevTools Protocol.
//!
//! # Profiles
//!
//! | Profile | Executable | Launch arguments |
//! |---------|------------|------------------|
//! | [`BrowserProfile::Local`] | auto-detected Chrome/Chromium | defaults |
//! | [`BrowserProfile::Managed`] | supplied path | sandbox-free, single process |

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod chrome;

#[cfg(test)]
pub mod scripted;

pub use chrome::ChromeLauncher;

/// Flags for constrained serverless sandboxes (no `/dev/shm`, no zygote, no GPU).
pub const MANAGED_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-setuid-sandbox",
    "--no-first-run",
    "--no-zygote",
    "--single-process",
    "--hide-scrollbars",
    "--mute-audio",
];

/// Applied in both profiles.
pub const COMMON_ARGS: &[&str] = &["--ignore-certificate-errors"];

/// How the browser is launched; chosen once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserProfile {
    /// Developer machine: whatever Chrome is installed.
    Local,
    /// Serverless runtime: a bundled binary with constrained arguments.
    Managed { executable: PathBuf },
}

impl BrowserProfile {
    /// Extra command-line arguments for this profile.
    pub fn launch_args(&self) -> Vec<&'static str> {
        let mut args = COMMON_ARGS.to_vec();
        if let BrowserProfile::Managed { .. } = self {
            args.extend_from_slice(MANAGED_ARGS);
        }
        args
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("could not read page content: {0}")]
    Content(String),

    #[error("browser shutdown failed: {0}")]
    Close(String),
}

/// A single open page.
pub trait PageSession {
    /// Navigate and wait until the DOM is parsed (`DOMContentLoaded`), failing
    /// after `timeout`. Subresources may still be loading.
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Serialized DOM of the current page, failing after `timeout`.
    async fn content(&mut self, timeout: Duration) -> Result<String, BrowserError>;

    /// Close the page and the browser behind it.
    async fn close(self) -> Result<(), BrowserError>;
}

pub trait Launcher {
    type Session: PageSession;

    async fn launch(&self) -> Result<Self::Session, BrowserError>;
}
