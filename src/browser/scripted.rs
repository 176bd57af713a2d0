//! A browser stand-in that serves canned HTML per URL.
//!
//! Unknown URLs fail to navigate. Every navigation attempt is recorded so
//! tests can count retries.

use super::{BrowserError, Launcher, PageSession};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    pages: Rc<RefCell<HashMap<String, String>>>,
    fail_launch: bool,
    visits: Rc<RefCell<Vec<String>>>,
    closed: Rc<Cell<bool>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.pages
            .borrow_mut()
            .insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    /// Every URL passed to `goto`, in order, including failed attempts.
    pub fn visits(&self) -> Vec<String> {
        self.visits.borrow().clone()
    }

    pub fn visits_to(&self, url: &str) -> usize {
        self.visits.borrow().iter().filter(|v| *v == url).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl Launcher for ScriptedLauncher {
    type Session = ScriptedSession;

    async fn launch(&self) -> Result<ScriptedSession, BrowserError> {
        if self.fail_launch {
            return Err(BrowserError::Launch("no browser in test".to_string()));
        }
        Ok(ScriptedSession {
            script: self.clone(),
            current: None,
        })
    }
}

pub struct ScriptedSession {
    script: ScriptedLauncher,
    current: Option<String>,
}

impl PageSession for ScriptedSession {
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.script.visits.borrow_mut().push(url.to_string());
        match self.script.pages.borrow().get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => {
                self.current = None;
                Err(BrowserError::Timeout {
                    url: url.to_string(),
                    timeout,
                })
            }
        }
    }

    async fn content(&mut self, _timeout: Duration) -> Result<String, BrowserError> {
        self.current
            .clone()
            .ok_or_else(|| BrowserError::Content("no page loaded".to_string()))
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.script.closed.set(true);
        Ok(())
    }
}
