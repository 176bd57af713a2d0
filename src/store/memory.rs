//! In-process article table for tests.
//!
//! Clones share the same rows, so a test can hand one clone to the run and
//! inspect the other after the run has consumed and closed its copy.

use super::{ArticleStore, StoreError};
use crate::models::Article;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Rc<RefCell<Vec<Article>>>,
    closed: Rc<Cell<bool>>,
    failing_inserts: Rc<Cell<usize>>,
}

impl MemoryStore {
    pub fn with_rows(rows: Vec<Article>) -> Self {
        let store = Self::default();
        *store.rows.borrow_mut() = rows;
        store
    }

    /// Make the next `n` inserts fail.
    pub fn fail_next_inserts(&self, n: usize) {
        self.failing_inserts.set(n);
    }

    pub fn rows(&self) -> Vec<Article> {
        self.rows.borrow().clone()
    }

    pub fn slugs(&self) -> Vec<String> {
        self.rows.borrow().iter().map(|a| a.slug.clone()).collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl ArticleStore for MemoryStore {
    async fn delete_by_resource(&mut self, resource: &str) -> Result<u64, StoreError> {
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|a| a.resource != resource);
        Ok((before - rows.len()) as u64)
    }

    async fn slug_exists(&mut self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.rows.borrow().iter().any(|a| a.slug == slug))
    }

    async fn insert_article(&mut self, article: &Article) -> Result<(), StoreError> {
        let pending = self.failing_inserts.get();
        if pending > 0 {
            self.failing_inserts.set(pending - 1);
            return Err(StoreError::Rejected("injected insert failure".to_string()));
        }
        self.rows.borrow_mut().push(article.clone());
        Ok(())
    }

    async fn close(self) -> Result<(), StoreError> {
        self.closed.set(true);
        Ok(())
    }
}
