//! Persistence for ingested articles.
//!
//! The run talks to storage only through [`ArticleStore`], which owns a
//! single connection for the lifetime of the run.
//!
//! # Backends
//!
//! - [`postgres`]: the `"Article"` table over one `sqlx::PgConnection`
//! - `memory`: an in-process table used by the test suite

use crate::models::Article;
use thiserror::Error;

pub mod postgres;

#[cfg(test)]
pub mod memory;

pub use postgres::PgArticleStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("statement rejected: {0}")]
    Rejected(String),
}

/// Operations the ingest run needs from the article table.
pub trait ArticleStore {
    /// Delete every row tagged with `resource`; returns the number removed.
    async fn delete_by_resource(&mut self, resource: &str) -> Result<u64, StoreError>;

    /// Whether any row already uses `slug`.
    async fn slug_exists(&mut self, slug: &str) -> Result<bool, StoreError>;

    async fn insert_article(&mut self, article: &Article) -> Result<(), StoreError>;

    /// Release the connection.
    async fn close(self) -> Result<(), StoreError>;
}
