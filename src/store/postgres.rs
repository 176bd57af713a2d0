//! Postgres backend for the `"Article"` table.
//!
//! The table is owned by another application; this job only deletes its own
//! rows (by `resource`), probes slugs, and inserts. There is no unique
//! constraint on `slug`: uniqueness comes from the probe-then-insert loop in
//! [`crate::slug`].

use super::{ArticleStore, StoreError};
use crate::models::Article;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info, instrument};

const DELETE_BY_RESOURCE: &str = r#"DELETE FROM "Article" WHERE resource = $1"#;

const SLUG_EXISTS: &str = r#"SELECT 1 FROM "Article" WHERE slug = $1"#;

// The date parameter is either a full ISO timestamp or a bare date.
const INSERT_ARTICLE: &str = r#"INSERT INTO "Article" (id, slug, headline, summary, body, author, resource, media, link, date)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::timestamptz)"#;

pub struct PgArticleStore {
    conn: PgConnection,
}

impl PgArticleStore {
    /// Open a single connection from a `postgres://` connection string.
    #[instrument(level = "info", skip_all)]
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let conn = PgConnection::connect(database_url).await?;
        info!("Connected to the database");
        Ok(Self { conn })
    }
}

impl ArticleStore for PgArticleStore {
    async fn delete_by_resource(&mut self, resource: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(DELETE_BY_RESOURCE)
            .bind(resource)
            .execute(&mut self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    async fn slug_exists(&mut self, slug: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(SLUG_EXISTS)
            .bind(slug)
            .fetch_optional(&mut self.conn)
            .await?;
        Ok(row.is_some())
    }

    async fn insert_article(&mut self, article: &Article) -> Result<(), StoreError> {
        let result = sqlx::query(INSERT_ARTICLE)
            .bind(&article.id)
            .bind(&article.slug)
            .bind(&article.headline)
            .bind(&article.summary)
            .bind(&article.body)
            .bind(&article.author)
            .bind(&article.resource)
            .bind(&article.media)
            .bind(&article.link)
            .bind(&article.date)
            .execute(&mut self.conn)
            .await?;

        match result.rows_affected() {
            1 => {
                debug!(slug = %article.slug, "Inserted article row");
                Ok(())
            }
            n => Err(StoreError::Rejected(format!(
                "insert of {} affected {n} rows",
                article.slug
            ))),
        }
    }

    async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await?;
        Ok(())
    }
}
