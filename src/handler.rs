//! Serverless-style entry point.
//!
//! [`handler`] takes an event/context pair like a function-as-a-service
//! invocation and always returns a [`HandlerResponse`]: 200 with the listing
//! candidates, or 500 with an error message. The event payload is ignored.

use crate::browser::{ChromeLauncher, Launcher};
use crate::cli::Config;
use crate::ingest::{IngestError, RetryPolicy, run};
use crate::models::{HandlerResponse, ListingItem, SuccessBody};
use crate::store::{ArticleStore, PgArticleStore, StoreError};
use serde_json::Value;
use std::future::Future;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub const SUCCESS_MESSAGE: &str = "Scraping completed successfully";

/// Per-invocation metadata.
#[derive(Debug, Clone)]
pub struct Context {
    pub request_id: String,
}

impl Context {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one ingest against Postgres and Chrome as described by `config`.
#[instrument(level = "info", skip_all, fields(request_id = %context.request_id))]
pub async fn handler(_event: Value, context: &Context, config: &Config) -> HandlerResponse {
    let launcher = ChromeLauncher::new(config.profile.clone());
    execute(
        PgArticleStore::connect(&config.database_url),
        &launcher,
        &config.retry,
    )
    .await
}

/// Connect, run, and always close the store, whatever the outcome.
pub async fn execute<S, C, L>(connect: C, launcher: &L, policy: &RetryPolicy) -> HandlerResponse
where
    S: ArticleStore,
    C: Future<Output = Result<S, StoreError>>,
    L: Launcher,
{
    info!("Connecting to the database...");
    let mut store = match connect.await {
        Ok(store) => store,
        Err(e) => {
            let err = IngestError::Connect(e);
            error!(error = %err, "Aborting run");
            return failure(&err);
        }
    };

    let outcome = run(&mut store, launcher, policy).await;

    match store.close().await {
        Ok(()) => info!("Database connection closed"),
        Err(e) => warn!(error = %e, "Failed to close database connection"),
    }

    match outcome {
        Ok(articles) => success(articles),
        Err(e) => {
            error!(error = %e, "Scraping failed");
            failure(&e)
        }
    }
}

fn success(articles: Vec<ListingItem>) -> HandlerResponse {
    let body = SuccessBody {
        message: SUCCESS_MESSAGE.to_string(),
        articles,
    };
    match serde_json::to_string(&body) {
        Ok(body) => HandlerResponse {
            status_code: 200,
            body,
        },
        Err(e) => {
            error!(error = %e, "Failed to encode response body");
            HandlerResponse {
                status_code: 500,
                body: Value::String(e.to_string()).to_string(),
            }
        }
    }
}

fn failure(err: &IngestError) -> HandlerResponse {
    HandlerResponse {
        status_code: 500,
        body: Value::String(err.to_string()).to_string(),
    }
}
