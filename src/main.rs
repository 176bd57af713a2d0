//! # Headline Ingest
//!
//! Scrapes the Democracy Now! headlines page with a headless browser, visits
//! each linked article, and replaces this source's rows in the `"Article"`
//! table with freshly extracted ones.
//!
//! ## Usage
//!
//! ```sh
//! POSTGRES_CONNECTION_STRING_DEV=postgres://localhost/news headline_ingest
//! ```
//!
//! The binary is a local runner for [`handler::handler`]: it builds a sample
//! event, invokes the handler once, prints the response as JSON, and exits
//! non-zero when the response is a failure.
//!
//! ## Run
//!
//! 1. **Clear**: delete every row tagged `Democracy Now!`
//! 2. **List**: load the headlines page and collect `{headline, link, date}`
//! 3. **Visit**: for each item, reserve a slug, then load, extract and insert
//!    (3 immediate attempts)
//! 4. **Report**: 200 with the listing items, or 500 with an error message

use clap::Parser;
use serde_json::json;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cli;
mod extract;
mod handler;
mod ingest;
mod models;
mod slug;
mod store;
mod utils;

use cli::Cli;
use handler::{Context, handler};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; the environment may already be populated.
    let dotenv = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let start_time = Instant::now();
    let config = Cli::parse().into_config();
    info!(
        profile = ?config.profile,
        max_attempts = config.retry.max_attempts,
        "headline_ingest starting up"
    );

    let event = json!({ "url": extract::LISTING_URL });
    let context = Context::new();
    let response = handler(event, &context, &config).await;

    let elapsed = start_time.elapsed();
    info!(
        status = response.status_code,
        request_id = %context.request_id,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    match serde_json::to_string_pretty(&response) {
        Ok(out) => println!("{out}"),
        Err(e) => error!(error = %e, "Failed to print handler result"),
    }

    if response.status_code == 200 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
