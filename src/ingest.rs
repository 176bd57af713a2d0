//! The ingest run: clear, list, visit, extract, insert.
//!
//! ```text
//! delete rows for RESOURCE
//!   └─ launch browser
//!        └─ load listing (60s) ── fail ──> ListingUnavailable
//!             └─ for each candidate, in listing order:
//!                  reserve slug
//!                  up to N attempts: load article (10s) → extract → insert
//!        └─ close browser
//! ```
//!
//! Article failures never abort the run; store failures outside an attempt do.

use crate::browser::{BrowserError, Launcher, PageSession};
use crate::extract::{
    LISTING_URL, article_date, article_media, article_paragraphs, extract_with_fallback,
    parse_listing,
};
use crate::models::{AUTHOR_PLACEHOLDER, Article, DEFAULT_MEDIA, ListingItem, RESOURCE};
use crate::slug::{MAX_SUFFIX, SlugError, ensure_unique_slug};
use crate::store::{ArticleStore, StoreError};
use crate::utils::{build_body, paragraphs_to_html, summarize, today_iso, truncate_for_log};
use scraper::Html;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub const LISTING_TIMEOUT: Duration = Duration::from_secs(60);
pub const ARTICLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run-level failures. Each maps to a 500 response.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("database connection failed: {0}")]
    Connect(StoreError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("browser unavailable: {0}")]
    Browser(#[from] BrowserError),

    #[error("failed to load headlines page: {0}")]
    ListingUnavailable(BrowserError),
}

/// Why a single attempt at an article failed; these are retried.
#[derive(Debug, Error)]
enum AttemptError {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Immediate retries, no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// What happened to one listing candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateOutcome {
    Inserted { slug: String },
    /// Every attempt failed; nothing was written under `slug`.
    Failed { slug: String, attempts: u32 },
    /// Missing headline or link, or no free slug.
    Skipped,
}

/// Replace this source's rows with a fresh scrape.
///
/// Returns every candidate found on the listing page, whether or not it
/// was inserted.
#[instrument(level = "info", skip_all, fields(max_attempts = policy.max_attempts))]
pub async fn run<S, L>(
    store: &mut S,
    launcher: &L,
    policy: &RetryPolicy,
) -> Result<Vec<ListingItem>, IngestError>
where
    S: ArticleStore,
    L: Launcher,
{
    let deleted = store.delete_by_resource(RESOURCE).await?;
    info!(deleted, resource = RESOURCE, "Cleared existing articles");

    let mut session = launcher.launch().await?;
    let result = scrape(store, &mut session, policy).await;

    if let Err(e) = session.close().await {
        warn!(error = %e, "Failed to close browser");
    }
    result
}

async fn scrape<S, P>(
    store: &mut S,
    session: &mut P,
    policy: &RetryPolicy,
) -> Result<Vec<ListingItem>, IngestError>
where
    S: ArticleStore,
    P: PageSession,
{
    info!(url = LISTING_URL, "Navigating to headlines page");
    let listing_html = match load(session, LISTING_URL, LISTING_TIMEOUT).await {
        Ok(html) => html,
        Err(e) => {
            error!(url = LISTING_URL, error = %e, "Failed to load headlines page");
            return Err(IngestError::ListingUnavailable(e));
        }
    };

    let candidates = parse_listing(&listing_html);
    info!(count = candidates.len(), "Collected headlines and links");
    debug!(candidates = ?candidates, "Listing candidates");

    let (mut inserted, mut failed, mut skipped) = (0usize, 0usize, 0usize);
    for (index, candidate) in candidates.iter().enumerate() {
        match ingest_candidate(store, session, candidate, policy).await? {
            CandidateOutcome::Inserted { slug } => {
                debug!(index, %slug, "Candidate inserted");
                inserted += 1
            }
            CandidateOutcome::Failed { slug, attempts } => {
                debug!(index, %slug, attempts, "Candidate failed");
                failed += 1
            }
            CandidateOutcome::Skipped => {
                debug!(index, "Candidate skipped");
                skipped += 1
            }
        }
    }

    info!(
        total = candidates.len(),
        inserted, failed, skipped, "Finished processing headlines"
    );
    Ok(candidates)
}

/// Navigate and read back the page HTML; both steps share `limit` each.
async fn load<P: PageSession>(
    session: &mut P,
    url: &str,
    limit: Duration,
) -> Result<String, BrowserError> {
    session.goto(url, limit).await?;
    let html = session.content(limit).await?;
    debug!(%url, bytes = html.len(), preview = %truncate_for_log(&html, 200), "Page content");
    Ok(html)
}

#[instrument(level = "info", skip_all, fields(headline = candidate.headline.as_deref().unwrap_or("")))]
async fn ingest_candidate<S, P>(
    store: &mut S,
    session: &mut P,
    candidate: &ListingItem,
    policy: &RetryPolicy,
) -> Result<CandidateOutcome, IngestError>
where
    S: ArticleStore,
    P: PageSession,
{
    let (Some(headline), Some(link)) = (candidate.headline.as_deref(), candidate.link.as_deref())
    else {
        warn!(?candidate, "Listing item lacks a headline or link; skipping");
        return Ok(CandidateOutcome::Skipped);
    };

    // Reserved before navigation, and kept whatever the attempts do.
    let slug = match ensure_unique_slug(store, headline, MAX_SUFFIX).await {
        Ok(slug) => slug,
        Err(SlugError::Store(e)) => return Err(e.into()),
        Err(e @ SlugError::Exhausted { .. }) => {
            warn!(error = %e, "Skipping article");
            return Ok(CandidateOutcome::Skipped);
        }
    };

    info!(%link, %slug, "Visiting article");
    for attempt in 1..=policy.max_attempts {
        match fetch_and_store(store, session, headline, link, &slug).await {
            Ok(()) => {
                info!(%slug, attempt, "Collected and saved article");
                return Ok(CandidateOutcome::Inserted { slug });
            }
            Err(e) => warn!(
                attempt,
                max = policy.max_attempts,
                error = %e,
                "Error processing article"
            ),
        }
    }

    error!(attempts = policy.max_attempts, %link, "Giving up on article");
    Ok(CandidateOutcome::Failed {
        slug,
        attempts: policy.max_attempts,
    })
}

async fn fetch_and_store<S, P>(
    store: &mut S,
    session: &mut P,
    headline: &str,
    link: &str,
    slug: &str,
) -> Result<(), AttemptError>
where
    S: ArticleStore,
    P: PageSession,
{
    let html = load(session, link, ARTICLE_TIMEOUT).await?;
    let article = {
        let document = Html::parse_document(&html);
        assemble_article(&document, headline, link, slug)
    };
    store.insert_article(&article).await?;
    Ok(())
}

/// Build the stored row from a loaded article page.
///
/// Date, body and media are extracted independently; each falls back on
/// its own without failing the others.
pub fn assemble_article(document: &Html, headline: &str, link: &str, slug: &str) -> Article {
    let date = extract_with_fallback(document, "date", article_date, today_iso);
    let paragraph_html = extract_with_fallback(
        document,
        "body",
        |doc| article_paragraphs(doc).map(|ps| paragraphs_to_html(&ps)),
        String::new,
    );
    let media = extract_with_fallback(document, "media", article_media, || {
        DEFAULT_MEDIA.to_string()
    });

    Article {
        id: Uuid::new_v4().to_string(),
        slug: slug.to_string(),
        headline: headline.to_string(),
        summary: summarize(&paragraph_html),
        body: build_body(&paragraph_html, link),
        author: AUTHOR_PLACEHOLDER.to_string(),
        resource: RESOURCE.to_string(),
        media,
        link: link.to_string(),
        date,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::browser::scripted::ScriptedLauncher;
    use crate::store::memory::MemoryStore;
    use crate::utils::source_link_block;

    pub const BEGIN_URL: &str = "https://www.democracynow.org/2025/10/17/headlines/talks_begin";
    pub const CONTINUE_URL: &str =
        "https://www.democracynow.org/2025/10/17/headlines/talks_continue";
    pub const BROKEN_URL: &str = "https://www.democracynow.org/2025/10/17/headlines/broken";

    pub fn listing(items: &[(&str, &str)]) -> String {
        let items: String = items
            .iter()
            .map(|(headline, href)| {
                format!(
                    r#"<div class="news_item"><h3><a href="{href}">{headline}</a></h3><div class="date">Oct 17, 2025</div></div>"#
                )
            })
            .collect();
        format!("<html><body>{items}</body></html>")
    }

    pub fn article_page(paragraphs: &[&str]) -> String {
        let ps: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
        format!(
            r#"<html><body><article class="headline">
                 <div class="news_label"><span class="date">Oct 17, 2025</span></div>
                 <img itemprop="image" src="https://cdn.democracynow.org/img.jpg">
                 <div class="headline_summary">{ps}</div>
               </article></body></html>"#
        )
    }

    fn old_row(slug: &str, resource: &str) -> Article {
        Article {
            id: format!("old-{slug}"),
            slug: slug.to_string(),
            headline: "Old".to_string(),
            summary: String::new(),
            body: String::new(),
            author: String::new(),
            resource: resource.to_string(),
            media: String::new(),
            link: String::new(),
            date: String::new(),
        }
    }

    #[test]
    fn test_default_retry_policy() {
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }

    #[test]
    fn test_assemble_article_full_page() {
        let doc = Html::parse_document(&article_page(&["First paragraph.", "Second."]));
        let article = assemble_article(&doc, "Headline", BEGIN_URL, "headline");

        assert_eq!(article.date, "2025-10-17T00:00:00.000Z");
        assert_eq!(article.media, "https://cdn.democracynow.org/img.jpg");
        assert_eq!(article.summary, "First paragraph. Second....");
        assert_eq!(
            article.body,
            format!(
                "<p>First paragraph.</p><p>Second.</p>{}",
                source_link_block(BEGIN_URL)
            )
        );
        assert_eq!(article.author, AUTHOR_PLACEHOLDER);
        assert_eq!(article.resource, RESOURCE);
        assert_eq!(article.link, BEGIN_URL);
        assert!(Uuid::parse_str(&article.id).is_ok());
    }

    #[test]
    fn test_assemble_article_bare_page_uses_fallbacks() {
        let doc = Html::parse_document("<html><body><p>Unrelated</p></body></html>");
        let article = assemble_article(&doc, "Headline", BEGIN_URL, "headline");

        assert_eq!(article.summary, "");
        assert_eq!(article.body, source_link_block(BEGIN_URL));
        assert_eq!(article.media, DEFAULT_MEDIA);
        assert_eq!(article.date, today_iso());
    }

    #[tokio::test]
    async fn test_colliding_headlines_stored_in_listing_order() {
        let launcher = ScriptedLauncher::new()
            .page(
                LISTING_URL,
                &listing(&[
                    ("Global Climate Talks Begin", BEGIN_URL),
                    ("Global Climate Talks Continue", CONTINUE_URL),
                ]),
            )
            .page(BEGIN_URL, &article_page(&["Delegates arrive."]))
            .page(CONTINUE_URL, &article_page(&["Talks go on."]));
        let mut store = MemoryStore::default();

        let candidates = run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(store.slugs(), vec!["globalclimate", "globalclimate-1"]);
        let rows = store.rows();
        assert_eq!(rows[0].headline, "Global Climate Talks Begin");
        assert_eq!(rows[1].headline, "Global Climate Talks Continue");
        assert!(launcher.is_closed());
    }

    #[tokio::test]
    async fn test_failing_article_is_retried_then_skipped() {
        let launcher = ScriptedLauncher::new()
            .page(
                LISTING_URL,
                &listing(&[
                    ("Broken Story Here", BROKEN_URL),
                    ("Global Climate Talks Begin", BEGIN_URL),
                ]),
            )
            .page(BEGIN_URL, &article_page(&["Delegates arrive."]));
        let mut store = MemoryStore::default();

        let candidates = run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(launcher.visits_to(BROKEN_URL), 3);
        assert_eq!(launcher.visits_to(BEGIN_URL), 1);
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].headline, "Global Climate Talks Begin");
        assert!(rows.iter().all(|a| a.headline != "Broken Story Here"));
    }

    #[tokio::test]
    async fn test_retry_policy_bounds_attempts() {
        let launcher = ScriptedLauncher::new()
            .page(LISTING_URL, &listing(&[("Broken Story Here", BROKEN_URL)]));
        let mut store = MemoryStore::default();

        run(&mut store, &launcher, &RetryPolicy { max_attempts: 5 })
            .await
            .unwrap();

        assert_eq!(launcher.visits_to(BROKEN_URL), 5);
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_insert_failure_is_retried_with_same_slug() {
        let launcher = ScriptedLauncher::new()
            .page(
                LISTING_URL,
                &listing(&[("Global Climate Talks Begin", BEGIN_URL)]),
            )
            .page(BEGIN_URL, &article_page(&["Delegates arrive."]));
        let mut store = MemoryStore::default();
        store.fail_next_inserts(2);

        run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(launcher.visits_to(BEGIN_URL), 3);
        assert_eq!(store.slugs(), vec!["globalclimate"]);
    }

    #[tokio::test]
    async fn test_run_replaces_only_this_source() {
        let launcher = ScriptedLauncher::new()
            .page(
                LISTING_URL,
                &listing(&[("Global Climate Talks Begin", BEGIN_URL)]),
            )
            .page(BEGIN_URL, &article_page(&["Delegates arrive."]));
        let mut store = MemoryStore::with_rows(vec![
            old_row("globalclimate", RESOURCE),
            old_row("otherstory", "Other Outlet"),
        ]);

        run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resource, "Other Outlet");
        // The old row with the same slug was deleted first, so no suffix.
        assert_eq!(rows[1].slug, "globalclimate");
        assert_ne!(rows[1].id, "old-globalclimate");
    }

    #[tokio::test]
    async fn test_slug_collides_with_other_source() {
        let launcher = ScriptedLauncher::new()
            .page(
                LISTING_URL,
                &listing(&[("Global Climate Talks Begin", BEGIN_URL)]),
            )
            .page(BEGIN_URL, &article_page(&["Delegates arrive."]));
        let mut store = MemoryStore::with_rows(vec![old_row("globalclimate", "Other Outlet")]);

        run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(store.slugs(), vec!["globalclimate", "globalclimate-1"]);
    }

    #[tokio::test]
    async fn test_listing_failure_is_explicit() {
        let launcher = ScriptedLauncher::new();
        let mut store = MemoryStore::with_rows(vec![old_row("globalclimate", RESOURCE)]);

        let err = run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::ListingUnavailable(_)));
        assert_eq!(launcher.visits(), vec![LISTING_URL.to_string()]);
        assert!(launcher.is_closed());
        // Full replace: the delete already happened.
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let launcher = ScriptedLauncher::new().failing_launch();
        let mut store = MemoryStore::default();

        let err = run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::Browser(BrowserError::Launch(_))));
    }

    #[tokio::test]
    async fn test_items_without_link_are_skipped() {
        let html = format!(
            "{}{}",
            r#"<div class="news_item"><h3>No link</h3></div>"#,
            listing(&[("Global Climate Talks Begin", BEGIN_URL)])
        );
        let launcher = ScriptedLauncher::new()
            .page(LISTING_URL, &html)
            .page(BEGIN_URL, &article_page(&["Delegates arrive."]));
        let mut store = MemoryStore::default();

        let candidates = run(&mut store, &launcher, &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].link, None);
        assert_eq!(store.slugs(), vec!["globalclimate"]);
    }
}
