//! DOM extraction for the headlines listing and article pages.
//!
//! Extraction runs on the HTML of the page as loaded by the browser, parsed
//! with `scraper`. Listing extraction never fails: missing sub-elements
//! become `None`. Article extraction is per field; each extractor returns
//! [`ExtractError`] and [`extract_with_fallback`] substitutes a default.
//!
//! # Markup contract
//!
//! | Page | Field | Selector |
//! |------|-------|----------|
//! | Listing | item | `.news_item` |
//! | Listing | headline, link | `h3 a` (text, `href`) |
//! | Listing | date | `.date` |
//! | Article | date | `.news_label .date` |
//! | Article | paragraphs | `div.headline_summary p` |
//! | Article | media | `article.headline img[itemprop="image"]` (`src`) |

use crate::models::ListingItem;
use crate::utils::normalize_date;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Headlines listing page.
pub const LISTING_URL: &str = "https://www.democracynow.org/headlines";

/// Base against which relative article links are resolved.
pub const SITE_BASE: &str = "https://www.democracynow.org";

static ITEM_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".news_item").unwrap());
static HEADING_LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h3 a").unwrap());
static LISTING_DATE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".date").unwrap());
static ARTICLE_DATE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".news_label .date").unwrap());
static PARAGRAPH_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.headline_summary p").unwrap());
static MEDIA_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"article.headline img[itemprop="image"]"#).unwrap());

/// Why a single field could not be extracted from an article page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no element matches `{0}`")]
    MissingElement(&'static str),

    #[error("element `{selector}` has no usable `{attr}` attribute")]
    EmptyAttribute {
        selector: &'static str,
        attr: &'static str,
    },

    #[error("unparsable date: {0:?}")]
    UnparsableDate(String),
}

/// Trimmed, whitespace-collapsed text of an element.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve an `href` from the listing against [`SITE_BASE`].
fn resolve_link(href: &str) -> Option<String> {
    let base = Url::parse(SITE_BASE).ok()?;
    base.join(href.trim()).ok().map(|u| u.to_string())
}

/// Extract every candidate from the headlines listing page, in document order.
pub fn parse_listing(html: &str) -> Vec<ListingItem> {
    let document = Html::parse_document(html);

    let items: Vec<ListingItem> = document
        .select(&ITEM_SEL)
        .map(|item| {
            let heading = item.select(&HEADING_LINK_SEL).next();
            let headline = heading.map(element_text).filter(|s| !s.is_empty());
            let link = heading
                .and_then(|a| a.value().attr("href"))
                .and_then(resolve_link);
            let date = item
                .select(&LISTING_DATE_SEL)
                .next()
                .map(element_text)
                .filter(|s| !s.is_empty());
            ListingItem {
                headline,
                link,
                date,
            }
        })
        .collect();

    debug!(count = items.len(), "Parsed listing items");
    items
}

/// Run `extract` against `document`, substituting `fallback()` if it fails.
///
/// The failure is logged with the field name; it never propagates.
pub fn extract_with_fallback<T, E, F>(
    document: &Html,
    field: &'static str,
    extract: E,
    fallback: F,
) -> T
where
    E: FnOnce(&Html) -> Result<T, ExtractError>,
    F: FnOnce() -> T,
{
    match extract(document) {
        Ok(value) => value,
        Err(e) => {
            warn!(field, error = %e, "Extraction failed; using fallback");
            fallback()
        }
    }
}

/// Publication date of an article page, normalized to ISO-8601 UTC.
pub fn article_date(document: &Html) -> Result<String, ExtractError> {
    let el = document
        .select(&ARTICLE_DATE_SEL)
        .next()
        .ok_or(ExtractError::MissingElement(".news_label .date"))?;
    normalize_date(&element_text(el))
}

/// Texts of the article's summary paragraphs, in order. May be empty.
pub fn article_paragraphs(document: &Html) -> Result<Vec<String>, ExtractError> {
    Ok(document
        .select(&PARAGRAPH_SEL)
        .map(element_text)
        .collect())
}

/// Source URL of the article's representative image.
pub fn article_media(document: &Html) -> Result<String, ExtractError> {
    const SELECTOR: &str = r#"article.headline img[itemprop="image"]"#;
    let img = document
        .select(&MEDIA_SEL)
        .next()
        .ok_or(ExtractError::MissingElement(SELECTOR))?;
    img.value()
        .attr("src")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(ExtractError::EmptyAttribute {
            selector: SELECTOR,
            attr: "src",
        })
}
