//! Data models for scraped headlines and stored articles.
//!
//! - [`ListingItem`]: one entry scraped from the headlines listing page
//! - [`Article`]: a fully assembled row for the `"Article"` table
//! - [`HandlerResponse`]: the HTTP-style result returned by the handler

use serde::{Deserialize, Serialize};

/// Label stored in the `resource` column for every row this job owns.
pub const RESOURCE: &str = "Democracy Now!";

/// The source site does not expose authorship.
pub const AUTHOR_PLACEHOLDER: &str = "See article for details";

/// Image used when an article page has no usable `itemprop="image"` element.
pub const DEFAULT_MEDIA: &str = "https://npr.brightspotcdn.com/dims4/default/0f33387/2147483647/strip/true/crop/1200x630+0+260/resize/1200x630!/quality/90/?url=http%3A%2F%2Fnpr-brightspot.s3.amazonaws.com%2F69%2F34%2F879932ae4dbcbb5abb2f7dce90eb%2Fdemocracy-now-square-logo-2021.jpg";

/// A candidate article as it appears on the headlines listing page.
///
/// Every field is optional: the listing markup may drift, and a missing
/// sub-element yields `None` rather than dropping the whole item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ListingItem {
    /// Text of the `h3 a` heading link.
    pub headline: Option<String>,
    /// Absolute URL of the article page.
    pub link: Option<String>,
    /// Raw date text as displayed on the listing page.
    pub date: Option<String>,
}

/// A row in the `"Article"` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    pub id: String,
    pub slug: String,
    pub headline: String,
    pub summary: String,
    pub body: String,
    pub author: String,
    pub resource: String,
    pub media: String,
    pub link: String,
    /// ISO-8601 UTC timestamp, or a `YYYY-MM-DD` date when the page date was unusable.
    pub date: String,
}

/// Result of one handler invocation, shaped like a serverless HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded payload.
    pub body: String,
}

/// Payload of a successful run.
#[derive(Debug, Deserialize, Serialize)]
pub struct SuccessBody {
    pub message: String,
    pub articles: Vec<ListingItem>,
}
