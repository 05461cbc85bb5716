//! Article model
//!
//! An `Article` is one listing entry produced by a page fetcher. The crawler
//! only cares about its identity; the remaining fields are carried through to
//! storage untouched.

mod identity;
mod publisher;

pub use identity::IdentityKey;
pub use publisher::PublisherType;

use chrono::NaiveDateTime;

/// A single article scraped from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Numeric id assigned by the publisher, when the URL carries one
    pub external_id: Option<i64>,

    /// Headline text (never empty for parsed articles)
    pub headline: String,

    /// Short summary, absent on listing pages
    pub summary: Option<String>,

    /// Absolute URL of the article; unique across all publishers
    pub url: String,

    /// Reporter byline with any trailing title removed
    pub reporter_name: Option<String>,

    /// Display name of the publisher
    pub publisher_name: Option<String>,

    /// Publisher this article was scraped from
    pub publisher: PublisherType,

    /// Publication time in the publisher's local time
    pub published_at: Option<NaiveDateTime>,
}

impl Article {
    /// Creates an article with only the fields the crawler needs
    pub fn new(publisher: PublisherType, url: impl Into<String>, headline: impl Into<String>) -> Self {
        Self {
            external_id: None,
            headline: headline.into(),
            summary: None,
            url: url.into(),
            reporter_name: None,
            publisher_name: Some(publisher.display_name().to_string()),
            publisher,
            published_at: None,
        }
    }

    /// Sets the publisher-assigned id
    pub fn with_external_id(mut self, id: i64) -> Self {
        self.external_id = Some(id);
        self
    }

    /// Returns the key this article is deduplicated by
    pub fn identity(&self) -> IdentityKey {
        IdentityKey::of(self)
    }
}
