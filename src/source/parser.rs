//! HTML parser for article listing pages
//!
//! This module turns a listing page into articles and finds the highest page
//! number advertised by the pagination links.
//!
//! # Listing layout
//!
//! - Each article is an `article.l-post` element
//! - Headline and link come from the post title anchor
//! - The publisher id is the number in `/archives/<id>`
//! - The byline is `span.meta-item.post-author a`, with a trailing `기자` removed
//! - The publication time is `time.post-date[datetime]`
//! - Pagination links are `a.page-numbers` pointing at the listing path

use crate::article::{Article, PublisherType};
use chrono::{DateTime, NaiveDateTime};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const ARTICLE_SELECTOR: &str = "article.l-post";
const TITLE_LINK_SELECTOR: &str = "h2.is-title.post-title a, h2.post-title a, h3.post-title a";
const AUTHOR_SELECTOR: &str = "span.meta-item.post-author a";
const DATE_SELECTOR: &str = "time.post-date";
const PAGE_LINK_SELECTOR: &str = "a.page-numbers[href]";

const ARTICLE_ID_PATTERN: &str = r"/archives/(\d+)";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
const REPORTER_SUFFIX: &str = "기자";

/// Parses listing pages of one source
#[derive(Debug, Clone)]
pub struct ListingParser {
    base_url: Url,
    publisher: PublisherType,
    article_id: Regex,
    page_link: Regex,
}

impl ListingParser {
    /// Creates a parser for the given source
    ///
    /// # Arguments
    ///
    /// * `base_url` - Site root used to resolve relative article links
    /// * `listing_path` - Listing path template containing `{page}`
    /// * `publisher` - Publisher stamped on every parsed article
    pub fn new(
        base_url: Url,
        listing_path: &str,
        publisher: PublisherType,
    ) -> Result<Self, regex::Error> {
        let prefix = listing_path.split("{page}").next().unwrap_or(listing_path);
        let page_link = Regex::new(&format!(r"{}(\d+)", regex::escape(prefix)))?;

        Ok(Self {
            base_url,
            publisher,
            article_id: Regex::new(ARTICLE_ID_PATTERN)?,
            page_link,
        })
    }

    /// Extracts all articles from a listing page
    ///
    /// Entries without a title link or with an empty headline are skipped.
    pub fn parse_articles(&self, html: &str) -> Vec<Article> {
        if html.trim().is_empty() {
            return Vec::new();
        }

        let document = Html::parse_document(html);
        let (Ok(article_selector), Ok(title_selector)) = (
            Selector::parse(ARTICLE_SELECTOR),
            Selector::parse(TITLE_LINK_SELECTOR),
        ) else {
            return Vec::new();
        };

        let mut articles = Vec::new();
        for element in document.select(&article_selector) {
            match self.parse_article(element, &title_selector) {
                Some(article) => articles.push(article),
                None => tracing::debug!("Skipping listing entry without a usable title"),
            }
        }

        articles
    }

    /// Returns the highest page number linked from the pagination bar
    ///
    /// An empty page, or one without pagination links, counts as a single page.
    pub fn parse_last_page(&self, html: &str) -> u32 {
        if html.trim().is_empty() {
            return 1;
        }

        let document = Html::parse_document(html);
        let Ok(selector) = Selector::parse(PAGE_LINK_SELECTOR) else {
            return 1;
        };

        document
            .select(&selector)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| self.page_link.captures(href))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
            .fold(1, u32::max)
    }

    fn parse_article(&self, element: ElementRef<'_>, title_selector: &Selector) -> Option<Article> {
        let title_link = element.select(title_selector).next()?;

        let headline = collapse_text(title_link);
        if headline.is_empty() {
            return None;
        }

        let href = title_link.value().attr("href")?.trim();
        let url = self.base_url.join(href).ok()?.to_string();

        let mut article = Article::new(self.publisher, url, headline);
        article.external_id = self.extract_article_id(&article.url);
        article.reporter_name = select_first(element, AUTHOR_SELECTOR)
            .map(collapse_text)
            .and_then(|text| strip_reporter_suffix(&text));
        article.published_at = select_first(element, DATE_SELECTOR)
            .and_then(|time| time.value().attr("datetime"))
            .and_then(parse_published_at);

        Some(article)
    }

    fn extract_article_id(&self, url: &str) -> Option<i64> {
        let caps = self.article_id.captures(url)?;
        match caps.get(1)?.as_str().parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("Failed to parse article id from {}", url);
                None
            }
        }
    }
}

fn select_first<'a>(element: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    element.select(&selector).next()
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// "박수용 기자" -> "박수용"
fn strip_reporter_suffix(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let name = trimmed
        .strip_suffix(REPORTER_SUFFIX)
        .unwrap_or(trimmed)
        .trim();

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn parse_published_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
        .or_else(|| {
            tracing::warn!("Failed to parse publication time: {}", raw);
            None
        })
}
