use crate::article::{Article, PublisherType};
use std::fmt;

/// Deduplication key for an article
///
/// Articles with a publisher-assigned id are identified by `(publisher, id)`;
/// everything else falls back to the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    External {
        publisher: PublisherType,
        external_id: i64,
    },
    Url(String),
}

impl IdentityKey {
    /// Derives the identity key of an article
    pub fn of(article: &Article) -> Self {
        match article.external_id {
            Some(external_id) => Self::External {
                publisher: article.publisher,
                external_id,
            },
            None => Self::Url(article.url.clone()),
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External {
                publisher,
                external_id,
            } => write!(f, "{}#{}", publisher.as_config_str(), external_id),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}
