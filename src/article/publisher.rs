use serde::Deserialize;
use std::fmt;

/// Publishers the crawler knows how to label
///
/// The numeric code is what gets stored alongside each article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublisherType {
    BlockMedia,
    CoinReaders,
    YonhapInfomax,
}

impl PublisherType {
    /// Stable numeric code used in the database
    pub fn code(&self) -> i64 {
        match self {
            Self::BlockMedia => 1,
            Self::CoinReaders => 2,
            Self::YonhapInfomax => 3,
        }
    }

    /// Looks up a publisher by its database code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::BlockMedia),
            2 => Some(Self::CoinReaders),
            3 => Some(Self::YonhapInfomax),
            _ => None,
        }
    }

    /// Human-readable publisher name as shown on the source site
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BlockMedia => "블록미디어",
            Self::CoinReaders => "coin readers",
            Self::YonhapInfomax => "연합인포맥스",
        }
    }

    /// Name used in configuration files
    pub fn as_config_str(&self) -> &'static str {
        match self {
            Self::BlockMedia => "block-media",
            Self::CoinReaders => "coin-readers",
            Self::YonhapInfomax => "yonhap-infomax",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::BlockMedia, Self::CoinReaders, Self::YonhapInfomax]
    }
}

impl fmt::Display for PublisherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_config_str())
    }
}
