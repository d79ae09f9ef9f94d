//! Crawl configuration.
//!
//! Loaded from an optional TOML file; every field has a working default so
//! a bare `penacq crawl` needs no config at all.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::Category;

/// Base of the disclosure site; relative hrefs resolve against this.
pub const SITE_BASE: &str = "https://www.nfra.gov.cn";

/// Tunable crawl parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Listing URL per category.
    #[serde(default = "default_listing_urls")]
    pub listing_urls: BTreeMap<Category, String>,

    /// Page-load attempts before a category is abandoned.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Page-load timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Listing pages to visit per category when no limit is given.
    #[serde(default = "default_max_pages")]
    pub default_max_pages: u32,

    /// Page cap for year-level backfills, which walk much deeper.
    #[serde(default = "default_backfill_max_pages")]
    pub backfill_max_pages: u32,

    /// Politeness delay between detail fetches, in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Longer politeness delay between categories, in milliseconds.
    #[serde(default = "default_category_delay_ms")]
    pub category_delay_ms: u64,
}

fn default_listing_urls() -> BTreeMap<Category, String> {
    let item = |item_id: u32, name: &str| {
        format!(
            "{}/cn/view/pages/ItemList.html?itemPId=923&itemId={}&itemUrl=ItemListRightList.html&itemName={}&itemsubPId=931",
            SITE_BASE, item_id, name,
        )
    };
    BTreeMap::from([
        (Category::HeadOffice, item(4113, "%E6%80%BB%E5%B1%80%E6%9C%BA%E5%85%B3")),
        (Category::ProvincialBureau, item(4114, "%E7%9B%91%E7%AE%A1%E5%B1%80%E6%9C%AC%E7%BA%A7")),
        (Category::LocalSubBureau, item(4115, "%E7%9B%91%E7%AE%A1%E5%88%86%E5%B1%80%E6%9C%AC%E7%BA%A7")),
    ])
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> u32 {
    5
}

fn default_backfill_max_pages() -> u32 {
    50
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_category_delay_ms() -> u64 {
    2000
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            listing_urls: default_listing_urls(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            default_max_pages: default_max_pages(),
            backfill_max_pages: default_backfill_max_pages(),
            request_delay_ms: default_request_delay_ms(),
            category_delay_ms: default_category_delay_ms(),
        }
    }
}

impl CrawlConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let raw = fs::read_to_string(p)
                    .map_err(|e| anyhow::anyhow!("cannot read config {}: {}", p.display(), e))?;
                Ok(toml::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn listing_url(&self, category: Category) -> Option<&str> {
        self.listing_urls.get(&category).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_all_categories() {
        let config = CrawlConfig::default();
        for category in Category::ALL {
            let url = config.listing_url(category).expect("url configured");
            assert!(url.starts_with(SITE_BASE));
        }
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: CrawlConfig = toml::from_str("max_retries = 5").expect("parse");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.default_max_pages, 5);
        assert_eq!(config.listing_urls.len(), 3);
    }
}
