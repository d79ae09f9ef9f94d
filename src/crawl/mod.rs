//! Crawl orchestration across categories.
//!
//! One category at a time: walk its listing under the pagination stop
//! condition, collect links, then open each detail page in isolation. A
//! category that fails mid-walk keeps whatever it produced; it never takes
//! the other categories down with it.

pub mod detail;
pub mod listing;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::CrawlConfig;
use crate::error::FetchError;
use crate::fetch::{load_with_retry, PageFetcher};
use crate::models::{Category, CrawlResult, DateFilter, FieldRecord, ListingEntry};

use listing::{harvest_page, page_date_tokens, ListingNavigator, PageAction};

/// Caps applied to one category's walk.
#[derive(Debug, Clone, Copy)]
pub struct CrawlLimits {
    /// Listing pages to visit at most.
    pub max_pages: u32,
    /// Records to fetch details for, at most.
    pub max_records: Option<usize>,
}

impl CrawlLimits {
    /// Derive limits from config: year-level backfills walk much deeper
    /// than the default incremental window.
    pub fn for_filter(config: &CrawlConfig, filter: Option<&DateFilter>) -> Self {
        let max_pages = match filter {
            Some(DateFilter::Year(_)) => config.backfill_max_pages,
            _ => config.default_max_pages,
        };
        Self {
            max_pages,
            max_records: None,
        }
    }
}

/// Crawl driver over any [`PageFetcher`].
pub struct Crawler<F> {
    fetcher: F,
    config: CrawlConfig,
    filter: Option<DateFilter>,
}

impl<F: PageFetcher + Send> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlConfig, filter: Option<DateFilter>) -> Self {
        Self {
            fetcher,
            config,
            filter,
        }
    }

    /// Crawl the given categories in order and collect their records.
    pub async fn run(&mut self, categories: &[Category], limits: CrawlLimits) -> CrawlResult {
        let mut result = CrawlResult::new();

        for (idx, &category) in categories.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.category_delay_ms)).await;
            }

            match self.crawl_category(category, limits).await {
                Ok(records) => {
                    info!(
                        category = category.as_str(),
                        records = records.len(),
                        "category finished"
                    );
                    result.insert(category, records);
                }
                Err(err) => {
                    warn!(
                        category = category.as_str(),
                        error = %err,
                        "category abandoned"
                    );
                    result.insert(category, Vec::new());
                }
            }
        }

        result
    }

    async fn crawl_category(
        &mut self,
        category: Category,
        limits: CrawlLimits,
    ) -> Result<Vec<FieldRecord>, FetchError> {
        let Some(url) = self.config.listing_url(category).map(String::from) else {
            warn!(category = category.as_str(), "no listing URL configured");
            return Ok(Vec::new());
        };

        info!(category = category.as_str(), url, "starting category");
        load_with_retry(&mut self.fetcher, &url, self.config.max_retries).await?;

        let mut entries = self.collect_entries(category, &url, limits.max_pages).await?;
        if let Some(cap) = limits.max_records {
            if entries.len() > cap {
                entries.truncate(cap);
            }
        }

        self.fetch_details(&entries).await
    }

    /// Walk the listing, harvesting links until the stop condition or the
    /// page cap ends the walk.
    async fn collect_entries(
        &mut self,
        category: Category,
        base_url: &str,
        max_pages: u32,
    ) -> Result<Vec<ListingEntry>, FetchError> {
        let mut navigator = ListingNavigator::new(self.filter);
        let mut entries = Vec::new();

        for page_index in 1..=max_pages {
            let html = self.fetcher.content().await?;
            let dates = page_date_tokens(&html);

            match navigator.observe(page_index, &dates) {
                PageAction::Stop => {
                    info!(page_index, "stop condition reached");
                    break;
                }
                PageAction::Skip => {}
                PageAction::Harvest => {
                    let harvest =
                        harvest_page(&html, category, page_index, base_url, self.filter.as_ref());
                    info!(
                        page_index,
                        links = harvest.entries.len(),
                        "page harvested"
                    );
                    entries.extend(harvest.entries);
                    if harvest.crossed_window {
                        break;
                    }
                }
            }

            if page_index < max_pages && !self.fetcher.next_page().await? {
                info!(page_index, "no next page control, listing exhausted");
                break;
            }
        }

        Ok(entries)
    }

    /// Open each harvested link in isolation and expand it into records.
    /// A failed detail fetch drops that link only.
    async fn fetch_details(
        &mut self,
        entries: &[ListingEntry],
    ) -> Result<Vec<FieldRecord>, FetchError> {
        let mut records = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            if idx > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.request_delay_ms)).await;
            }

            let html = match self.fetcher.fetch_detail(&entry.detail_url).await {
                Ok(html) => html,
                Err(err) => {
                    warn!(url = %entry.detail_url, error = %err, "detail fetch failed");
                    continue;
                }
            };

            let parsed = detail::parse_detail_page(&html, entry);
            if parsed.is_empty() {
                warn!(url = %entry.detail_url, "detail page yielded no records");
            }
            records.extend(parsed);
        }

        Ok(records)
    }
}
