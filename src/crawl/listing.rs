//! Listing-page harvesting and the pagination stop condition.
//!
//! Listing pages are rendered newest-first, so the date tokens on a page
//! tell us where the page sits relative to a date window without opening a
//! single detail page: pages with in-window dates are harvested, and once
//! the window has been entered, the first page without a window date ends
//! the walk. The same ordering applies within a page, so harvesting stops
//! at the first link whose date falls before the window.

use std::collections::HashSet;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::models::{Category, DateFilter, ListingEntry};
use crate::text::{clean_text, find_date, DATE_TOKEN};

/// Anchor-text fragments that mark a penalty announcement link.
const LINK_TEXT_PATTERNS: &[&str] = &["行政处罚信息公示", "行政处罚信息公开", "处罚信息"];

/// Where the walk stands relative to the date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// Still above the window; pages seen so far are all newer.
    Searching,
    /// Inside the window.
    InRange,
    /// Past the window; nothing deeper can match.
    Done,
}

/// What to do with the page just observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageAction {
    /// Harvest this page's links.
    Harvest,
    /// Skip it and advance; the window is deeper.
    Skip,
    /// End pagination.
    Stop,
}

/// Drives the stop condition across one category's listing walk.
///
/// Feed it each page's date tokens in visit order; once it answers
/// [`PageAction::Stop`] it answers `Stop` forever.
pub struct ListingNavigator {
    filter: Option<DateFilter>,
    state: CrawlState,
}

impl ListingNavigator {
    pub fn new(filter: Option<DateFilter>) -> Self {
        Self {
            filter,
            state: CrawlState::Searching,
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    /// Classify a page from its date tokens and advance the state machine.
    pub fn observe(&mut self, page_index: u32, page_dates: &[String]) -> PageAction {
        if self.state == CrawlState::Done {
            return PageAction::Stop;
        }

        let Some(filter) = self.filter else {
            self.state = CrawlState::InRange;
            return PageAction::Harvest;
        };

        let any_match = page_dates.iter().any(|d| filter.matches(d));
        let any_older = page_dates.iter().any(|d| filter.is_before_window(d));

        if any_match {
            self.state = if any_older {
                // Boundary page: harvest it, then stop.
                CrawlState::Done
            } else {
                CrawlState::InRange
            };
            return PageAction::Harvest;
        }

        if self.state == CrawlState::InRange {
            // The window has been fully traversed.
            self.state = CrawlState::Done;
            return PageAction::Stop;
        }

        match page_index {
            1 => {
                let newest_is_newer = page_dates
                    .iter()
                    .max()
                    .map(|d| filter.is_after_window(d))
                    .unwrap_or(false);
                if newest_is_newer {
                    // The category has nothing for this window yet.
                    self.state = CrawlState::Done;
                    PageAction::Stop
                } else {
                    // Date ordering near page boundaries is occasionally
                    // unreliable; probe page 2 before giving up.
                    debug!("page 1 without window dates, probing page 2");
                    PageAction::Skip
                }
            }
            2 => PageAction::Skip,
            _ => {
                self.state = CrawlState::Done;
                PageAction::Stop
            }
        }
    }
}

/// Links harvested from one listing page.
pub struct PageHarvest {
    pub entries: Vec<ListingEntry>,
    /// A link dated before the window was seen, so pagination should end
    /// after this page.
    pub crossed_window: bool,
}

/// Which anchor matcher a harvest pass applies. The site changes its link
/// microcopy over time, so the href matcher exists as a whole-page
/// fallback for when no anchor text matches at all.
#[derive(Clone, Copy)]
enum LinkMatcher {
    AnchorText,
    Href,
}

impl LinkMatcher {
    fn matches(self, title: &str, href: &str) -> bool {
        match self {
            Self::AnchorText => LINK_TEXT_PATTERNS.iter().any(|p| title.contains(p)),
            Self::Href => href.contains("ItemDetail"),
        }
    }
}

/// Harvest announcement links from rendered listing HTML.
///
/// The anchor-text matcher runs first; only when it finds nothing on the
/// whole page does the href matcher get a pass, so unrelated `ItemDetail`
/// links never ride along with recognized announcement links. Links are
/// taken in document order. With a filter, links newer than the window are
/// skipped, the first link older than the window ends the scan, and
/// undated links are kept (the detail page settles their date).
pub fn harvest_page(
    html: &str,
    category: Category,
    page_index: u32,
    base_url: &str,
    filter: Option<&DateFilter>,
) -> PageHarvest {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();
    let page_dates = page_date_tokens(html);

    let primary = scan_links(
        &document,
        LinkMatcher::AnchorText,
        category,
        page_index,
        base.as_ref(),
        &page_dates,
        filter,
    );
    if !primary.entries.is_empty() || primary.crossed_window {
        return primary;
    }

    scan_links(
        &document,
        LinkMatcher::Href,
        category,
        page_index,
        base.as_ref(),
        &page_dates,
        filter,
    )
}

fn scan_links(
    document: &Html,
    matcher: LinkMatcher,
    category: Category,
    page_index: u32,
    base: Option<&Url>,
    page_dates: &[String],
    filter: Option<&DateFilter>,
) -> PageHarvest {
    let anchor_selector = Selector::parse("a[href]").expect("anchor selector");

    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();
    let mut crossed_window = false;
    let mut link_index = 0usize;

    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.is_empty() || href.starts_with("javascript") || href.starts_with('#') {
            continue;
        }

        let title = clean_text(&anchor.text().collect::<String>());
        if title.is_empty() || !matcher.matches(&title, href) {
            continue;
        }

        let Some(detail_url) = absolutize(base, href) else {
            debug!(href, "unresolvable listing href, skipping");
            continue;
        };
        if !seen.insert(detail_url.clone()) {
            continue;
        }

        let publish_date =
            resolve_link_date(anchor).or_else(|| page_dates.get(link_index).cloned());
        link_index += 1;

        if let (Some(filter), Some(date)) = (filter, publish_date.as_deref()) {
            if filter.is_before_window(date) {
                // Newest-first within the page too: everything after this
                // link is older still.
                crossed_window = true;
                break;
            }
            if filter.is_after_window(date) {
                continue;
            }
        }

        entries.push(ListingEntry {
            title,
            detail_url,
            category,
            page_index,
            publish_date,
        });
    }

    PageHarvest {
        entries,
        crossed_window,
    }
}

/// All `YYYY-MM-DD` tokens on the page, in document order. Positional date
/// fallback relies on this ordering matching the link ordering.
pub fn page_date_tokens(html: &str) -> Vec<String> {
    let re = Regex::new(DATE_TOKEN).expect("date token pattern");
    re.find_iter(html).map(|m| m.as_str().to_string()).collect()
}

fn absolutize(base: Option<&Url>, href: &str) -> Option<String> {
    if let Ok(url) = Url::parse(href) {
        return Some(url.to_string());
    }
    base.and_then(|b| b.join(href).ok()).map(|u| u.to_string())
}

/// Resolve the publish date printed next to a listing link.
///
/// Cascade: the enclosing table row, then up to five enclosing elements,
/// then elements following the link. `None` falls back to the positional
/// page-date list in the caller.
fn resolve_link_date(anchor: ElementRef<'_>) -> Option<String> {
    for node in anchor.ancestors() {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().name() == "tr" {
                if let Some(date) = find_date(&el.text().collect::<String>()) {
                    return Some(date);
                }
                break;
            }
        }
    }

    for node in anchor.ancestors().take(5) {
        if let Some(el) = ElementRef::wrap(node) {
            if let Some(date) = find_date(&el.text().collect::<String>()) {
                return Some(date);
            }
        }
    }

    for node in anchor.next_siblings() {
        if let Some(el) = ElementRef::wrap(node) {
            if let Some(date) = find_date(&el.text().collect::<String>()) {
                return Some(date);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.nfra.gov.cn/cn/view/pages/ItemList.html";

    fn listing_row(title: &str, href: &str, date: &str) -> String {
        format!(
            "<tr><td><a href=\"{href}\">{title}</a></td><td>{date}</td></tr>",
        )
    }

    fn page(rows: &[String]) -> String {
        format!("<html><body><table>{}</table></body></html>", rows.join(""))
    }

    #[test]
    fn test_harvest_matches_anchor_text() {
        let html = page(&[
            listing_row("某银行行政处罚信息公示", "ItemDetail.html?docId=1", "2025-06-10"),
            listing_row("站点地图", "/sitemap.html", "2025-06-08"),
        ]);
        let harvest = harvest_page(&html, Category::HeadOffice, 1, BASE, None);
        assert_eq!(harvest.entries.len(), 1);
        assert!(harvest.entries[0]
            .detail_url
            .starts_with("https://www.nfra.gov.cn/cn/view/pages/ItemDetail.html"));
        assert_eq!(harvest.entries[0].publish_date.as_deref(), Some("2025-06-10"));
    }

    #[test]
    fn test_href_matcher_only_when_no_text_match() {
        // A page where the text matcher succeeds must not also pick up
        // unrelated ItemDetail links.
        let html = page(&[
            listing_row("某银行行政处罚信息公示", "ItemDetail.html?docId=1", "2025-06-10"),
            listing_row("年度工作会议公告", "ItemDetail.html?docId=2", "2025-06-09"),
        ]);
        let harvest = harvest_page(&html, Category::HeadOffice, 1, BASE, None);
        assert_eq!(harvest.entries.len(), 1);
        assert_eq!(harvest.entries[0].title, "某银行行政处罚信息公示");
    }

    #[test]
    fn test_href_matcher_fallback_on_changed_microcopy() {
        // No anchor text matches the known variants; the whole page falls
        // back to the href matcher.
        let html = page(&[
            listing_row("某银行处罚公告", "ItemDetail.html?docId=1", "2025-06-10"),
            listing_row("站点地图", "/sitemap.html", "2025-06-08"),
        ]);
        let harvest = harvest_page(&html, Category::HeadOffice, 1, BASE, None);
        assert_eq!(harvest.entries.len(), 1);
        assert_eq!(harvest.entries[0].title, "某银行处罚公告");
    }

    #[test]
    fn test_harvest_dedups_repeated_urls() {
        let html = page(&[
            listing_row("处罚信息A", "ItemDetail.html?docId=1", "2025-06-10"),
            listing_row("处罚信息A再次", "ItemDetail.html?docId=1", "2025-06-10"),
        ]);
        let harvest = harvest_page(&html, Category::HeadOffice, 1, BASE, None);
        assert_eq!(harvest.entries.len(), 1);
    }

    #[test]
    fn test_harvest_stops_at_window_floor() {
        // Newest-first rows; the filter covers June only. The first
        // pre-June link ends the scan, dropping everything after it.
        let filter = DateFilter::Month(2025, 6);
        let html = page(&[
            listing_row("处罚信息1", "ItemDetail.html?docId=1", "2025-06-20"),
            listing_row("处罚信息2", "ItemDetail.html?docId=2", "2025-06-05"),
            listing_row("处罚信息3", "ItemDetail.html?docId=3", "2025-05-30"),
            listing_row("处罚信息4", "ItemDetail.html?docId=4", "2025-05-29"),
            listing_row("处罚信息5", "ItemDetail.html?docId=5", "2025-05-28"),
        ]);
        let harvest = harvest_page(&html, Category::HeadOffice, 1, BASE, Some(&filter));
        assert_eq!(harvest.entries.len(), 2);
        assert!(harvest.crossed_window);
    }

    #[test]
    fn test_harvest_skips_links_newer_than_window() {
        let filter = DateFilter::Month(2025, 5);
        let html = page(&[
            listing_row("处罚信息1", "ItemDetail.html?docId=1", "2025-06-20"),
            listing_row("处罚信息2", "ItemDetail.html?docId=2", "2025-05-30"),
        ]);
        let harvest = harvest_page(&html, Category::HeadOffice, 1, BASE, Some(&filter));
        assert_eq!(harvest.entries.len(), 1);
        assert_eq!(harvest.entries[0].publish_date.as_deref(), Some("2025-05-30"));
        assert!(!harvest.crossed_window);
    }

    #[test]
    fn test_positional_date_fallback() {
        // No row structure around the link; its date sits elsewhere on the
        // page and is matched by position.
        let html = "<html><body>\
            <div>2025-06-10</div>\
            <p><a href=\"ItemDetail.html?docId=1\">处罚信息</a></p>\
            </body></html>";
        let harvest = harvest_page(html, Category::LocalSubBureau, 1, BASE, None);
        assert_eq!(harvest.entries.len(), 1);
        assert_eq!(harvest.entries[0].publish_date.as_deref(), Some("2025-06-10"));
    }

    #[test]
    fn test_navigator_walks_into_and_past_window() {
        let mut nav = ListingNavigator::new(Some(DateFilter::Month(2025, 6)));
        let inside = vec!["2025-06-20".to_string(), "2025-06-01".to_string()];
        let older = vec!["2025-05-28".to_string()];

        assert_eq!(nav.observe(1, &inside), PageAction::Harvest);
        assert_eq!(nav.state(), CrawlState::InRange);
        assert_eq!(nav.observe(2, &inside), PageAction::Harvest);
        assert_eq!(nav.observe(3, &older), PageAction::Stop);
        assert_eq!(nav.state(), CrawlState::Done);
        assert_eq!(nav.observe(4, &inside), PageAction::Stop);
    }

    #[test]
    fn test_navigator_newer_first_page_ends_category() {
        // Page 1's newest date is past the window: the window has no
        // content in this category yet.
        let mut nav = ListingNavigator::new(Some(DateFilter::Month(2025, 6)));
        let newer = vec!["2025-07-10".to_string()];
        assert_eq!(nav.observe(1, &newer), PageAction::Stop);
        assert_eq!(nav.state(), CrawlState::Done);
    }

    #[test]
    fn test_navigator_boundary_page_harvests_then_stops() {
        let mut nav = ListingNavigator::new(Some(DateFilter::Month(2025, 6)));
        let boundary = vec!["2025-06-02".to_string(), "2025-05-30".to_string()];
        assert_eq!(nav.observe(1, &boundary), PageAction::Harvest);
        assert_eq!(nav.state(), CrawlState::Done);
        assert_eq!(nav.observe(2, &boundary), PageAction::Stop);
    }

    #[test]
    fn test_navigator_probes_page_two_then_gives_up() {
        // Older-only pages while still searching get one probe page before
        // the walk is abandoned.
        let mut nav = ListingNavigator::new(Some(DateFilter::Month(2025, 6)));
        let older = vec!["2025-04-01".to_string()];
        assert_eq!(nav.observe(1, &older), PageAction::Skip);
        assert_eq!(nav.observe(2, &older), PageAction::Skip);
        assert_eq!(nav.observe(3, &older), PageAction::Stop);
    }

    #[test]
    fn test_navigator_probe_page_recovers_window() {
        let mut nav = ListingNavigator::new(Some(DateFilter::Month(2025, 6)));
        let older = vec!["2025-05-20".to_string()];
        let inside = vec!["2025-06-10".to_string()];
        assert_eq!(nav.observe(1, &older), PageAction::Skip);
        assert_eq!(nav.observe(2, &inside), PageAction::Harvest);
        assert_eq!(nav.state(), CrawlState::InRange);
    }

    #[test]
    fn test_navigator_unfiltered_always_harvests() {
        let mut nav = ListingNavigator::new(None);
        assert_eq!(nav.observe(1, &[]), PageAction::Harvest);
        assert_eq!(nav.observe(2, &[]), PageAction::Harvest);
    }

    #[test]
    fn test_navigator_undated_pages() {
        // Pages without any date token cannot end the search on their own
        // until the probe budget runs out.
        let mut nav = ListingNavigator::new(Some(DateFilter::Year(2025)));
        assert_eq!(nav.observe(1, &[]), PageAction::Skip);
        assert_eq!(nav.observe(2, &[]), PageAction::Skip);
        assert_eq!(nav.observe(3, &[]), PageAction::Stop);
    }
}
