//! Detail-page processing: publish time, tables, text fallback, metadata.
//!
//! A detail page yields one record per penalized party. Structured table
//! parsing always runs first; the free-text extractors only backfill the
//! basis and content fields it left empty, so a populated table cell is
//! never overwritten by a regex guess.

use chrono::Local;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{FieldRecord, ListingEntry};
use crate::parse::{self, fallback};
use crate::table::extract_penalty_tables;
use crate::text::{clean_text, find_loose_date, LOOSE_DATE};

/// Selectors tried in order for the page's publish-time element.
const PUBLISH_TIME_SELECTORS: &[&str] =
    &["span.ng-binding", ".publish-time", ".pub-time", ".time"];

/// Parse a rendered detail page into finished records.
///
/// Empty result means the page had neither a parsable table nor any
/// recognizable penalty text.
pub fn parse_detail_page(html: &str, entry: &ListingEntry) -> Vec<FieldRecord> {
    let document = Html::parse_document(html);

    let publish_time = extract_publish_time(&document, html)
        .or_else(|| entry.publish_date.clone())
        .unwrap_or_default();

    let mut records = Vec::new();
    for table in extract_penalty_tables(html) {
        records = parse::parse_table(&table);
        if !records.is_empty() {
            break;
        }
    }

    let text = page_text(&document);

    if records.is_empty() {
        let mut record = FieldRecord::default();
        record.legal_basis = fallback::extract_basis(&text);
        record.penalty_content = fallback::extract_content(&text);
        if record.is_blank() {
            debug!(url = %entry.detail_url, "no table and no extractable text");
            return Vec::new();
        }
        records.push(record);
    } else {
        // Backfill only; structured values win.
        let needs_basis = records.iter().any(|r| r.legal_basis.is_empty());
        let needs_content = records.iter().any(|r| r.penalty_content.is_empty());
        if needs_basis || needs_content {
            let basis = if needs_basis {
                fallback::extract_basis(&text)
            } else {
                String::new()
            };
            let content = if needs_content {
                fallback::extract_content(&text)
            } else {
                String::new()
            };
            for record in &mut records {
                if record.legal_basis.is_empty() {
                    record.legal_basis = basis.clone();
                }
                if record.penalty_content.is_empty() {
                    record.penalty_content = content.clone();
                }
            }
        }
    }

    let crawl_time = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    for record in &mut records {
        record.title = entry.title.clone();
        record.detail_url = entry.detail_url.clone();
        record.category = Some(entry.category);
        if record.publish_time.is_empty() {
            record.publish_time = publish_time.clone();
        }
        record.crawl_time = crawl_time.clone();
    }

    if records.len() > 1 {
        let primary = records[0].clone();
        for record in records.iter_mut().skip(1) {
            record.inherit_shared(&primary);
        }
    }

    records
}

/// Publish time from the page: a dated element matching the known
/// selectors, else a labelled date anywhere in the source.
fn extract_publish_time(document: &Html, raw_html: &str) -> Option<String> {
    for selector in PUBLISH_TIME_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&sel) {
            let text = clean_text(&element.text().collect::<String>());
            if text.is_empty() {
                continue;
            }
            let keyword = text.contains("发布时间") || text.contains("时间") || text.contains("日期");
            if let Some(date) = find_loose_date(&text) {
                // A bare-date element is accepted too; long prose is not.
                if keyword || text.chars().count() <= 20 {
                    return Some(date);
                }
            }
        }
    }

    for label in &["发布时间", "时间", "日期"] {
        let pattern = format!("{}[：:]\\s*({})", label, LOOSE_DATE);
        let re = Regex::new(&pattern).expect("publish time pattern");
        if let Some(caps) = re.captures(raw_html) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }

    None
}

/// Visible text of the page, one text node per line, for the free-text
/// extractors.
fn page_text(document: &Html) -> String {
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn entry() -> ListingEntry {
        ListingEntry {
            title: "某银行行政处罚信息公示".into(),
            detail_url: "https://www.nfra.gov.cn/cn/view/pages/ItemDetail.html?docId=1".into(),
            category: Category::HeadOffice,
            page_index: 1,
            publish_date: Some("2025-06-10".into()),
        }
    }

    fn kv_page(extra_rows: &str) -> String {
        format!(
            "<html><body>\
             <span class=\"ng-binding\">发布时间：2025-06-10</span>\
             <table>\
             <tr><td>当事人名称</td><td>某商业银行</td></tr>\
             <tr><td>主要违法违规事实</td><td>贷款三查不尽职</td></tr>\
             {extra_rows}\
             <tr><td>作出处罚决定的机关名称</td><td>某金融监管局</td></tr>\
             </table></body></html>",
        )
    }

    #[test]
    fn test_key_value_page_single_record() {
        let html = kv_page(
            "<tr><td>行政处罚依据</td><td>《银行业监督管理法》第四十六条</td></tr>\
             <tr><td>行政处罚决定</td><td>罚款50万元</td></tr>",
        );
        let records = parse_detail_page(&html, &entry());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.party_name, "某商业银行");
        assert_eq!(record.penalty_content, "罚款50万元");
        assert_eq!(record.publish_time, "2025-06-10");
        assert_eq!(record.title, "某银行行政处罚信息公示");
        assert_eq!(record.category, Some(Category::HeadOffice));
        assert!(!record.crawl_time.is_empty());
    }

    #[test]
    fn test_fallback_fills_only_empty_fields() {
        // The table lacks basis and content; the narrative supplies both.
        let html = format!(
            "{}<p>依据《中华人民共和国银行业监督管理法》第四十六条，对某商业银行罚款30万元。</p></html>",
            kv_page("").trim_end_matches("</body></html>"),
        );
        let records = parse_detail_page(&html, &entry());
        assert_eq!(records.len(), 1);
        assert!(records[0].legal_basis.contains("银行业监督管理法"));
        assert!(records[0].penalty_content.contains("罚款30万元"));
        // The structured cells were untouched.
        assert_eq!(records[0].party_name, "某商业银行");
    }

    #[test]
    fn test_fallback_never_overwrites_table_values() {
        let html = format!(
            "{}<p>依据《保险法》第一百六十条，对某商业银行警告。</p></html>",
            kv_page(
                "<tr><td>行政处罚依据</td><td>《银行业监督管理法》第四十六条</td></tr>\
                 <tr><td>行政处罚决定</td><td>罚款50万元</td></tr>",
            )
            .trim_end_matches("</body></html>"),
        );
        let records = parse_detail_page(&html, &entry());
        assert_eq!(records[0].legal_basis, "《银行业监督管理法》第四十六条");
        assert_eq!(records[0].penalty_content, "罚款50万元");
    }

    #[test]
    fn test_grid_page_expands_and_inherits() {
        let html = "<html><body>\
            <div class=\"publish-time\">发布时间：2025-06-10</div>\
            <table>\
            <tr><td>序号</td><td>当事人名称</td><td>行政处罚内容</td><td>作出决定机关</td></tr>\
            <tr><td>1</td><td>甲银行</td><td>罚款30万元</td><td>某监管局</td></tr>\
            <tr><td>2</td><td>乙银行</td><td>警告</td><td></td></tr>\
            </table></body></html>";
        let records = parse_detail_page(html, &entry());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].authority, "某监管局");
        // Shared fields flow from the primary record.
        assert_eq!(records[1].authority, "某监管局");
        assert_eq!(records[1].publish_time, "2025-06-10");
        assert_eq!(records[1].sequence, Some(2));
    }

    #[test]
    fn test_text_only_page() {
        let html = "<html><body><p>\
            依据《中华人民共和国保险法》第一百六十一条，对某保险公司罚款12万元。\
            </p></body></html>";
        let records = parse_detail_page(html, &entry());
        assert_eq!(records.len(), 1);
        assert!(records[0].legal_basis.contains("保险法"));
        assert!(records[0].penalty_content.contains("罚款12万元"));
        // Listing date backstops the missing publish-time element.
        assert_eq!(records[0].publish_time, "2025-06-10");
    }

    #[test]
    fn test_unparseable_page_yields_nothing() {
        let html = "<html><body><p>页面不存在。</p></body></html>";
        assert!(parse_detail_page(html, &entry()).is_empty());
    }

    #[test]
    fn test_publish_time_source_regex_fallback() {
        let html = "<html><body>\
            <!-- 发布时间：2025-6-3 -->\
            <table>\
            <tr><td>当事人名称</td><td>某银行</td></tr>\
            <tr><td>行政处罚决定</td><td>警告</td></tr>\
            </table></body></html>";
        let mut e = entry();
        e.publish_date = None;
        let records = parse_detail_page(html, &e);
        assert_eq!(records[0].publish_time, "2025-6-3");
    }
}
