//! Text normalization and date-token extraction.
//!
//! Every parser in this crate funnels cell and page text through
//! [`clean_text`] so whitespace and entity noise never reaches field
//! comparisons.

use regex::Regex;

/// Pattern for the `YYYY-MM-DD` date tokens the listing pages embed.
pub const DATE_TOKEN: &str = r"\d{4}-\d{2}-\d{2}";

/// Pattern for the looser date forms detail pages use (`2025-6-3`, `2025/06/03`).
pub const LOOSE_DATE: &str = r"\d{4}[-/]\d{1,2}[-/]\d{1,2}";

/// Collapse whitespace runs and strip the HTML entities that survive DOM
/// text extraction.
pub fn clean_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .trim()
        .to_string()
}

/// First `YYYY-MM-DD` token in `text`, if any.
pub fn find_date(text: &str) -> Option<String> {
    let re = Regex::new(DATE_TOKEN).expect("date token pattern");
    re.find(text).map(|m| m.as_str().to_string())
}

/// First loose date token (`-` or `/` separated, unpadded allowed).
pub fn find_loose_date(text: &str) -> Option<String> {
    let re = Regex::new(LOOSE_DATE).expect("loose date pattern");
    re.find(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a \n\t b  "), "a b");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_text_strips_entities() {
        assert_eq!(clean_text("a&nbsp;&amp;&nbsp;b"), "a & b");
        assert_eq!(clean_text("&lt;table&gt;"), "<table>");
    }

    #[test]
    fn test_find_date() {
        assert_eq!(find_date("决定日期：2025-06-03。"), Some("2025-06-03".into()));
        assert_eq!(find_date("no dates here"), None);
    }

    #[test]
    fn test_find_loose_date() {
        assert_eq!(find_loose_date("发布时间：2025/6/3"), Some("2025/6/3".into()));
    }
}
