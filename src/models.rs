//! Data model for penalty disclosure crawling.
//!
//! Records flow listing → detail → result: the navigator emits
//! [`ListingEntry`] values, the detail orchestrator expands each entry into
//! one or more [`FieldRecord`]s, and the crawl orchestrator collects them
//! into a [`CrawlResult`] keyed by category.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Disclosure level on the regulator's site. Each category has its own
/// paginated listing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Penalties issued by the head office.
    HeadOffice,
    /// Penalties issued by provincial-level bureaus.
    ProvincialBureau,
    /// Penalties issued by local sub-bureaus.
    LocalSubBureau,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::HeadOffice,
        Category::ProvincialBureau,
        Category::LocalSubBureau,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeadOffice => "head_office",
            Self::ProvincialBureau => "provincial_bureau",
            Self::LocalSubBureau => "local_sub_bureau",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "head_office" => Some(Self::HeadOffice),
            "provincial_bureau" => Some(Self::ProvincialBureau),
            "local_sub_bureau" => Some(Self::LocalSubBureau),
            _ => None,
        }
    }

    /// The category's display name as it appears on the source site.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HeadOffice => "总局机关",
            Self::ProvincialBureau => "监管局本级",
            Self::LocalSubBureau => "监管分局本级",
        }
    }
}

/// Target window for a filtered crawl: a year, a month, or an exact day.
///
/// Comparisons work on the zero-padded `YYYY-MM-DD` tokens the site uses,
/// so plain lexicographic ordering is chronological ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFilter {
    Year(i32),
    Month(i32, u32),
    Day(NaiveDate),
}

impl DateFilter {
    /// Build a filter from optional CLI parts. Month requires year; day
    /// requires both.
    pub fn from_parts(
        year: Option<i32>,
        month: Option<u32>,
        day: Option<u32>,
    ) -> anyhow::Result<Option<Self>> {
        match (year, month, day) {
            (None, None, None) => Ok(None),
            (Some(y), None, None) => Ok(Some(Self::Year(y))),
            (Some(y), Some(m), None) => {
                if !(1..=12).contains(&m) {
                    anyhow::bail!("month out of range: {}", m);
                }
                Ok(Some(Self::Month(y, m)))
            }
            (Some(y), Some(m), Some(d)) => {
                let date = NaiveDate::from_ymd_opt(y, m, d)
                    .ok_or_else(|| anyhow::anyhow!("invalid date: {}-{}-{}", y, m, d))?;
                Ok(Some(Self::Day(date)))
            }
            _ => anyhow::bail!("--month requires --year, --day requires --month"),
        }
    }

    /// The `YYYY[-MM[-DD]]` prefix every in-window date token starts with.
    pub fn prefix(&self) -> String {
        match self {
            Self::Year(y) => format!("{:04}", y),
            Self::Month(y, m) => format!("{:04}-{:02}", y, m),
            Self::Day(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    /// Does this `YYYY-MM-DD` token fall inside the window?
    pub fn matches(&self, date: &str) -> bool {
        date.starts_with(&self.prefix())
    }

    /// Strictly older than the window start. On a newest-first listing this
    /// is the early-termination signal: everything after it is older still.
    pub fn is_before_window(&self, date: &str) -> bool {
        !self.matches(date) && *date < *self.prefix()
    }

    /// Strictly newer than the window end.
    pub fn is_after_window(&self, date: &str) -> bool {
        !self.matches(date) && *date > *self.prefix()
    }
}

impl std::fmt::Display for DateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.prefix())
    }
}

/// One harvested listing link, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Anchor text of the announcement link.
    pub title: String,
    /// Absolute URL of the detail page.
    pub detail_url: String,
    /// Category whose listing this entry came from.
    pub category: Category,
    /// 1-based listing page the link was found on.
    pub page_index: u32,
    /// Publish date resolved for this link, if any (`YYYY-MM-DD`).
    pub publish_date: Option<String>,
}

/// Canonical output fields all table shapes converge to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The table's own sequence-number column.
    SequenceNo,
    PartyName,
    Violation,
    LegalBasis,
    PenaltyContent,
    Authority,
    DecisionDate,
    DocumentNumber,
}

/// One normalized penalty record.
///
/// A detail page describing a multi-party decision expands into several
/// records; all of them share publish time, authority, and document number
/// unless a row supplies its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Announcement title from the listing link.
    pub title: String,
    /// Sequence-number column text, when the table has one.
    pub sequence_no: String,
    /// Name of the penalized party.
    pub party_name: String,
    /// Description of the violation.
    pub violation: String,
    /// Legal basis for the penalty.
    pub legal_basis: String,
    /// Penalty decided (warning, fine amount, ...).
    pub penalty_content: String,
    /// Decision document number.
    pub document_number: String,
    /// Authority that issued the decision.
    pub authority: String,
    /// Date the decision was made, as printed in the table.
    pub decision_date: String,
    /// 1-based position within a multi-record announcement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    /// Publish time of the detail page.
    pub publish_time: String,
    /// When this record was crawled (`YYYY-MM-DD HH:MM:SS`).
    pub crawl_time: String,
    /// Absolute URL of the detail page.
    pub detail_url: String,
    /// Category the record belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    /// Labels no canonical rule recognized, preserved verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl FieldRecord {
    /// Store `value` under a canonical field.
    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::SequenceNo => self.sequence_no = value,
            Field::PartyName => self.party_name = value,
            Field::Violation => self.violation = value,
            Field::LegalBasis => self.legal_basis = value,
            Field::PenaltyContent => self.penalty_content = value,
            Field::Authority => self.authority = value,
            Field::DecisionDate => self.decision_date = value,
            Field::DocumentNumber => self.document_number = value,
        }
    }

    /// True if no parser put anything into this record.
    pub fn is_blank(&self) -> bool {
        self.sequence_no.is_empty()
            && self.party_name.is_empty()
            && self.violation.is_empty()
            && self.legal_basis.is_empty()
            && self.penalty_content.is_empty()
            && self.document_number.is_empty()
            && self.authority.is_empty()
            && self.decision_date.is_empty()
            && self.extra.is_empty()
    }

    /// Fill the fields a multi-record page shares from the primary record,
    /// keeping any value this record already carries.
    pub fn inherit_shared(&mut self, primary: &FieldRecord) {
        if self.authority.is_empty() {
            self.authority = primary.authority.clone();
        }
        if self.document_number.is_empty() {
            self.document_number = primary.document_number.clone();
        }
        if self.publish_time.is_empty() {
            self.publish_time = primary.publish_time.clone();
        }
        if self.title.is_empty() {
            self.title = primary.title.clone();
        }
    }
}

/// Final output of a crawl: category → ordered records.
pub type CrawlResult = BTreeMap<Category, Vec<FieldRecord>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_filter_window() {
        let filter = DateFilter::Month(2025, 6);
        assert!(filter.matches("2025-06-10"));
        assert!(!filter.matches("2025-05-28"));
        assert!(filter.is_before_window("2025-05-28"));
        assert!(filter.is_after_window("2025-07-01"));
        assert!(!filter.is_before_window("2025-06-01"));
    }

    #[test]
    fn test_year_filter_window() {
        let filter = DateFilter::Year(2025);
        assert!(filter.matches("2025-01-01"));
        assert!(filter.is_before_window("2024-12-31"));
        assert!(filter.is_after_window("2026-01-01"));
    }

    #[test]
    fn test_day_filter_window() {
        let filter =
            DateFilter::Day(NaiveDate::from_ymd_opt(2025, 6, 10).expect("valid date"));
        assert!(filter.matches("2025-06-10"));
        assert!(filter.is_before_window("2025-06-09"));
        assert!(filter.is_after_window("2025-06-11"));
    }

    #[test]
    fn test_filter_from_parts() {
        assert_eq!(
            DateFilter::from_parts(Some(2025), Some(6), None).unwrap(),
            Some(DateFilter::Month(2025, 6))
        );
        assert!(DateFilter::from_parts(None, Some(6), None).is_err());
        assert!(DateFilter::from_parts(Some(2025), Some(13), None).is_err());
    }

    #[test]
    fn test_inherit_shared_keeps_own_values() {
        let mut primary = FieldRecord::default();
        primary.authority = "总局".into();
        primary.document_number = "罚决字〔2025〕1号".into();

        let mut extra = FieldRecord::default();
        extra.authority = "某监管分局".into();
        extra.inherit_shared(&primary);

        assert_eq!(extra.authority, "某监管分局");
        assert_eq!(extra.document_number, "罚决字〔2025〕1号");
    }
}
