//! Label → canonical-field mapping.
//!
//! The site never uses one spelling for a field twice, so mapping goes
//! through an ordered rule table: an exact-match tier for the spellings we
//! have seen verbatim, then a substring tier as the broader net. Substring
//! rules carry forbid-guards so overlapping labels (决定机关 / 决定书文号 /
//! 决定日期 all contain 决定) land on their own fields.

use crate::models::Field;

/// One mapping rule. Exact spellings win over substring hits; a substring
/// hit is rejected when the label also contains a forbidden fragment.
pub struct LabelRule {
    pub field: Field,
    pub exact: &'static [&'static str],
    pub contains: &'static [&'static str],
    pub forbid: &'static [&'static str],
}

/// Rules in precedence order. Within the substring tier the first matching
/// rule wins, so narrower fields come first.
pub const LABEL_RULES: &[LabelRule] = &[
    LabelRule {
        field: Field::SequenceNo,
        exact: &["序号"],
        contains: &["序号"],
        forbid: &[],
    },
    LabelRule {
        field: Field::PartyName,
        exact: &["当事人名称", "被处罚当事人", "当事人"],
        contains: &["当事人"],
        forbid: &[],
    },
    LabelRule {
        field: Field::Violation,
        exact: &[
            "主要违法违规事实",
            "主要违法违规行为",
            "违法违规事实",
            "违法违规行为",
            "违法行为",
        ],
        contains: &["违法违规", "违法行为"],
        forbid: &[],
    },
    LabelRule {
        field: Field::LegalBasis,
        exact: &["行政处罚依据", "处罚依据"],
        contains: &["处罚依据"],
        forbid: &[],
    },
    LabelRule {
        field: Field::DocumentNumber,
        exact: &["行政处罚决定书文号", "决定书文号"],
        contains: &["决定书文号", "文号"],
        forbid: &[],
    },
    LabelRule {
        field: Field::DecisionDate,
        exact: &[
            "作出处罚决定的日期",
            "作出决定日期",
            "决定日期",
            "处罚决定日期",
        ],
        contains: &["决定日期", "决定的日期"],
        forbid: &[],
    },
    LabelRule {
        field: Field::Authority,
        exact: &[
            "作出处罚决定的机关名称",
            "作出处罚决定的机关",
            "作出决定机关",
            "决定机关",
            "机关名称",
        ],
        contains: &["决定机关", "决定的机关", "机关名称"],
        forbid: &["日期"],
    },
    LabelRule {
        field: Field::PenaltyContent,
        exact: &["行政处罚决定", "处罚决定", "行政处罚内容", "处罚内容"],
        contains: &["处罚内容", "行政处罚决定", "处罚决定", "行政处罚"],
        forbid: &["机关", "日期", "文号", "依据"],
    },
];

/// Map a cleaned label (or grid header) to its canonical field.
///
/// The exact tier is scanned in full before any substring rule applies, so
/// a verbatim spelling can never be stolen by a broader rule earlier in
/// the table.
pub fn match_label(label: &str) -> Option<Field> {
    for rule in LABEL_RULES {
        if rule.exact.contains(&label) {
            return Some(rule.field);
        }
    }
    for rule in LABEL_RULES {
        if rule.forbid.iter().any(|frag| label.contains(frag)) {
            continue;
        }
        if rule.contains.iter().any(|frag| label.contains(frag)) {
            return Some(rule.field);
        }
    }
    None
}
