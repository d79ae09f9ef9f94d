//! Text-fallback extraction of penalty basis and content.
//!
//! Some detail pages put the legal basis and the penalty decision in free
//! narrative text instead of discrete table cells; the table parsers alone
//! systematically under-extract there. These extractors run ordered regex
//! lists over the page's flattened text and only ever backfill fields the
//! structured parse left empty.

use regex::Regex;

use crate::text::clean_text;

/// Citation patterns, most specific first: full article references, then
/// bracketed statute names, then bare 依据/根据/违反 clauses.
const BASIS_PATTERNS: &[&str] = &[
    r"依据[《]?([^》。；\n]+第[^。；\n]+条[^。；\n]*)[》]?",
    r"根据[《]?([^》。；\n]+第[^。；\n]+条[^。；\n]*)[》]?",
    r"按照[《]?([^》。；\n]+第[^。；\n]+条[^。；\n]*)[》]?",
    r"《([^》]+法[^》]*)》",
    r"《([^》]+规定[^》]*)》",
    r"《([^》]+办法[^》]*)》",
    r"《([^》]+条例[^》]*)》",
    r"依据[《]?([^》。；\n]+)[》]?[，。]",
    r"根据[《]?([^》。；\n]+)[》]?[，。]",
    r"违反[了]?[《]?([^》。；\n]+)[》]?",
];

/// "against PARTY: penalty" clause patterns; party and penalty captured
/// separately so the clause can be re-joined in normalized form.
const PENALTY_CLAUSE_PATTERNS: &[&str] = &[
    r"对([^对。；\n]+?)(警告并罚款[0-9]+万元)",
    r"对([^对。；\n]+?)(罚款[0-9]+万元[^。；\n]*)",
    r"对([^对。；\n]+?)(警告[^。；\n]*)",
];

/// Batch totals and breakdowns that follow the per-party clauses.
const PENALTY_SUMMARY_PATTERNS: &[&str] = &[
    r"(合计罚款[0-9]+万元[^。；\n]*)",
    r"(其中[^。；\n]*[0-9]+万元[^。；\n]*)",
];

/// Extract the legal basis from flattened page text. Empty when nothing
/// citation-like is present.
pub fn extract_basis(text: &str) -> String {
    let mut found: Vec<String> = Vec::new();

    for pattern in BASIS_PATTERNS {
        let re = Regex::new(pattern).expect("basis pattern");
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let candidate = clean_text(m.as_str());
            if candidate.chars().count() > 5 {
                keep_longest(&mut found, candidate);
            }
        }
    }

    found.join("；")
}

/// Extract the penalty content from flattened page text.
pub fn extract_content(text: &str) -> String {
    let mut sentences: Vec<String> = Vec::new();

    for pattern in PENALTY_CLAUSE_PATTERNS {
        let re = Regex::new(pattern).expect("penalty clause pattern");
        for caps in re.captures_iter(text) {
            let (Some(party), Some(penalty)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let party = clean_text(party.as_str());
            let penalty = clean_text(penalty.as_str());
            if !party.is_empty() && !penalty.is_empty() {
                push_sentence(&mut sentences, format!("对{}{}", party, penalty));
            }
        }
    }

    for pattern in PENALTY_SUMMARY_PATTERNS {
        let re = Regex::new(pattern).expect("penalty summary pattern");
        for caps in re.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                push_sentence(&mut sentences, clean_text(m.as_str()));
            }
        }
    }

    // Line-level sweep so clauses the patterns above sliced short are not
    // lost. A line may pack several penalties; split at each 对…警告/罚款
    // clause start.
    let clause_start = Regex::new(r"对[^对]*(?:警告|罚款)").expect("clause start pattern");
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !["对", "罚款", "万元", "警告"]
            .iter()
            .any(|kw| line.contains(kw))
        {
            continue;
        }
        for fragment in split_at_match_starts(line, &clause_start) {
            let fragment = clean_text(fragment);
            if fragment.chars().count() > 3
                && (fragment.contains("罚款") || fragment.contains("警告"))
            {
                push_sentence(&mut sentences, fragment);
            }
        }
    }

    sentences.join("；")
}

/// Split `line` into fragments beginning at each match start (plus the
/// leading fragment, if any).
fn split_at_match_starts<'a>(line: &'a str, re: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = re.find_iter(line).map(|m| m.start()).collect();
    if starts.is_empty() {
        return vec![line];
    }
    let mut fragments = Vec::new();
    if starts[0] > 0 {
        fragments.push(&line[..starts[0]]);
    }
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(line.len());
        fragments.push(&line[start..end]);
    }
    fragments
}

/// Push a sentence unless it duplicates a kept one; longer spans win and
/// exact substrings of an already-kept match are discarded.
fn push_sentence(sentences: &mut Vec<String>, candidate: String) {
    let candidate = candidate.trim_matches(['。', '；', '，']).to_string();
    if candidate.chars().count() <= 3 {
        return;
    }
    keep_longest(sentences, candidate);
}

fn keep_longest(kept: &mut Vec<String>, candidate: String) {
    for existing in kept.iter_mut() {
        if existing.contains(&candidate) {
            return;
        }
        if candidate.contains(existing.as_str()) {
            *existing = candidate;
            return;
        }
    }
    kept.push(candidate);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_basis_article_citation() {
        let text = "依据《中华人民共和国银行业监督管理法》第四十六条第（五）项，作出如下处罚。";
        let basis = extract_basis(text);
        assert!(basis.contains("银行业监督管理法"));
        assert!(basis.contains("第四十六条"));
    }

    #[test]
    fn test_extract_basis_bracketed_statutes() {
        let text = "该行为违反了《保险法》《行政处罚信息公开办法》有关要求。";
        let basis = extract_basis(text);
        assert!(basis.contains("保险法"));
        assert!(basis.contains("行政处罚信息公开办法"));
    }

    #[test]
    fn test_extract_basis_empty_on_plain_text() {
        assert_eq!(extract_basis("本页不含任何引用内容。"), "");
    }

    #[test]
    fn test_extract_content_party_clauses() {
        let text = "对某商业银行警告并罚款50万元。对张某某罚款10万元。";
        let content = extract_content(text);
        assert!(content.contains("对某商业银行警告并罚款50万元"));
        assert!(content.contains("对张某某罚款10万元"));
    }

    #[test]
    fn test_extract_content_summary() {
        let text = "合计罚款80万元，其中机构罚款50万元。";
        let content = extract_content(text);
        assert!(content.contains("合计罚款80万元"));
        assert!(content.contains("其中机构罚款50万元"));
    }

    #[test]
    fn test_substring_matches_deduplicated() {
        // The narrow clause is a substring of the wide one; only the wide
        // span survives.
        let text = "对某农村信用社警告并罚款20万元";
        let content = extract_content(text);
        assert_eq!(
            content.matches("对某农村信用社警告并罚款20万元").count(),
            1
        );
        assert!(!content.contains("；对某农村信用社警告；"));
    }

    #[test]
    fn test_longer_match_replaces_shorter() {
        let mut kept = vec!["对甲警告".to_string()];
        keep_longest(&mut kept, "对甲警告并罚款5万元".to_string());
        assert_eq!(kept, vec!["对甲警告并罚款5万元".to_string()]);
    }

    #[test]
    fn test_extractors_pure() {
        let text = "对某银行罚款30万元。依据《银行业监督管理法》第四十六条。";
        assert_eq!(extract_content(text), extract_content(text));
        assert_eq!(extract_basis(text), extract_basis(text));
    }
}
