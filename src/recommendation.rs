use regex::Regex;
use std::sync::OnceLock;

/// Cell header naming the rationale column the server embeds in tables.
pub const REASON_HEADER: &str = "추천 이유";
const REASON_PREFIX: &str = "추천 이유:";

const CATEGORY_GLYPHS: [(&str, &str); 3] = [("영화", "🎬"), ("음악", "🎵"), ("도서", "📚")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Acceptance,
    Diversion,
}

impl Slot {
    pub fn title(self) -> &'static str {
        match self {
            Slot::Acceptance => "수용",
            Slot::Diversion => "전환",
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::Acceptance => Slot::Diversion,
            Slot::Diversion => Slot::Acceptance,
        }
    }

    fn from_label(label: &str) -> Option<Slot> {
        match label {
            "수용" | "공감" => Some(Slot::Acceptance),
            "전환" | "환기" => Some(Slot::Diversion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationSections {
    pub acceptance: String,
    pub diversion: String,
}

impl RecommendationSections {
    pub fn get(&self, slot: Slot) -> &str {
        match slot {
            Slot::Acceptance => &self.acceptance,
            Slot::Diversion => &self.diversion,
        }
    }

    fn set(&mut self, slot: Slot, body: String) {
        match slot {
            Slot::Acceptance => self.acceptance = body,
            Slot::Diversion => self.diversion = body,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.acceptance.is_empty() && self.diversion.is_empty()
    }
}

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"#+\s*\[\s*(수용|공감|전환|환기)\s*\]").expect("header pattern is valid")
    })
}

/// Splits a recommendation blob into its acceptance and diversion sections.
///
/// A section starts at a `## [label]` header and runs until the next
/// recognised header. When a slot repeats, the later body replaces the
/// earlier one.
pub fn parse(text: &str) -> RecommendationSections {
    let mut sections = RecommendationSections::default();
    let headers: Vec<_> = header_regex().captures_iter(text).collect();

    for (i, caps) in headers.iter().enumerate() {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        if let Some(slot) = Slot::from_label(label.as_str().trim()) {
            sections.set(slot, text[whole.end()..end].trim().to_string());
        }
    }
    sections
}

/// A markdown table reduced to plain cell text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Removes the rationale column and rows, and swaps category names in the
/// first column of body rows for glyphs.
pub fn clean_table(mut table: TextTable) -> TextTable {
    if let Some(col) = table.header.iter().position(|h| h.trim() == REASON_HEADER) {
        table.header.remove(col);
        for row in &mut table.rows {
            if col < row.len() {
                row.remove(col);
            }
        }
    }

    table
        .rows
        .retain(|row| !row.iter().any(|cell| cell.contains(REASON_PREFIX)));

    for row in &mut table.rows {
        if let Some(first) = row.first_mut() {
            *first = replace_categories(first);
        }
    }
    table
}

fn replace_categories(cell: &str) -> String {
    CATEGORY_GLYPHS
        .iter()
        .fold(cell.to_string(), |acc, (name, glyph)| {
            acc.replace(&format!("**{name}**"), glyph).replace(name, glyph)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_sections_in_order() {
        let s = parse("## [수용]\nA\n## [전환]\nB");
        assert_eq!(s.acceptance, "A");
        assert_eq!(s.diversion, "B");
    }

    #[test]
    fn both_sections_reversed_with_synonyms() {
        let s = parse("### [ 환기 ]\n산책하기\n\n# [공감]\n괜찮아요");
        assert_eq!(s.acceptance, "괜찮아요");
        assert_eq!(s.diversion, "산책하기");
    }

    #[test]
    fn repeated_slot_keeps_last_body() {
        let s = parse("## [수용]\nfirst\n## [전환]\nB\n## [공감]\nsecond");
        assert_eq!(s.acceptance, "second");
        assert_eq!(s.diversion, "B");
    }

    #[test]
    fn text_without_headers_yields_empty_slots() {
        assert!(parse("그냥 긴 문장입니다. [수용] 같은 단어만 있어요").is_empty());
        assert!(parse("").is_empty());
    }

    #[test]
    fn preamble_and_unknown_headers_are_discarded() {
        let s = parse("intro\n## [기타]\nignored?\n## [수용]\nA");
        // unrecognised headers are not boundaries
        assert_eq!(s.acceptance, "A");
        assert_eq!(s.diversion, "");
    }

    #[test]
    fn body_runs_to_next_recognised_header_only() {
        let s = parse("## [수용]\nA\n## [기타]\nstill A\n## [전환]\nB");
        assert_eq!(s.acceptance, "A\n## [기타]\nstill A");
    }

    #[test]
    fn reason_column_and_rows_are_stripped() {
        let table = TextTable {
            header: vec!["분류".into(), "제목".into(), REASON_HEADER.into()],
            rows: vec![
                vec!["영화".into(), "인사이드 아웃".into(), "공감돼요".into()],
                vec!["음악".into(), "추천 이유: 잔잔함".into(), "x".into()],
                vec!["**도서**".into(), "데미안".into(), "성장".into()],
            ],
        };
        let cleaned = clean_table(table);
        assert_eq!(cleaned.header, ["분류", "제목"]);
        assert_eq!(
            cleaned.rows,
            vec![
                vec!["🎬".to_string(), "인사이드 아웃".to_string()],
                vec!["📚".to_string(), "데미안".to_string()],
            ]
        );
    }

    #[test]
    fn header_row_keeps_category_words() {
        let table = TextTable {
            header: vec!["영화".into()],
            rows: vec![vec!["제목 영화".into(), "영화".into()]],
        };
        let cleaned = clean_table(table);
        assert_eq!(cleaned.header, ["영화"]);
        assert_eq!(cleaned.rows[0], ["제목 🎬", "영화"]);
    }
}
