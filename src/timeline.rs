use crate::diary_entry::DiaryEntry;
use crate::diary_state::MonthlyDiaryCache;
use crate::emotion::{self, EmotionDescriptor};
use crate::recommendation::{self, RecommendationSections, Slot};
use chrono::NaiveDate;

pub const EMPTY_DAY_MESSAGE: &str = "작성된 일기가 없습니다.";
pub const UNAVAILABLE_MESSAGE: &str = "추천 내용을 불러오지 못했습니다.";

#[derive(Debug, Clone)]
pub struct TimelineItem {
    pub time: String,
    pub emotion: &'static EmotionDescriptor,
    pub preview: String,
}

/// What the timeline panel shows for one date.
#[derive(Debug, Clone)]
pub enum TimelineView {
    Empty,
    Entries(Vec<TimelineItem>),
}

impl TimelineView {
    pub fn for_date(cache: &MonthlyDiaryCache, date: NaiveDate) -> Self {
        let entries = cache.entries_on(date);
        if entries.is_empty() {
            return TimelineView::Empty;
        }
        let mut sorted: Vec<&DiaryEntry> = entries.iter().collect();
        sorted.sort_by_key(|e| e.created_at);
        TimelineView::Entries(
            sorted
                .into_iter()
                .map(|entry| TimelineItem {
                    time: entry.time_label(),
                    emotion: emotion::describe(&entry.emotion),
                    preview: entry.first_line().to_string(),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            TimelineView::Empty => 0,
            TimelineView::Entries(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Full view of one entry with its recommendation tabs.
#[derive(Debug, Clone)]
pub struct DetailView {
    pub entry: DiaryEntry,
    pub sections: Option<RecommendationSections>,
    pub tab: Slot,
    pub scroll: u16,
}

impl DetailView {
    pub fn open(entry: DiaryEntry) -> Self {
        let sections = entry
            .has_recommendation()
            .then(|| recommendation::parse(entry.recommendation.as_deref().unwrap_or_default()));
        DetailView {
            entry,
            sections,
            tab: Slot::Acceptance,
            scroll: 0,
        }
    }

    pub fn switch_tab(&mut self) {
        self.tab = self.tab.other();
        self.scroll = 0;
    }

    /// Markdown for the visible tab, or the placeholder when the slot is empty.
    pub fn visible_body(&self) -> Option<&str> {
        let sections = self.sections.as_ref()?;
        let body = sections.get(self.tab);
        Some(if body.is_empty() {
            UNAVAILABLE_MESSAGE
        } else {
            body
        })
    }

    pub fn scroll_by(&mut self, delta: i16) {
        self.scroll = self.scroll.saturating_add_signed(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary_entry::parse_timestamp;

    fn entry(id: &str, created: &str, emotion: &str, rec: Option<&str>) -> DiaryEntry {
        DiaryEntry {
            id: id.into(),
            date: "2025-03-04".parse().unwrap(),
            created_at: parse_timestamp(created).unwrap(),
            content: format!("{id} line\nmore"),
            emotion: emotion.into(),
            recommendation: rec.map(str::to_string),
        }
    }

    #[test]
    fn empty_day_uses_placeholder_state() {
        let cache = MonthlyDiaryCache::rebuild(2025, 3, vec![]);
        let view = TimelineView::for_date(&cache, "2025-03-04".parse().unwrap());
        assert!(matches!(view, TimelineView::Empty));
    }

    #[test]
    fn items_are_ascending_with_default_glyph_for_unknown() {
        let cache = MonthlyDiaryCache::rebuild(
            2025,
            3,
            vec![
                entry("b", "2025-03-04T20:00:00", "neutral", None),
                entry("a", "2025-03-04T08:05:00", "기쁨", None),
            ],
        );
        let TimelineView::Entries(items) =
            TimelineView::for_date(&cache, "2025-03-04".parse().unwrap())
        else {
            panic!("expected entries");
        };
        assert_eq!(items[0].time, "08:05");
        assert_eq!(items[0].preview, "a line");
        assert_eq!(items[1].emotion.glyph, "🤔");
    }

    #[test]
    fn detail_defaults_to_acceptance_and_shows_placeholder() {
        let mut detail = DetailView::open(entry(
            "a",
            "2025-03-04T08:05:00",
            "슬픔",
            Some("## [수용]\n토닥토닥"),
        ));
        assert_eq!(detail.visible_body(), Some("토닥토닥"));
        detail.switch_tab();
        assert_eq!(detail.visible_body(), Some(UNAVAILABLE_MESSAGE));
    }

    #[test]
    fn detail_without_recommendation_has_no_tabs() {
        let detail = DetailView::open(entry("a", "2025-03-04T08:05:00", "슬픔", Some("  ")));
        assert!(detail.visible_body().is_none());
    }
}
