//! Compose-analyze-save flow for a new entry.

use crate::api::{ApiError, Prediction};
use crate::diary_entry::EmotionCandidate;
use crate::emotion;
use crate::recommendation::{self, RecommendationSections, Slot};
use ratatui::style::Color;
use std::time::Duration;

/// Below this top score the candidate chips are always offered.
pub const CHIP_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const TICK: Duration = Duration::from_millis(50);

pub const SAVED_MESSAGE: &str = "저장 완료! 새로운 일기를 기록해보세요.";
pub const ANALYZING_MESSAGE: &str = "감정을 분석하고 추천을 생성하는 중입니다...";
pub const REGENERATING_MESSAGE: &str = "새로운 추천을 생성하는 중입니다...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Analyzing,
    Reviewing,
    ChipSwitching,
    Saving,
}

/// Indeterminate progress: one percent per [`TICK`] of elapsed time, held at
/// 95% until the request resolves, then snapped to 100%.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    percent: u16,
    running: bool,
    carry: Duration,
    label: String,
}

impl Progress {
    const CEILING: u16 = 95;

    pub fn start(label: &str) -> Self {
        Progress {
            percent: 0,
            running: true,
            carry: Duration::ZERO,
            label: label.to_string(),
        }
    }

    pub fn advance(&mut self, elapsed: Duration) {
        if !self.running {
            return;
        }
        self.carry += elapsed;
        while self.carry >= TICK {
            self.carry -= TICK;
            if self.percent < Self::CEILING {
                self.percent += 1;
            }
        }
    }

    pub fn finish(&mut self) {
        self.running = false;
        self.percent = 100;
    }

    pub fn percent(&self) -> u16 {
        self.percent
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Decorative save animation: the page folds into an orb that drops into a tray.
#[derive(Debug, Clone)]
pub struct SaveAnimation {
    elapsed: Duration,
    total: Duration,
    pub orb: Color,
}

impl SaveAnimation {
    pub fn new(total: Duration, orb: Color) -> Self {
        SaveAnimation {
            elapsed: Duration::ZERO,
            total,
            orb,
        }
    }

    pub fn advance(&mut self, by: Duration) {
        self.elapsed = (self.elapsed + by).min(self.total);
    }

    pub fn is_done(&self) -> bool {
        self.elapsed >= self.total
    }

    /// 0.0 at the start, 1.0 once settled.
    pub fn fraction(&self) -> f64 {
        if self.total.is_zero() {
            1.0
        } else {
            self.elapsed.as_secs_f64() / self.total.as_secs_f64()
        }
    }
}

/// Multi-line text buffer with a char-indexed cursor.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        if self.cursor < self.text.chars().count() {
            self.cursor += 1;
        }
    }

    /// Text before the cursor, for placing the terminal caret.
    pub fn before_cursor(&self) -> &str {
        &self.text[..self.byte_index(self.cursor)]
    }
}

/// The entry being composed, between analysis and save.
#[derive(Debug, Clone, Default)]
pub struct SubmissionDraft {
    pub text: String,
    pub emotion: Option<String>,
    pub candidates: Vec<EmotionCandidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionRequest {
    Predict { diary: String },
    Recommend { diary: String, emotion: String },
    Save { diary: String, emotion: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

pub struct Submission {
    pub input: TextInput,
    phase: Phase,
    draft: Option<SubmissionDraft>,
    sections: Option<RecommendationSections>,
    show_chips: bool,
    pub active_tab: Slot,
    progress: Option<Progress>,
    /// Emotion active before a chip switch, restored if regeneration fails.
    previous_emotion: Option<String>,
    animation: Option<SaveAnimation>,
    save_confirmed: bool,
    error: Option<String>,
    pub status: Option<Notice>,
    save_animation: Duration,
}

impl Submission {
    pub fn new(save_animation: Duration) -> Self {
        Submission {
            input: TextInput::default(),
            phase: Phase::Idle,
            draft: None,
            sections: None,
            show_chips: false,
            active_tab: Slot::Acceptance,
            progress: None,
            previous_emotion: None,
            animation: None,
            save_confirmed: false,
            error: None,
            status: None,
            save_animation,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn draft(&self) -> Option<&SubmissionDraft> {
        self.draft.as_ref()
    }

    pub fn sections(&self) -> Option<&RecommendationSections> {
        self.sections.as_ref()
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    pub fn animation(&self) -> Option<&SaveAnimation> {
        self.animation.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn chips_visible(&self) -> bool {
        self.show_chips && self.draft.as_ref().is_some_and(|d| !d.candidates.is_empty())
    }

    pub fn can_submit(&self) -> bool {
        !self.input.text().trim().is_empty()
            && matches!(self.phase, Phase::Idle | Phase::Reviewing)
    }

    pub fn can_save(&self) -> bool {
        self.phase == Phase::Reviewing
            && self.draft.as_ref().is_some_and(|d| d.emotion.is_some())
    }

    pub fn is_editable(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Reviewing)
    }

    pub fn submit(&mut self) -> Option<SubmissionRequest> {
        if !self.can_submit() {
            return None;
        }
        let diary = self.input.text().trim().to_string();
        self.phase = Phase::Analyzing;
        self.error = None;
        self.status = None;
        self.sections = None;
        self.draft = Some(SubmissionDraft {
            text: diary.clone(),
            emotion: None,
            candidates: Vec::new(),
        });
        self.progress = Some(Progress::start(ANALYZING_MESSAGE));
        tracing::info!(chars = diary.chars().count(), "submitting diary for analysis");
        Some(SubmissionRequest::Predict { diary })
    }

    pub fn apply_prediction(&mut self, result: Result<Prediction, ApiError>) {
        if self.phase != Phase::Analyzing {
            tracing::debug!(phase = ?self.phase, "dropping late prediction");
            return;
        }
        self.finish_progress();
        match result {
            Ok(prediction) => {
                tracing::info!(
                    emotion = %prediction.top_emotion,
                    emoji = %prediction.emoji,
                    candidates = prediction.candidates.len(),
                    "prediction received"
                );
                let draft = self.draft.get_or_insert_with(SubmissionDraft::default);
                let emotion = if prediction.top_emotion.is_empty() {
                    prediction.candidates.first().map(|c| c.emotion.clone())
                } else {
                    Some(prediction.top_emotion.clone())
                };
                draft.emotion = emotion;
                draft.candidates = prediction.candidates;
                self.show_chips = prediction.top_score < CHIP_CONFIDENCE_THRESHOLD
                    || draft.candidates.len() > 1;
                self.sections = Some(parse_sections(&prediction.recommendation));
                self.active_tab = Slot::Acceptance;
                self.phase = Phase::Reviewing;
            }
            Err(e) => {
                tracing::error!(error = %e, "prediction failed");
                self.error = Some(e.user_message());
                self.draft = None;
                self.phase = Phase::Idle;
            }
        }
    }

    pub fn select_candidate(&mut self, emotion: &str) -> Option<SubmissionRequest> {
        if self.phase != Phase::Reviewing {
            return None;
        }
        let draft = self.draft.as_mut()?;
        if draft.emotion.as_deref() == Some(emotion)
            || !draft.candidates.iter().any(|c| c.emotion == emotion)
        {
            return None;
        }
        self.previous_emotion = draft.emotion.replace(emotion.to_string());
        let diary = draft.text.clone();
        self.phase = Phase::ChipSwitching;
        self.error = None;
        self.progress = Some(Progress::start(REGENERATING_MESSAGE));
        Some(SubmissionRequest::Recommend {
            diary,
            emotion: emotion.to_string(),
        })
    }

    /// Picks the chip `offset` places from the active one.
    pub fn cycle_candidate(&mut self, offset: isize) -> Option<SubmissionRequest> {
        let draft = self.draft.as_ref()?;
        if !self.chips_visible() {
            return None;
        }
        let len = draft.candidates.len() as isize;
        let current = draft
            .candidates
            .iter()
            .position(|c| Some(&c.emotion) == draft.emotion.as_ref())
            .unwrap_or(0) as isize;
        let next = (current + offset).rem_euclid(len) as usize;
        let emotion = draft.candidates[next].emotion.clone();
        self.select_candidate(&emotion)
    }

    pub fn apply_recommendation(&mut self, result: Result<String, ApiError>) {
        if self.phase != Phase::ChipSwitching {
            tracing::debug!(phase = ?self.phase, "dropping late recommendation");
            return;
        }
        self.finish_progress();
        match result {
            Ok(text) => {
                self.sections = Some(parse_sections(&text));
                self.active_tab = Slot::Acceptance;
                self.show_chips = true;
                self.previous_emotion = None;
            }
            Err(e) => {
                tracing::error!(error = %e, "recommendation refresh failed");
                self.error = Some(e.user_message());
                if let Some(draft) = self.draft.as_mut() {
                    draft.emotion = self.previous_emotion.take();
                }
            }
        }
        self.phase = Phase::Reviewing;
    }

    pub fn save(&mut self) -> Option<SubmissionRequest> {
        if !self.can_save() {
            return None;
        }
        let draft = self.draft.as_ref()?;
        let emotion = draft.emotion.clone()?;
        let orb = emotion::describe(&emotion).orb;
        self.phase = Phase::Saving;
        self.save_confirmed = false;
        self.animation = Some(SaveAnimation::new(self.save_animation, orb));
        self.status = Some(Notice::Info("기억을 저장하는 중...".to_string()));
        Some(SubmissionRequest::Save {
            diary: draft.text.clone(),
            emotion,
        })
    }

    pub fn apply_save(&mut self, result: Result<(), ApiError>) {
        if self.phase != Phase::Saving {
            return;
        }
        match result {
            Ok(()) => {
                tracing::info!("diary saved");
                self.save_confirmed = true;
                self.try_complete_save();
            }
            Err(e) => {
                tracing::error!(error = %e, "save failed");
                self.animation = None;
                self.status = Some(Notice::Error(format!("저장 실패: {}", e.user_message())));
                self.phase = Phase::Reviewing;
            }
        }
    }

    /// Advances timers; returns true when a save completed on this tick.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if let Some(progress) = self.progress.as_mut() {
            progress.advance(elapsed);
        }
        if let Some(animation) = self.animation.as_mut() {
            animation.advance(elapsed);
            return self.try_complete_save();
        }
        false
    }

    pub fn switch_tab(&mut self) {
        self.active_tab = self.active_tab.other();
    }

    fn try_complete_save(&mut self) -> bool {
        let settled = self.animation.as_ref().map_or(true, SaveAnimation::is_done);
        if !(self.save_confirmed && settled) {
            return false;
        }
        self.animation = None;
        self.save_confirmed = false;
        self.reset();
        self.status = Some(Notice::Info(SAVED_MESSAGE.to_string()));
        true
    }

    fn finish_progress(&mut self) {
        if let Some(progress) = self.progress.as_mut() {
            progress.finish();
        }
    }

    /// Back to a blank page.
    pub fn reset(&mut self) {
        self.input.clear();
        self.phase = Phase::Idle;
        self.draft = None;
        self.sections = None;
        self.show_chips = false;
        self.active_tab = Slot::Acceptance;
        self.progress = None;
        self.previous_emotion = None;
        self.error = None;
    }
}

fn parse_sections(text: &str) -> RecommendationSections {
    let sections = recommendation::parse(text);
    if sections.is_empty() {
        tracing::warn!(len = text.len(), "recommendation has no recognised sections");
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> Submission {
        let mut s = Submission::new(Duration::from_millis(200));
        for c in text.chars() {
            s.input.insert(c);
        }
        s
    }

    fn sad_prediction() -> Prediction {
        Prediction {
            top_emotion: "슬픔".into(),
            emoji: "😢".into(),
            candidates: vec![
                EmotionCandidate {
                    emotion: "슬픔".into(),
                    emoji: "😢".into(),
                    score: 0.9,
                },
                EmotionCandidate {
                    emotion: "상처".into(),
                    emoji: "💔".into(),
                    score: 0.3,
                },
            ],
            recommendation: "## [수용]\nA\n## [전환]\nB".into(),
            top_score: 0.9,
        }
    }

    #[test]
    fn empty_text_cannot_be_submitted() {
        let mut s = typed("   ");
        assert!(!s.can_submit());
        assert!(s.submit().is_none());
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn prediction_moves_to_reviewing() {
        let mut s = typed("오늘 너무 슬펐다");
        let request = s.submit().unwrap();
        assert_eq!(
            request,
            SubmissionRequest::Predict {
                diary: "오늘 너무 슬펐다".into()
            }
        );
        assert_eq!(s.phase(), Phase::Analyzing);
        assert!(!s.can_save());

        s.apply_prediction(Ok(sad_prediction()));
        assert_eq!(s.phase(), Phase::Reviewing);
        assert!(s.chips_visible());
        assert!(s.can_save());
        assert_eq!(s.draft().unwrap().emotion.as_deref(), Some("슬픔"));
        assert_eq!(s.sections().unwrap().get(s.active_tab), "A");
        assert_eq!(s.progress().unwrap().percent(), 100);
    }

    #[test]
    fn confident_single_candidate_hides_chips() {
        let mut s = typed("좋은 하루");
        s.submit();
        let mut p = sad_prediction();
        p.candidates.truncate(1);
        p.top_score = 0.95;
        s.apply_prediction(Ok(p));
        assert!(!s.chips_visible());
    }

    #[test]
    fn same_chip_is_a_no_op() {
        let mut s = typed("오늘 너무 슬펐다");
        s.submit();
        s.apply_prediction(Ok(sad_prediction()));
        assert!(s.select_candidate("슬픔").is_none());
        assert_eq!(s.phase(), Phase::Reviewing);
    }

    #[test]
    fn chip_switch_regenerates_recommendation_only() {
        let mut s = typed("오늘 너무 슬펐다");
        s.submit();
        s.apply_prediction(Ok(sad_prediction()));

        let request = s.select_candidate("상처").unwrap();
        assert_eq!(
            request,
            SubmissionRequest::Recommend {
                diary: "오늘 너무 슬펐다".into(),
                emotion: "상처".into()
            }
        );
        assert_eq!(s.phase(), Phase::ChipSwitching);

        s.apply_recommendation(Ok("## [전환]\nC".into()));
        assert_eq!(s.phase(), Phase::Reviewing);
        let draft = s.draft().unwrap();
        assert_eq!(draft.candidates.len(), 2);
        assert_eq!(draft.emotion.as_deref(), Some("상처"));
        assert_eq!(s.sections().unwrap().diversion, "C");
        assert_eq!(s.sections().unwrap().acceptance, "");
    }

    #[test]
    fn prediction_error_reenables_submit() {
        let mut s = typed("오늘");
        s.submit();
        s.apply_prediction(Err(ApiError::Server("일기 내용이 없습니다.".into())));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.error(), Some("일기 내용이 없습니다."));
        assert!(s.can_submit());
        assert_eq!(s.input.text(), "오늘");
    }

    #[test]
    fn progress_caps_at_95_until_resolved() {
        let mut p = Progress::start("loading");
        for _ in 0..500 {
            p.advance(TICK);
        }
        assert_eq!(p.percent(), 95);
        p.finish();
        assert_eq!(p.percent(), 100);
        assert!(!p.is_running());
        p.advance(TICK);
        assert_eq!(p.percent(), 100);
    }

    #[test]
    fn progress_follows_elapsed_time_not_call_count() {
        let mut p = Progress::start("loading");
        for _ in 0..95 {
            p.advance(Duration::from_millis(1));
        }
        assert_eq!(p.percent(), 1);

        p.advance(Duration::from_millis(5));
        assert_eq!(p.percent(), 2);
        p.advance(Duration::from_millis(175));
        assert_eq!(p.percent(), 5);
    }

    #[test]
    fn failed_chip_switch_can_be_retried() {
        let mut s = typed("오늘 너무 슬펐다");
        s.submit();
        s.apply_prediction(Ok(sad_prediction()));

        s.select_candidate("상처").unwrap();
        s.apply_recommendation(Err(ApiError::Status(500)));
        assert_eq!(s.phase(), Phase::Reviewing);
        assert!(s.error().is_some());
        assert_eq!(s.draft().unwrap().emotion.as_deref(), Some("슬픔"));
        assert_eq!(s.sections().unwrap().acceptance, "A");

        let retry = s.select_candidate("상처");
        assert_eq!(
            retry,
            Some(SubmissionRequest::Recommend {
                diary: "오늘 너무 슬펐다".into(),
                emotion: "상처".into()
            })
        );
        s.apply_recommendation(Ok("## [수용]\nD".into()));
        assert_eq!(s.draft().unwrap().emotion.as_deref(), Some("상처"));
        assert!(s.error().is_none());
    }

    #[test]
    fn save_resets_only_after_animation() {
        let mut s = typed("오늘 너무 슬펐다");
        s.submit();
        s.apply_prediction(Ok(sad_prediction()));
        let request = s.save().unwrap();
        assert_eq!(
            request,
            SubmissionRequest::Save {
                diary: "오늘 너무 슬펐다".into(),
                emotion: "슬픔".into()
            }
        );

        s.apply_save(Ok(()));
        assert_eq!(s.phase(), Phase::Saving);
        assert!(!s.tick(Duration::from_millis(100)));
        assert!(s.tick(Duration::from_millis(100)));
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.input.text(), "");
        assert!(s.draft().is_none());
        assert_eq!(s.status, Some(Notice::Info(SAVED_MESSAGE.into())));
    }

    #[test]
    fn failed_save_keeps_draft_for_retry() {
        let mut s = typed("오늘 너무 슬펐다");
        s.submit();
        s.apply_prediction(Ok(sad_prediction()));
        s.save();
        s.tick(Duration::from_millis(500));
        s.apply_save(Err(ApiError::Server("로그인이 필요합니다.".into())));
        assert_eq!(s.phase(), Phase::Reviewing);
        assert!(s.animation().is_none());
        assert_eq!(s.input.text(), "오늘 너무 슬펐다");
        assert!(matches!(&s.status, Some(Notice::Error(m)) if m.contains("로그인이 필요합니다.")));
        assert!(s.save().is_some());
    }

    #[test]
    fn text_input_handles_multibyte_cursor() {
        let mut input = TextInput::default();
        for c in "슬픔".chars() {
            input.insert(c);
        }
        input.left();
        input.insert('X');
        assert_eq!(input.text(), "슬X픔");
        assert_eq!(input.before_cursor(), "슬X");
        input.backspace();
        input.delete();
        assert_eq!(input.text(), "슬");
    }
}
