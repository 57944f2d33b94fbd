//! Application state and the request/response plumbing between the UI task
//! and spawned network calls.

use crate::api::{ApiResult, DiaryApi, Prediction};
use crate::calendar::{CalendarController, CalendarRequest, MonthTag};
use crate::config::SettingsStore;
use crate::diary_entry::DiaryEntry;
use crate::onboarding::{Onboarding, OnboardingOutcome};
use crate::submission::{Submission, SubmissionRequest};
use crate::theme::ThemeSwitcher;
use crate::transition::{Curtain, NavMarker, Screen};
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Calendar(CalendarRequest),
    Submission(SubmissionRequest),
    UpdateNickname(String),
}

#[derive(Debug)]
pub enum Response {
    Counts {
        year: i32,
        result: ApiResult<HashMap<u32, u32>>,
    },
    MonthDiaries {
        tag: MonthTag,
        result: ApiResult<Vec<DiaryEntry>>,
    },
    Deleted {
        id: String,
        date: NaiveDate,
        result: ApiResult<()>,
    },
    Prediction(ApiResult<Prediction>),
    Recommendation(ApiResult<String>),
    Saved(ApiResult<()>),
    Nickname(ApiResult<()>),
}

/// Performs one request against the server.
pub async fn execute(api: &dyn DiaryApi, request: Request) -> Response {
    match request {
        Request::Calendar(CalendarRequest::Counts { year }) => Response::Counts {
            year,
            result: api.monthly_counts(year).await,
        },
        Request::Calendar(CalendarRequest::MonthDiaries(tag)) => Response::MonthDiaries {
            tag,
            result: api.month_diaries(tag.year, tag.month).await,
        },
        Request::Calendar(CalendarRequest::Delete { id, date }) => {
            let result = api.delete_diary(&id).await;
            Response::Deleted { id, date, result }
        }
        Request::Submission(SubmissionRequest::Predict { diary }) => {
            Response::Prediction(api.predict(&diary).await)
        }
        Request::Submission(SubmissionRequest::Recommend { diary, emotion }) => {
            Response::Recommendation(api.recommend(&diary, &emotion).await)
        }
        Request::Submission(SubmissionRequest::Save { diary, emotion }) => {
            Response::Saved(api.save_diary(&diary, &emotion).await)
        }
        Request::UpdateNickname(nickname) => {
            Response::Nickname(api.update_nickname(&nickname).await)
        }
    }
}

pub struct App {
    pub screen: Screen,
    pub curtain: Option<Curtain>,
    pub nav: NavMarker,
    pub calendar: CalendarController,
    pub submission: Submission,
    pub onboarding: Option<Onboarding>,
    pub themes: ThemeSwitcher,
    settings: SettingsStore,
    calendar_mounted: bool,
    should_quit: bool,
}

impl App {
    pub fn new(settings: SettingsStore, today: NaiveDate) -> Self {
        let themes = ThemeSwitcher::restore(&settings.get().theme);
        let onboarding = (!settings.get().onboarding_complete).then(Onboarding::new);
        App {
            screen: Screen::Write,
            curtain: None,
            nav: NavMarker::default(),
            calendar: CalendarController::new(today),
            submission: Submission::new(settings.get().save_animation()),
            onboarding,
            themes,
            settings,
            calendar_mounted: false,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn apply(&mut self, response: Response) {
        match response {
            Response::Counts { year, result } => self.calendar.apply_counts(year, result),
            Response::MonthDiaries { tag, result } => {
                self.calendar.apply_month_diaries(tag, result);
            }
            Response::Deleted { id, date, result } => {
                self.calendar.apply_delete(&id, date, result)
            }
            Response::Prediction(result) => self.submission.apply_prediction(result),
            Response::Recommendation(result) => self.submission.apply_recommendation(result),
            Response::Saved(result) => self.submission.apply_save(result),
            Response::Nickname(result) => match result {
                Ok(()) => tracing::info!("nickname updated"),
                Err(e) => tracing::warn!(error = %e, "nickname update failed"),
            },
        }
    }

    pub fn tick(&mut self, elapsed: Duration) -> Vec<Request> {
        self.submission.tick(elapsed);
        let revealed = self.curtain.as_mut().and_then(|c| c.advance(elapsed));
        match revealed {
            Some(target) => {
                self.curtain = None;
                self.enter(target)
            }
            None => Vec::new(),
        }
    }

    fn enter(&mut self, screen: Screen) -> Vec<Request> {
        self.screen = screen;
        self.nav.leave();
        if screen == Screen::Calendar && !self.calendar_mounted {
            self.calendar_mounted = true;
            return wrap_calendar(self.calendar.mount());
        }
        Vec::new()
    }

    pub fn switch_to(&mut self, target: Screen) {
        if self.screen == target || self.curtain.is_some() {
            return;
        }
        self.nav.hover(target.index());
        self.curtain = Some(Curtain::drop_to(target));
    }

    fn cycle_theme(&mut self) {
        let selection = self.themes.next();
        tracing::info!(theme = %selection.name, "theme changed");
        self.settings.update(|s| s.theme = selection);
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, width: u16) {
        if !matches!(mouse.kind, MouseEventKind::Moved) {
            return;
        }
        if mouse.row == 0 && width > 0 {
            let tab = usize::from(mouse.column) * Screen::ALL.len() / usize::from(width);
            self.nav.hover(tab);
        } else {
            self.nav.leave();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Request> {
        if self.onboarding.is_some() {
            return self.handle_onboarding_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') if ctrl => {
                self.should_quit = true;
                return Vec::new();
            }
            KeyCode::Char('t') if ctrl => {
                self.cycle_theme();
                return Vec::new();
            }
            KeyCode::F(1) => {
                self.switch_to(Screen::Write);
                return Vec::new();
            }
            KeyCode::F(2) => {
                self.switch_to(Screen::Calendar);
                return Vec::new();
            }
            _ => {}
        }
        if self.curtain.is_some() {
            return Vec::new();
        }

        match self.screen {
            Screen::Write => self.handle_write_key(key),
            Screen::Calendar => self.handle_calendar_key(key),
        }
    }

    fn handle_onboarding_key(&mut self, key: KeyEvent) -> Vec<Request> {
        let Some(onboarding) = self.onboarding.as_mut() else {
            return Vec::new();
        };
        let outcome = match key.code {
            KeyCode::Esc => onboarding.close(),
            KeyCode::Enter => onboarding.next(),
            KeyCode::Right if !onboarding.is_last() => onboarding.next(),
            KeyCode::Left if !onboarding.is_last() => {
                onboarding.previous();
                OnboardingOutcome::Stay
            }
            KeyCode::PageUp => {
                onboarding.previous();
                OnboardingOutcome::Stay
            }
            KeyCode::Char(c) if onboarding.is_last() => {
                onboarding.nickname.insert(c);
                OnboardingOutcome::Stay
            }
            KeyCode::Char(c @ '1'..='9') => {
                onboarding.jump(c as usize - '1' as usize);
                OnboardingOutcome::Stay
            }
            KeyCode::Backspace if onboarding.is_last() => {
                onboarding.nickname.backspace();
                OnboardingOutcome::Stay
            }
            KeyCode::Left => {
                onboarding.nickname.left();
                OnboardingOutcome::Stay
            }
            KeyCode::Right => {
                onboarding.nickname.right();
                OnboardingOutcome::Stay
            }
            _ => OnboardingOutcome::Stay,
        };

        match outcome {
            OnboardingOutcome::Stay => Vec::new(),
            OnboardingOutcome::Finished { nickname } => {
                self.onboarding = None;
                self.settings.update(|s| s.onboarding_complete = true);
                nickname.map(Request::UpdateNickname).into_iter().collect()
            }
        }
    }

    fn handle_write_key(&mut self, key: KeyEvent) -> Vec<Request> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let request = match key.code {
            KeyCode::Char('r') if ctrl => self.submission.submit(),
            KeyCode::Char('s') if ctrl => self.submission.save(),
            KeyCode::Char('n') if ctrl => self.submission.cycle_candidate(1),
            KeyCode::Char('p') if ctrl => self.submission.cycle_candidate(-1),
            KeyCode::Tab | KeyCode::BackTab => {
                self.submission.switch_tab();
                None
            }
            _ if !self.submission.is_editable() => None,
            KeyCode::Char(c) if !ctrl => {
                self.submission.input.insert(c);
                None
            }
            KeyCode::Enter => {
                self.submission.input.insert('\n');
                None
            }
            KeyCode::Backspace => {
                self.submission.input.backspace();
                None
            }
            KeyCode::Delete => {
                self.submission.input.delete();
                None
            }
            KeyCode::Left => {
                self.submission.input.left();
                None
            }
            KeyCode::Right => {
                self.submission.input.right();
                None
            }
            _ => None,
        };
        request.map(Request::Submission).into_iter().collect()
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) -> Vec<Request> {
        let cal = &mut self.calendar;

        if cal.alert().is_some() {
            cal.dismiss_alert();
            return Vec::new();
        }
        if cal.confirm().is_some() {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    wrap_calendar(cal.confirm_delete().into_iter().collect())
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    cal.cancel_delete();
                    Vec::new()
                }
                _ => Vec::new(),
            };
        }
        if let Some(detail) = cal.detail_mut() {
            match key.code {
                KeyCode::Esc | KeyCode::Char('q') => cal.close_detail(),
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                    detail.switch_tab()
                }
                KeyCode::Down | KeyCode::Char('j') => detail.scroll_by(1),
                KeyCode::Up | KeyCode::Char('k') => detail.scroll_by(-1),
                KeyCode::PageDown => detail.scroll_by(10),
                KeyCode::PageUp => detail.scroll_by(-10),
                KeyCode::Char('d') => cal.request_delete(),
                _ => {}
            }
            return Vec::new();
        }

        let requests = match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('t') => {
                self.cycle_theme();
                Vec::new()
            }
            KeyCode::Left | KeyCode::Char('h') => cal.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => cal.move_selection(1),
            KeyCode::Up => cal.move_selection(-7),
            KeyCode::Down => cal.move_selection(7),
            KeyCode::Char('[') => cal.navigate_month(-1),
            KeyCode::Char(']') => cal.navigate_month(1),
            KeyCode::Char('{') => cal.navigate_year(-1),
            KeyCode::Char('}') => cal.navigate_year(1),
            KeyCode::Char('.') => cal.jump_to_today(),
            KeyCode::Char(c @ '1'..='9') => cal.jump_to_month(c as u32 - '0' as u32),
            KeyCode::Char('0') => cal.jump_to_month(10),
            KeyCode::Char('-') => cal.jump_to_month(11),
            KeyCode::Char('=') => cal.jump_to_month(12),
            KeyCode::Char('j') => {
                cal.move_cursor(1);
                Vec::new()
            }
            KeyCode::Char('k') => {
                cal.move_cursor(-1);
                Vec::new()
            }
            KeyCode::Enter => {
                cal.open_detail();
                Vec::new()
            }
            KeyCode::Char('d') => {
                cal.request_delete();
                Vec::new()
            }
            _ => Vec::new(),
        };
        wrap_calendar(requests)
    }
}

fn wrap_calendar(requests: Vec<CalendarRequest>) -> Vec<Request> {
    requests.into_iter().map(Request::Calendar).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::config::Settings;
    use crate::diary_entry::EmotionCandidate;
    use crate::recommendation::Slot;
    use crate::submission::Phase;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Canned server; records every call it receives.
    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        delete_error: Option<String>,
    }

    impl FakeApi {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DiaryApi for FakeApi {
        async fn monthly_counts(&self, year: i32) -> ApiResult<HashMap<u32, u32>> {
            self.record(format!("counts {year}"));
            Ok(HashMap::from([(3, 1)]))
        }

        async fn month_diaries(&self, year: i32, month: u32) -> ApiResult<Vec<DiaryEntry>> {
            self.record(format!("diaries {year}-{month}"));
            Ok(crate::api::entries_from_values(vec![serde_json::json!({
                "id": "e1",
                "date": format!("{year}-{month:02}-10"),
                "createdAt": format!("{year}-{month:02}-10T09:00:00"),
                "content": "비 오는 날",
                "emotion": "슬픔"
            })]))
        }

        async fn delete_diary(&self, id: &str) -> ApiResult<()> {
            self.record(format!("delete {id}"));
            match &self.delete_error {
                Some(message) => Err(ApiError::Server(message.clone())),
                None => Ok(()),
            }
        }

        async fn predict(&self, diary: &str) -> ApiResult<Prediction> {
            self.record(format!("predict {diary}"));
            Ok(Prediction {
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
            })
        }

        async fn recommend(&self, diary: &str, emotion: &str) -> ApiResult<String> {
            self.record(format!("recommend {diary} {emotion}"));
            Ok(format!("## [수용]\n{emotion} A\n## [전환]\n{emotion} B"))
        }

        async fn save_diary(&self, diary: &str, emotion: &str) -> ApiResult<()> {
            self.record(format!("save {diary} {emotion}"));
            Ok(())
        }

        async fn update_nickname(&self, nickname: &str) -> ApiResult<()> {
            self.record(format!("nickname {nickname}"));
            Ok(())
        }
    }

    fn app(onboarded: bool) -> App {
        let settings = Settings {
            onboarding_complete: onboarded,
            save_animation_ms: 100,
            ..Settings::default()
        };
        App::new(
            SettingsStore::new(None, settings),
            "2025-03-10".parse().unwrap(),
        )
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Runs requests in order, feeding responses back like the event loop.
    async fn pump(app: &mut App, api: &FakeApi, requests: Vec<Request>) {
        for request in requests {
            let response = execute(api, request).await;
            app.apply(response);
        }
    }

    #[tokio::test]
    async fn analyze_then_switch_chip_then_save() {
        let api = FakeApi::default();
        let mut app = app(true);
        for c in "오늘 너무 슬펐다".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }

        let requests = app.handle_key(ctrl('r'));
        assert_eq!(app.submission.phase(), Phase::Analyzing);
        pump(&mut app, &api, requests).await;

        let s = &app.submission;
        assert_eq!(s.phase(), Phase::Reviewing);
        assert!(s.chips_visible());
        let draft = s.draft().unwrap();
        let badges: Vec<_> = draft.candidates.iter().map(|c| c.percent()).collect();
        assert_eq!(badges, [90, 30]);
        assert_eq!(draft.emotion.as_deref(), Some("슬픔"));
        assert_eq!(s.active_tab, Slot::Acceptance);
        assert_eq!(s.sections().unwrap().get(s.active_tab), "A");

        app.handle_key(key(KeyCode::Tab));
        let s = &app.submission;
        assert_eq!(s.sections().unwrap().get(s.active_tab), "B");

        let requests = app.handle_key(ctrl('n'));
        pump(&mut app, &api, requests).await;
        let s = &app.submission;
        assert_eq!(s.draft().unwrap().emotion.as_deref(), Some("상처"));
        assert_eq!(s.sections().unwrap().acceptance, "상처 A");

        let requests = app.handle_key(ctrl('s'));
        pump(&mut app, &api, requests).await;
        app.tick(Duration::from_millis(150));
        assert_eq!(app.submission.phase(), Phase::Idle);
        assert_eq!(app.submission.input.text(), "");

        assert_eq!(
            api.calls(),
            [
                "predict 오늘 너무 슬펐다",
                "recommend 오늘 너무 슬펐다 상처",
                "save 오늘 너무 슬펐다 상처",
            ]
        );
    }

    #[tokio::test]
    async fn calendar_mounts_after_curtain_and_deletes() {
        let api = FakeApi::default();
        let mut app = app(true);

        app.handle_key(key(KeyCode::F(2)));
        assert_eq!(app.screen, Screen::Write);
        let requests = app.tick(Duration::from_millis(400));
        assert_eq!(app.screen, Screen::Calendar);
        pump(&mut app, &api, requests).await;

        let mut calls = api.calls();
        calls.sort();
        assert_eq!(calls, ["counts 2025", "diaries 2025-3"]);
        assert_eq!(app.calendar.timeline().len(), 1);

        app.handle_key(key(KeyCode::Char('d')));
        let requests = app.handle_key(key(KeyCode::Char('y')));
        pump(&mut app, &api, requests).await;
        assert!(app.calendar.timeline().is_empty());
        assert!(app
            .calendar
            .day_indicator("2025-03-10".parse().unwrap())
            .is_none());
    }

    #[tokio::test]
    async fn rejected_delete_surfaces_server_message() {
        let api = FakeApi {
            delete_error: Some("not found".into()),
            ..FakeApi::default()
        };
        let mut app = app(true);
        app.switch_to(Screen::Calendar);
        let requests = app.tick(Duration::from_secs(1));
        pump(&mut app, &api, requests).await;

        app.handle_key(key(KeyCode::Char('d')));
        let requests = app.handle_key(key(KeyCode::Enter));
        pump(&mut app, &api, requests).await;

        assert_eq!(app.calendar.alert(), Some("not found"));
        assert_eq!(app.calendar.timeline().len(), 1);
        app.handle_key(key(KeyCode::Char('x')));
        assert!(app.calendar.alert().is_none());
    }

    #[tokio::test]
    async fn onboarding_sends_nickname_and_completes() {
        let api = FakeApi::default();
        let mut app = app(false);
        assert!(app.onboarding.is_some());
        for _ in 0..3 {
            app.handle_key(key(KeyCode::Enter));
        }
        for c in "별".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        let requests = app.handle_key(key(KeyCode::Enter));
        assert!(app.onboarding.is_none());
        pump(&mut app, &api, requests).await;
        assert_eq!(api.calls(), ["nickname 별"]);
    }

    #[test]
    fn theme_cycles_from_calendar() {
        let mut app = app(true);
        app.screen = Screen::Calendar;
        let before = app.themes.current().name;
        app.handle_key(key(KeyCode::Char('t')));
        assert_ne!(app.themes.current().name, before);
    }

    #[test]
    fn typing_is_blocked_while_analyzing() {
        let mut app = app(true);
        app.handle_key(key(KeyCode::Char('a')));
        app.handle_key(ctrl('r'));
        app.handle_key(key(KeyCode::Char('b')));
        assert_eq!(app.submission.input.text(), "a");
    }
}
