use crate::app::App;
use crate::calendar::{self, CalendarController, CONFIRM_DELETE_MESSAGE};
use crate::markdown;
use crate::onboarding::{Onboarding, SLIDES};
use crate::recommendation::Slot;
use crate::submission::{Notice, Phase, SaveAnimation, Submission};
use crate::theme::Theme;
use crate::timeline::{TimelineView, EMPTY_DAY_MESSAGE, UNAVAILABLE_MESSAGE};
use crate::transition::{Curtain, Screen};
use chrono::Datelike;
use color_eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::Duration,
};
use unicode_width::UnicodeWidthStr;

const WRITE_PLACEHOLDER: &str = "왼쪽 페이지에 분석할 일기를 작성해주세요.";

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI { terminal })
    }

    pub fn display(&mut self, app: &App) -> Result<()> {
        self.terminal.draw(|f| draw(f, app))?;
        Ok(())
    }

    pub fn width(&self) -> Result<u16> {
        Ok(self.terminal.size()?.width)
    }

    pub fn next_event(&self, timeout: Duration) -> Result<Option<Event>> {
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(DisableMouseCapture);
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    let theme = app.themes.current();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_nav(f, chunks[0], app, &theme);
    match app.screen {
        Screen::Write => draw_write(f, chunks[1], &app.submission, &theme),
        Screen::Calendar => draw_calendar(f, chunks[1], &app.calendar, &theme),
    }
    draw_controls(f, chunks[2], app, &theme);

    if let Some(curtain) = &app.curtain {
        draw_curtain(f, chunks[1], curtain, &theme);
    }
    if let Some(onboarding) = &app.onboarding {
        draw_onboarding(f, onboarding, &theme);
    }
}

fn draw_nav(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);
    let tabs = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(rows[0]);
    let markers = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)])
        .split(rows[1]);

    f.render_widget(
        Block::default().style(Style::default().bg(theme.background)),
        rows[0],
    );
    for screen in Screen::ALL {
        let i = screen.index();
        let mut style = Style::default().fg(Color::Black).bg(theme.background);
        if screen == app.screen {
            style = style.bg(theme.primary).add_modifier(Modifier::BOLD);
        }
        let title = Paragraph::new(format!("F{} {}", i + 1, screen.title()))
            .style(style)
            .alignment(Alignment::Center);
        f.render_widget(title, tabs[i]);

        if app.nav.position() == Some(i) {
            let width = screen.title().width() as u16 + 4;
            let marker = Paragraph::new("━".repeat(usize::from(width)))
                .style(Style::default().fg(theme.primary))
                .alignment(Alignment::Center);
            f.render_widget(marker, markers[i]);
        }
    }
}

fn draw_controls(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let hint = match app.screen {
        Screen::Write => {
            "Ctrl+R: 분석  Ctrl+S: 저장  Ctrl+N/P: 감정 선택  Tab: 수용/전환  Ctrl+T: 테마  Ctrl+Q: 종료"
        }
        Screen::Calendar if app.calendar.detail().is_some() => {
            "Tab: 수용/전환  ↑↓: 스크롤  d: 삭제  Esc: 닫기"
        }
        Screen::Calendar => {
            "←→↑↓: 날짜  [ ]: 월  1-0-=: 월 선택  { }: 연도  .: 오늘  j/k: 일기  Enter: 열기  d: 삭제  t: 테마  q: 종료"
        }
    };
    let line = Line::from(vec![
        Span::raw(hint),
        Span::styled(
            format!("  [{}]", theme.name),
            Style::default().fg(theme.primary),
        ),
    ]);
    let controls = Paragraph::new(line)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(controls, area);
}

fn draw_write(f: &mut Frame, area: Rect, submission: &Submission, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    match submission.animation() {
        Some(animation) => draw_save_animation(f, columns[0], animation),
        None => draw_input(f, columns[0], submission, theme),
    }

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(columns[1]);
    draw_result(f, right[0], submission, theme);

    if let Some(notice) = &submission.status {
        let (text, color) = match notice {
            Notice::Info(text) => (text.as_str(), theme.primary),
            Notice::Error(text) => (text.as_str(), Color::Red),
        };
        f.render_widget(
            Paragraph::new(text).style(Style::default().fg(color)),
            right[1],
        );
    }
}

fn draw_input(f: &mut Frame, area: Rect, submission: &Submission, theme: &Theme) {
    let title = match submission.phase() {
        Phase::Analyzing | Phase::ChipSwitching => "오늘의 일기 (분석 중)",
        Phase::Reviewing if submission.can_save() => "오늘의 일기 (Ctrl+S로 저장)",
        _ if submission.can_submit() => "오늘의 일기 (Ctrl+R로 분석)",
        _ => "오늘의 일기",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.primary))
        .title(title);
    let text = submission.input.text();
    let inner = block.inner(area);
    f.render_widget(Paragraph::new(text).block(block), area);

    if submission.is_editable() {
        let before = submission.input.before_cursor();
        let row = before.matches('\n').count() as u16;
        let col = before.rsplit('\n').next().unwrap_or("").width() as u16;
        if row < inner.height && col < inner.width {
            f.set_cursor_position((inner.x + col, inner.y + row));
        }
    }
}

fn draw_result(f: &mut Frame, area: Rect, submission: &Submission, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.primary))
        .title("분석 결과");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if let Some(progress) = submission.progress().filter(|p| p.is_running()) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);
        f.render_widget(
            Paragraph::new(progress.label())
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center),
            rows[0],
        );
        f.render_widget(
            Gauge::default()
                .gauge_style(Style::default().fg(theme.primary).bg(Color::DarkGray))
                .percent(progress.percent()),
            rows[1],
        );
        return;
    }

    let mut inner = inner;
    if let Some(error) = submission.error() {
        let error = Paragraph::new(format!("오류: {error}"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false });
        if submission.sections().is_none() {
            f.render_widget(error, inner);
            return;
        }
        f.render_widget(error, Rect { height: 1.min(inner.height), ..inner });
        inner.y += 1.min(inner.height);
        inner.height = inner.height.saturating_sub(1);
    }

    let Some(sections) = submission.sections() else {
        f.render_widget(
            Paragraph::new(WRITE_PLACEHOLDER)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: false }),
            inner,
        );
        return;
    };

    let chips_height = if submission.chips_visible() { 2 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(chips_height),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    if let Some(draft) = submission.draft().filter(|_| submission.chips_visible()) {
        let mut spans = Vec::new();
        for candidate in &draft.candidates {
            let active = draft.emotion.as_deref() == Some(candidate.emotion.as_str());
            let style = if active {
                Style::default()
                    .fg(Color::Black)
                    .bg(theme.primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.primary)
            };
            spans.push(Span::styled(
                format!(
                    " {} {} {}% ",
                    candidate.emoji,
                    candidate.emotion,
                    candidate.percent()
                ),
                style,
            ));
            spans.push(Span::raw(" "));
        }
        f.render_widget(
            Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
            rows[0],
        );
    }

    f.render_widget(recommendation_tabs(submission.active_tab, theme), rows[1]);

    let body = sections.get(submission.active_tab);
    let body = if body.is_empty() {
        UNAVAILABLE_MESSAGE
    } else {
        body
    };
    f.render_widget(
        Paragraph::new(markdown::render(body, theme.primary)).wrap(Wrap { trim: false }),
        rows[2],
    );
}

fn recommendation_tabs(active: Slot, theme: &Theme) -> Tabs<'static> {
    let selected = match active {
        Slot::Acceptance => 0,
        Slot::Diversion => 1,
    };
    Tabs::new(vec![Slot::Acceptance.title(), Slot::Diversion.title()])
        .select(selected)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )
        .divider("|")
}

/// The page folds into an orb that then drops into the tray.
fn draw_save_animation(f: &mut Frame, area: Rect, animation: &SaveAnimation) {
    const FOLD: f64 = 0.6;
    if area.is_empty() {
        return;
    }
    let tray_y = area.y + area.height.saturating_sub(1);
    f.render_widget(
        Paragraph::new("╰".to_string() + &"─".repeat(10) + "╯")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        Rect::new(area.x, tray_y, area.width, 1).intersection(area),
    );

    let t = animation.fraction();
    let (width, height, y) = if t < FOLD {
        let shrink = 1.0 - (t / FOLD) * 0.9;
        let w = ((f64::from(area.width) * shrink) as u16).max(4);
        let h = ((f64::from(area.height.saturating_sub(1)) * shrink) as u16).max(2);
        (w, h, area.y + area.height.saturating_sub(1).saturating_sub(h) / 2)
    } else {
        let w = 4u16.min(area.width);
        let h = 2u16.min(area.height);
        let start = area.y + area.height.saturating_sub(1).saturating_sub(h) / 2;
        let end = tray_y.saturating_sub(h);
        let drop = (t - FOLD) / (1.0 - FOLD);
        let y = start + ((f64::from(end.saturating_sub(start))) * drop) as u16;
        (w, h, y)
    };
    let x = area.x + area.width.saturating_sub(width) / 2;
    f.render_widget(
        Block::default().style(Style::default().bg(animation.orb)),
        Rect::new(x, y, width, height).intersection(area),
    );
}

fn draw_calendar(f: &mut Frame, area: Rect, cal: &CalendarController, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([
            Constraint::Length(16),
            Constraint::Length(38),
            Constraint::Min(20),
        ])
        .split(area);

    draw_month_list(f, columns[0], cal, theme);
    draw_month_grid(f, columns[1], cal, theme);
    draw_timeline(f, columns[2], cal, theme);

    if let Some(detail) = cal.detail() {
        let popup = centered(area, 80, 85);
        f.render_widget(Clear, popup);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.primary))
            .title(format!(
                "{} {}",
                detail.entry.date.format("%Y-%m-%d"),
                detail.entry.time_label()
            ));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let mut lines = vec![
            Line::styled(
                "나의 기록",
                Style::default()
                    .fg(theme.primary)
                    .add_modifier(Modifier::BOLD),
            ),
            Line::default(),
        ];
        lines.extend(detail.entry.content.lines().map(|l| Line::raw(l.to_string())));

        match detail.visible_body() {
            Some(body) => {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(lines.len() as u16 + 1),
                        Constraint::Length(2),
                        Constraint::Min(0),
                    ])
                    .split(inner);
                f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), rows[0]);
                f.render_widget(recommendation_tabs(detail.tab, theme), rows[1]);
                f.render_widget(
                    Paragraph::new(markdown::render(body, theme.primary))
                        .wrap(Wrap { trim: false })
                        .scroll((detail.scroll, 0)),
                    rows[2],
                );
            }
            None => f.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .scroll((detail.scroll, 0)),
                inner,
            ),
        }
    }

    if cal.confirm().is_some() {
        draw_dialog(f, area, CONFIRM_DELETE_MESSAGE, "y: 삭제   n: 취소", theme.primary);
    }
    if let Some(alert) = cal.alert() {
        draw_dialog(f, area, alert, "아무 키나 누르세요", Color::Red);
    }
}

fn draw_month_list(f: &mut Frame, area: Rect, cal: &CalendarController, theme: &Theme) {
    let items: Vec<ListItem> = (1..=12)
        .map(|month| {
            let badge = cal
                .month_badge(month)
                .map(|c| format!(" ({c})"))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::raw(format!("{month:>2}월")),
                Span::styled(badge, Style::default().fg(theme.primary)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("◀ {} ▶", cal.year())),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    f.render_stateful_widget(
        list,
        area,
        &mut ListState::default().with_selected(Some(cal.month() as usize - 1)),
    );
}

fn draw_month_grid(f: &mut Frame, area: Rect, cal: &CalendarController, theme: &Theme) {
    let title = chrono::NaiveDate::from_ymd_opt(cal.year(), cal.month(), 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    let title = if cal.is_loading() {
        format!("{title} · 불러오는 중")
    } else if cal.diaries().is_empty() {
        title
    } else {
        format!("{title} · {}편", cal.diaries().len())
    };

    let mut lines = vec![Line::styled(
        " 일   월   화   수   목   금   토",
        Style::default().fg(Color::Gray),
    )];
    let grid = calendar::month_grid(cal.year(), cal.month());
    for week in grid.chunks(7) {
        let spans: Vec<Span> = week
            .iter()
            .map(|cell| match cell {
                None => Span::raw("     "),
                Some(date) => {
                    let indicator = cal.day_indicator(*date);
                    let mut style = Style::default();
                    if let Some(emotion) = indicator {
                        style = style.fg(emotion.color).add_modifier(Modifier::BOLD);
                    }
                    if *date == cal.today() {
                        style = style.add_modifier(Modifier::UNDERLINED);
                    }
                    if *date == cal.selected() {
                        style = style.bg(theme.primary).fg(Color::Black);
                    }
                    let glyph = indicator.map(|e| e.glyph).unwrap_or("  ");
                    Span::styled(format!("{:>2}{} ", date.day(), glyph), style)
                }
            })
            .collect();
        lines.push(Line::from(spans));
        lines.push(Line::default());
    }

    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}

fn draw_timeline(f: &mut Frame, area: Rect, cal: &CalendarController, theme: &Theme) {
    let timeline = cal.timeline();
    let mut title = cal.selected().format("%Y-%m-%d").to_string();
    if !timeline.is_empty() {
        title.push_str(&format!(" · {}편", timeline.len()));
    }
    let block = Block::default().borders(Borders::ALL).title(title);

    if let Some(error) = cal.load_error() {
        let text = vec![
            Line::styled(error.message.clone(), Style::default().fg(Color::Red)),
            Line::styled(error.detail.clone(), Style::default().fg(Color::DarkGray)),
        ];
        f.render_widget(
            Paragraph::new(text)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: false }),
            area,
        );
        return;
    }

    match timeline {
        TimelineView::Empty => {
            f.render_widget(
                Paragraph::new(EMPTY_DAY_MESSAGE)
                    .style(Style::default().fg(Color::Gray))
                    .block(block)
                    .alignment(Alignment::Center),
                area,
            );
        }
        TimelineView::Entries(items) => {
            let items: Vec<ListItem> = items
                .iter()
                .map(|item| {
                    ListItem::new(vec![
                        Line::from(vec![
                            Span::styled(
                                format!("[{}] ", item.time),
                                Style::default().fg(Color::Gray),
                            ),
                            Span::raw(item.emotion.glyph),
                            Span::styled(
                                format!(" {}", item.emotion.label),
                                Style::default().fg(item.emotion.color),
                            ),
                        ]),
                        Line::raw(format!("  {}", item.preview)),
                    ])
                })
                .collect();
            let list = List::new(items)
                .block(block)
                .highlight_style(
                    Style::default()
                        .fg(theme.primary)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            f.render_stateful_widget(
                list,
                area,
                &mut ListState::default().with_selected(Some(cal.cursor())),
            );
        }
    }
}

fn draw_dialog(f: &mut Frame, area: Rect, message: &str, hint: &str, color: Color) {
    let popup = centered(area, 50, 30);
    f.render_widget(Clear, popup);
    let text = vec![
        Line::default(),
        Line::styled(message.to_string(), Style::default().fg(color)),
        Line::default(),
        Line::styled(hint.to_string(), Style::default().fg(Color::Yellow)),
    ];
    f.render_widget(
        Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn draw_curtain(f: &mut Frame, area: Rect, curtain: &Curtain, theme: &Theme) {
    let height = (f64::from(area.height) * curtain.coverage()).ceil() as u16;
    let cover = Rect::new(area.x, area.y, area.width, height.min(area.height));
    f.render_widget(Clear, cover);
    f.render_widget(
        Block::default().style(Style::default().bg(theme.primary)),
        cover,
    );
}

fn draw_onboarding(f: &mut Frame, onboarding: &Onboarding, theme: &Theme) {
    let popup = centered(f.area(), 70, 60);
    f.render_widget(Clear, popup);
    let slide = onboarding.slide();

    let mut lines = vec![
        Line::styled(
            slide.title,
            Style::default()
                .fg(theme.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Line::default(),
    ];
    lines.extend(slide.body.lines().map(Line::raw));
    lines.push(Line::default());

    if onboarding.is_last() {
        lines.push(Line::from(vec![
            Span::raw("닉네임: "),
            Span::styled(
                format!("{}_", onboarding.nickname.text()),
                Style::default().add_modifier(Modifier::UNDERLINED),
            ),
        ]));
        lines.push(Line::default());
    }

    let dots: Vec<Span> = (0..SLIDES.len())
        .map(|i| {
            if i == onboarding.current() {
                Span::styled("● ", Style::default().fg(theme.primary))
            } else {
                Span::styled("○ ", Style::default().fg(Color::Gray))
            }
        })
        .collect();
    lines.push(Line::from(dots));

    let mut buttons = Vec::new();
    if onboarding.has_previous() {
        buttons.push(Span::raw("PgUp: 이전   "));
    }
    buttons.push(Span::styled(
        format!("Enter: {}", onboarding.next_label()),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    buttons.push(Span::raw("   Esc: 닫기"));
    lines.push(Line::from(buttons).style(Style::default().fg(Color::Yellow)));

    f.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(theme.primary)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false }),
        popup,
    );
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, Prediction};
    use crate::config::{Settings, SettingsStore};
    use crate::diary_entry::EmotionCandidate;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    fn render(app: &App) -> String {
        render_sized(app, 120, 40)
    }

    fn render_sized(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app(onboarded: bool) -> App {
        let settings = Settings {
            onboarding_complete: onboarded,
            ..Settings::default()
        };
        App::new(
            SettingsStore::new(None, settings),
            "2025-03-10".parse().unwrap(),
        )
    }

    #[test]
    fn write_screen_shows_placeholder_and_controls() {
        let screen = render(&app(true));
        assert!(screen.contains("Ctrl+R"));
        assert!(screen.contains("[default]"));
    }

    #[test]
    fn calendar_screen_renders_grid() {
        let mut app = app(true);
        app.screen = Screen::Calendar;
        let screen = render(&app);
        assert!(screen.contains("March 2025"));
        assert!(screen.contains("31"));
    }

    #[test]
    fn onboarding_overlay_and_curtain_render() {
        let mut app = app(false);
        render(&app);
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        app.switch_to(Screen::Calendar);
        app.tick(Duration::from_millis(100));
        render(&app);
        assert!(app.curtain.is_some());
    }

    fn reviewing(app: &mut App) {
        for c in "오늘 너무 슬펐다".chars() {
            app.submission.input.insert(c);
        }
        app.submission.submit();
        app.submission.apply_prediction(Ok(Prediction {
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
        }));
    }

    #[test]
    fn save_animation_fits_tiny_terminals() {
        for height in [3, 5, 7, 9] {
            let mut app = app(true);
            reviewing(&mut app);
            app.submission.save();
            for _ in 0..4 {
                render_sized(&app, 80, height);
                app.tick(Duration::from_millis(700));
            }
        }
    }

    #[test]
    fn failed_chip_switch_keeps_panel_with_error_line() {
        let mut app = app(true);
        reviewing(&mut app);
        app.submission.select_candidate("상처");
        app.submission.apply_recommendation(Err(ApiError::Status(500)));
        let screen = render(&app);
        assert!(screen.contains("(500)"));
        assert!(app.submission.sections().is_some());
    }

    #[test]
    fn input_title_follows_phase() {
        let mut app = app(true);
        for c in "오늘".chars() {
            app.submission.input.insert(c);
        }
        assert!(render(&app).contains("(Ctrl+R"));
        app.submission.submit();
        let screen = render(&app);
        assert!(screen.contains("(분"));
        assert!(!screen.contains("(Ctrl+R"));
        reviewing(&mut app);
        assert!(render(&app).contains("(Ctrl+S"));
    }

    #[test]
    fn timeline_title_counts_entries_for_the_day() {
        use crate::calendar::CalendarRequest;
        use crate::diary_entry::parse_timestamp;

        let mut app = app(true);
        app.screen = Screen::Calendar;
        let CalendarRequest::MonthDiaries(tag) = app.calendar.load_month_diaries(2025, 3) else {
            panic!("expected a month request");
        };
        let entry = |id: &str, created: &str| crate::diary_entry::DiaryEntry {
            id: id.into(),
            date: "2025-03-10".parse().unwrap(),
            created_at: parse_timestamp(created).unwrap(),
            content: id.into(),
            emotion: String::new(),
            recommendation: None,
        };
        app.calendar.apply_month_diaries(
            tag,
            Ok(vec![
                entry("a", "2025-03-10T09:00:00"),
                entry("b", "2025-03-10T21:00:00"),
            ]),
        );
        let screen = render(&app);
        assert!(screen.contains("2025-03-10 · 2"));
        assert!(screen.contains("🤔"));
    }
}
