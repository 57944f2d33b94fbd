//! Month/year navigation, the per-month caches and everything the calendar
//! screen does with them.

use crate::api::ApiError;
use crate::diary_entry::DiaryEntry;
use crate::diary_state::{MonthlyCountCache, MonthlyDiaryCache};
use crate::emotion::{self, EmotionDescriptor};
use crate::timeline::{DetailView, TimelineView};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::HashMap;

pub const LOAD_ERROR_MESSAGE: &str = "일기를 불러오는 중 오류가 발생했습니다.";
pub const CONFIRM_DELETE_MESSAGE: &str = "정말로 이 일기를 삭제하시겠습니까?";

/// Identifies one month fetch so late answers can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthTag {
    pub year: i32,
    pub month: u32,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarRequest {
    Counts { year: i32 },
    MonthDiaries(MonthTag),
    Delete { id: String, date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub message: String,
    pub detail: String,
}

pub struct CalendarController {
    today: NaiveDate,
    year: i32,
    month: u32,
    selected: NaiveDate,
    diaries: MonthlyDiaryCache,
    counts: MonthlyCountCache,
    counts_in_flight: Option<i32>,
    generation: u64,
    loading: bool,
    load_error: Option<LoadError>,
    cursor: usize,
    detail: Option<DetailView>,
    confirm: Option<PendingDelete>,
    deleting: Option<PendingDelete>,
    alert: Option<String>,
}

impl CalendarController {
    pub fn new(today: NaiveDate) -> Self {
        CalendarController {
            today,
            year: today.year(),
            month: today.month(),
            selected: today,
            diaries: MonthlyDiaryCache::new(),
            counts: MonthlyCountCache::new(),
            counts_in_flight: None,
            generation: 0,
            loading: false,
            load_error: None,
            cursor: 0,
            detail: None,
            confirm: None,
            deleting: None,
            alert: None,
        }
    }

    /// First load: today's year counts and today's month.
    pub fn mount(&mut self) -> Vec<CalendarRequest> {
        self.show(self.today)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.load_error.as_ref()
    }

    pub fn diaries(&self) -> &MonthlyDiaryCache {
        &self.diaries
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    pub fn detail_mut(&mut self) -> Option<&mut DetailView> {
        self.detail.as_mut()
    }

    pub fn confirm(&self) -> Option<&PendingDelete> {
        self.confirm.as_ref()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn navigate_month(&mut self, delta: i32) -> Vec<CalendarRequest> {
        let first = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(self.today);
        let shifted = if delta >= 0 {
            first.checked_add_months(Months::new(delta.unsigned_abs()))
        } else {
            first.checked_sub_months(Months::new(delta.unsigned_abs()))
        };
        match shifted {
            Some(first) => self.show(clamp_day(first.year(), first.month(), self.selected.day())),
            None => Vec::new(),
        }
    }

    pub fn navigate_year(&mut self, delta: i32) -> Vec<CalendarRequest> {
        self.navigate_month(delta.saturating_mul(12))
    }

    /// Shows `month` (1-12) of the visible year, keeping the day where possible.
    pub fn jump_to_month(&mut self, month: u32) -> Vec<CalendarRequest> {
        if !(1..=12).contains(&month) || month == self.month {
            return Vec::new();
        }
        self.show(clamp_day(self.year, month, self.selected.day()))
    }

    pub fn jump_to_today(&mut self) -> Vec<CalendarRequest> {
        self.show(self.today)
    }

    /// Moves the selected day; leaving the month navigates to the new one.
    pub fn move_selection(&mut self, days: i64) -> Vec<CalendarRequest> {
        let Some(target) = self
            .selected
            .checked_add_signed(chrono::Duration::days(days))
        else {
            return Vec::new();
        };
        if target.year() == self.year && target.month() == self.month {
            self.select(target);
            Vec::new()
        } else {
            self.show(target)
        }
    }

    fn select(&mut self, date: NaiveDate) {
        if self.selected != date {
            self.cursor = 0;
            self.detail = None;
        }
        self.selected = date;
    }

    fn show(&mut self, date: NaiveDate) -> Vec<CalendarRequest> {
        self.select(date);
        self.year = date.year();
        self.month = date.month();
        let mut requests = Vec::with_capacity(2);
        requests.extend(self.load_monthly_counts(self.year));
        requests.push(self.load_month_diaries(self.year, self.month));
        requests
    }

    /// Count badges are fetched once per year; repeated calls for the year
    /// already loaded (or already in flight) issue nothing.
    pub fn load_monthly_counts(&mut self, year: i32) -> Option<CalendarRequest> {
        if self.counts.year() == Some(year) || self.counts_in_flight == Some(year) {
            return None;
        }
        self.counts_in_flight = Some(year);
        Some(CalendarRequest::Counts { year })
    }

    pub fn apply_counts(&mut self, year: i32, result: Result<HashMap<u32, u32>, ApiError>) {
        if self.counts_in_flight == Some(year) {
            self.counts_in_flight = None;
        }
        match result {
            Ok(counts) if year == self.year => self.counts.replace(year, counts),
            Ok(_) => tracing::debug!(year, visible = self.year, "dropping counts for hidden year"),
            Err(e) => tracing::error!(year, error = %e, "failed to load diary counts"),
        }
    }

    pub fn load_month_diaries(&mut self, year: i32, month: u32) -> CalendarRequest {
        self.generation += 1;
        self.loading = true;
        CalendarRequest::MonthDiaries(MonthTag {
            year,
            month,
            generation: self.generation,
        })
    }

    /// Installs a month's entries unless a newer fetch has superseded `tag`.
    pub fn apply_month_diaries(
        &mut self,
        tag: MonthTag,
        result: Result<Vec<DiaryEntry>, ApiError>,
    ) -> usize {
        if tag.generation != self.generation || (tag.year, tag.month) != (self.year, self.month) {
            tracing::debug!(?tag, current = self.generation, "dropping stale month response");
            return 0;
        }
        self.loading = false;
        let entries = match result {
            Ok(entries) => {
                self.load_error = None;
                entries
            }
            Err(e) => {
                tracing::error!(year = tag.year, month = tag.month, error = %e, "failed to load diaries");
                self.load_error = Some(LoadError {
                    message: LOAD_ERROR_MESSAGE.to_string(),
                    detail: e.user_message(),
                });
                Vec::new()
            }
        };
        let loaded = entries.len();
        self.diaries = MonthlyDiaryCache::rebuild(tag.year, tag.month, entries);
        self.clamp_cursor();
        self.refresh_detail();
        loaded
    }

    /// Emotion shown on a day cell: that of the day's latest entry.
    pub fn day_indicator(&self, date: NaiveDate) -> Option<&'static EmotionDescriptor> {
        self.diaries
            .latest_on(date)
            .map(|entry| emotion::describe(&entry.emotion))
    }

    pub fn month_badge(&self, month: u32) -> Option<u32> {
        if self.counts.year() != Some(self.year) {
            return None;
        }
        Some(self.counts.count(month)).filter(|c| *c > 0)
    }

    pub fn timeline(&self) -> TimelineView {
        TimelineView::for_date(&self.diaries, self.selected)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.diaries.entries_on(self.selected).len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_cursor(&mut self) {
        let len = self.diaries.entries_on(self.selected).len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    fn entry_at_cursor(&self) -> Option<&DiaryEntry> {
        self.diaries.entries_on(self.selected).get(self.cursor)
    }

    pub fn open_detail(&mut self) {
        self.detail = self.entry_at_cursor().cloned().map(DetailView::open);
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    fn refresh_detail(&mut self) {
        let Some(open) = self.detail.as_ref() else {
            return;
        };
        let id = open.entry.id.clone();
        if !self.diaries.entries_on(self.selected).iter().any(|e| e.id == id) {
            self.detail = None;
        }
    }

    /// Asks for confirmation before deleting the entry under the cursor.
    pub fn request_delete(&mut self) {
        if self.deleting.is_some() {
            return;
        }
        let target = self
            .detail
            .as_ref()
            .map(|d| d.entry.clone())
            .or_else(|| self.entry_at_cursor().cloned());
        if let Some(entry) = target {
            self.confirm = Some(PendingDelete {
                id: entry.id,
                date: entry.date,
            });
        }
    }

    pub fn cancel_delete(&mut self) {
        self.confirm = None;
    }

    pub fn confirm_delete(&mut self) -> Option<CalendarRequest> {
        let pending = self.confirm.take()?;
        self.deleting = Some(pending.clone());
        Some(CalendarRequest::Delete {
            id: pending.id,
            date: pending.date,
        })
    }

    pub fn apply_delete(&mut self, id: &str, date: NaiveDate, result: Result<(), ApiError>) {
        if self.deleting.as_ref().is_some_and(|d| d.id == id) {
            self.deleting = None;
        }
        match result {
            Ok(()) => {
                if self.diaries.delete_entry(date, id).is_some() {
                    self.counts.decrement(date.year(), date.month());
                }
                if self.detail.as_ref().is_some_and(|d| d.entry.id == id) {
                    self.detail = None;
                }
                self.clamp_cursor();
                tracing::info!(id, %date, "diary deleted");
            }
            Err(e) => {
                tracing::error!(id, error = %e, "delete failed");
                self.alert = Some(e.user_message());
            }
        }
    }
}

fn clamp_day(year: i32, month: u32, day: u32) -> NaiveDate {
    (1..=day.max(1))
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .unwrap_or_default()
}

/// Dates shown on a Sunday-first month grid; `None` pads the first week.
pub fn month_grid(year: i32, month: u32) -> Vec<Option<NaiveDate>> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let lead = first.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<Option<NaiveDate>> = vec![None; lead];
    cells.extend(first.iter_days().take_while(|d| d.month() == month).map(Some));
    cells
}
