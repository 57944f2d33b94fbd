use crate::diary_entry::DiaryEntry;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Entries of one visible month, bucketed by day and sorted by creation time.
#[derive(Debug, Default, Clone)]
pub struct MonthlyDiaryCache {
    by_date: BTreeMap<NaiveDate, Vec<DiaryEntry>>,
}

impl MonthlyDiaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole cache with `entries` for `(year, month)`.
    pub fn rebuild(year: i32, month: u32, entries: Vec<DiaryEntry>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<DiaryEntry>> = BTreeMap::new();
        for entry in entries {
            if entry.date.year() != year || entry.date.month() != month {
                tracing::debug!(id = %entry.id, date = %entry.date, "entry outside requested month");
            }
            by_date.entry(entry.date).or_default().push(entry);
        }
        for bucket in by_date.values_mut() {
            bucket.sort_by_key(|e| e.created_at);
        }
        MonthlyDiaryCache { by_date }
    }

    pub fn entries_on(&self, date: NaiveDate) -> &[DiaryEntry] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest_on(&self, date: NaiveDate) -> Option<&DiaryEntry> {
        self.by_date
            .get(&date)
            .and_then(|bucket| bucket.iter().max_by_key(|e| e.created_at))
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    /// Removes entry `id` from `date`'s bucket, dropping the bucket once empty.
    pub fn delete_entry(&mut self, date: NaiveDate, id: &str) -> Option<DiaryEntry> {
        let bucket = self.by_date.get_mut(&date)?;
        let index = bucket.iter().position(|e| e.id == id)?;
        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.by_date.remove(&date);
        }
        Some(removed)
    }
}

/// Per-month entry counts for the year currently on screen.
#[derive(Debug, Default, Clone)]
pub struct MonthlyCountCache {
    year: Option<i32>,
    counts: HashMap<u32, u32>,
}

impl MonthlyCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, year: i32, counts: HashMap<u32, u32>) {
        self.year = Some(year);
        self.counts = counts;
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn count(&self, month: u32) -> u32 {
        self.counts.get(&month).copied().unwrap_or(0)
    }

    pub fn decrement(&mut self, year: i32, month: u32) {
        if self.year != Some(year) {
            return;
        }
        if let Some(count) = self.counts.get_mut(&month) {
            *count = count.saturating_sub(1);
        }
    }
}
