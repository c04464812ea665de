use crate::intake::aggregate::{DayStatus, DaySummary, summarize_day, total_intake};
use crate::intake::goal::{UserProfile, calculate_daily_goal};
use crate::intake::migrate::migrate;
use crate::intake::{DrinkEntry, DrinkKind, EntryError, WaterIntakeRecord, date_key};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

pub trait ProfileProvider {
    fn current_profile(&self) -> Option<UserProfile>;
}

pub trait Clock {
    /// Current time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: String,
    pub total: u64,
    pub goal: u32,
    pub status: DayStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub date: String,
    pub total: u64,
    pub goal: u32,
    pub entries: usize,
    pub status: DayStatus,
}

/// Owns the live record collection. Every mutation is followed by a full
/// persist through the [`RecordStore`].
pub struct DayRecordManager {
    store: RecordStore,
    profiles: Box<dyn ProfileProvider + Send + Sync>,
    clock: Box<dyn Clock + Send + Sync>,
    records: Vec<WaterIntakeRecord>,
    selected: NaiveDate,
}

impl DayRecordManager {
    /// Loads and migrates the stored collection. The migrated collection is
    /// written back once when migration changed anything.
    pub fn open(
        store: RecordStore,
        profiles: Box<dyn ProfileProvider + Send + Sync>,
        clock: Box<dyn Clock + Send + Sync>,
        today: NaiveDate,
    ) -> Self {
        let raw = store.load();
        let loaded = raw.len();
        let outdated = raw.iter().filter(|record| record.needs_migration()).count();
        let profile = profiles.current_profile();
        let records = migrate(raw, profile.as_ref());

        if outdated > 0 || records.len() != loaded {
            info!(
                loaded,
                outdated,
                kept = records.len(),
                "migrated stored intake records"
            );
            store.save(&records);
        }

        Self {
            store,
            profiles,
            clock,
            records,
            selected: today,
        }
    }

    pub fn select_date(&mut self, at: NaiveDateTime) -> NaiveDate {
        self.selected = at.date();
        self.selected
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected
    }

    pub fn records(&self) -> &[WaterIntakeRecord] {
        &self.records
    }

    pub fn live_goal(&self) -> u32 {
        calculate_daily_goal(self.profiles.current_profile().as_ref())
    }

    pub fn current_record(&self, date: NaiveDate) -> Option<&WaterIntakeRecord> {
        self.records.iter().find(|record| record.date == date)
    }

    pub fn effective_goal(&self, date: NaiveDate) -> u32 {
        self.current_record(date)
            .map(|record| record.goal)
            .filter(|goal| *goal > 0)
            .unwrap_or_else(|| self.live_goal())
    }

    /// Appends an entry to `date`, creating the day's record with the current
    /// goal when none exists. A record whose goal is unset gets the current
    /// goal.
    pub fn add_entry(
        &mut self,
        date: NaiveDate,
        kind: DrinkKind,
        amount: i64,
    ) -> std::result::Result<&WaterIntakeRecord, EntryError> {
        let amount = u32::try_from(amount)
            .ok()
            .filter(|value| *value > 0)
            .ok_or(EntryError::InvalidAmount(amount))?;

        let entry = DrinkEntry {
            kind,
            amount,
            timestamp: self.clock.now_millis(),
        };
        let goal = self.live_goal();

        let index = match self.records.iter().position(|record| record.date == date) {
            Some(index) => {
                let record = &mut self.records[index];
                record.drinks.push(entry);
                if record.goal == 0 {
                    record.goal = goal;
                }
                index
            }
            None => {
                self.records.push(WaterIntakeRecord {
                    date,
                    drinks: vec![entry],
                    goal,
                });
                self.records.len() - 1
            }
        };

        info!(date = %date_key(date), kind = %kind, amount, "drink logged");
        self.store.save(&self.records);

        Ok(&self.records[index])
    }

    pub fn add_entry_named(
        &mut self,
        date: NaiveDate,
        kind: &str,
        amount: i64,
    ) -> std::result::Result<&WaterIntakeRecord, EntryError> {
        let kind = kind.parse::<DrinkKind>()?;
        self.add_entry(date, kind, amount)
    }

    /// Empties the day's drinks and keeps the record with its goal.
    /// Returns false when no record exists for `date`.
    pub fn clear_day(&mut self, date: NaiveDate) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| record.date == date) else {
            warn!(date = %date_key(date), "no intake record to clear");
            return false;
        };

        record.drinks.clear();
        info!(date = %date_key(date), "day cleared");
        self.store.save(&self.records);

        true
    }

    pub fn summary(&self, date: NaiveDate) -> DaySummary {
        summarize_day(date, self.current_record(date), self.effective_goal(date))
    }

    /// Status of every day of the month containing `month`. Days without a
    /// stored goal are judged against the live goal.
    pub fn calendar_month(&self, month: NaiveDate) -> Result<Vec<CalendarDay>> {
        let first = month
            .with_day(1)
            .with_context(|| format!("Invalid month: {month}"))?;
        let next = first
            .checked_add_months(Months::new(1))
            .with_context(|| format!("Month out of range: {month}"))?;
        let live_goal = self.live_goal();

        let days = first
            .iter_days()
            .take_while(|day| *day < next)
            .map(|day| {
                let record = self.current_record(day);
                let total = total_intake(record.map(|record| record.drinks.as_slice()));
                let goal = record
                    .map(|record| record.goal)
                    .filter(|goal| *goal > 0)
                    .unwrap_or(live_goal);

                CalendarDay {
                    date: date_key(day),
                    total,
                    goal,
                    status: DayStatus::from_totals(total, goal),
                }
            })
            .collect();

        Ok(days)
    }

    /// Records ordered newest first.
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let mut records = self.records.iter().collect::<Vec<_>>();
        records.sort_by(|left, right| right.date.cmp(&left.date));

        records
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|record| {
                let total = total_intake(Some(record.drinks.as_slice()));
                HistoryEntry {
                    date: record.date_key(),
                    total,
                    goal: record.goal,
                    entries: record.drinks.len(),
                    status: DayStatus::from_totals(total, record.goal),
                }
            })
            .collect()
    }
}
