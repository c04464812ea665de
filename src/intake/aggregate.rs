use crate::intake::{DrinkEntry, DrinkKind, WaterIntakeRecord, date_key};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTotal {
    #[serde(rename = "type")]
    pub kind: DrinkKind,
    pub total_amount: u64,
    /// Share of the goal covered by this kind, in percent (not capped).
    pub goal_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Achieved,
    Partial,
    Empty,
}

impl DayStatus {
    pub fn from_totals(total: u64, goal: u32) -> Self {
        if goal > 0 && total >= u64::from(goal) {
            DayStatus::Achieved
        } else if total > 0 {
            DayStatus::Partial
        } else {
            DayStatus::Empty
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DayStatus::Achieved => "Goal achieved! Keep it up!",
            DayStatus::Partial => "Keep hydrating!",
            DayStatus::Empty => "No intake logged for this day yet.",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub goal: u32,
    pub total: u64,
    pub remaining: u64,
    pub progress: f64,
    pub progress_percent: f64,
    pub status: DayStatus,
    pub by_type: Vec<TypeTotal>,
    pub entries: Vec<DrinkEntry>,
}

pub fn total_intake(drinks: Option<&[DrinkEntry]>) -> u64 {
    drinks
        .unwrap_or_default()
        .iter()
        .map(|drink| u64::from(drink.amount))
        .sum()
}

/// Per-kind totals in canonical [`DrinkKind::ALL`] order; kinds without
/// entries are omitted.
pub fn aggregate_by_type(drinks: &[DrinkEntry], goal: u32) -> Vec<TypeTotal> {
    let totals = drinks.iter().fold(HashMap::new(), |mut acc, drink| {
        let entry = acc.entry(drink.kind).or_insert(0_u64);
        *entry += u64::from(drink.amount);
        acc
    });

    DrinkKind::ALL
        .into_iter()
        .filter_map(|kind| {
            totals.get(&kind).map(|total_amount| TypeTotal {
                kind,
                total_amount: *total_amount,
                goal_percent: percent_of(*total_amount, goal),
            })
        })
        .collect()
}

/// `min(total / goal, 1)`, or 0 when there is no positive goal.
pub fn progress_ratio(total: u64, goal: u32) -> f64 {
    if goal == 0 {
        return 0.0;
    }

    (total as f64 / f64::from(goal)).min(1.0)
}

/// Most recent first. Entries with equal timestamps keep their insertion order.
pub fn entries_most_recent_first(drinks: &[DrinkEntry]) -> Vec<DrinkEntry> {
    let mut sorted = drinks.to_vec();
    sorted.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
    sorted
}

pub fn summarize_day(date: NaiveDate, record: Option<&WaterIntakeRecord>, goal: u32) -> DaySummary {
    let drinks = record.map(|record| record.drinks.as_slice()).unwrap_or_default();
    let total = total_intake(Some(drinks));
    let progress = progress_ratio(total, goal);

    DaySummary {
        date: date_key(date),
        goal,
        total,
        remaining: u64::from(goal).saturating_sub(total),
        progress,
        progress_percent: progress * 100.0,
        status: DayStatus::from_totals(total, goal),
        by_type: aggregate_by_type(drinks, goal),
        entries: entries_most_recent_first(drinks),
    }
}

pub fn render_day_summary(summary: &DaySummary) -> String {
    let breakdown = if summary.by_type.is_empty() {
        "- No data".to_string()
    } else {
        summary
            .by_type
            .iter()
            .map(|item| {
                format!(
                    "- {}: {} ml ({:.0}% of goal)",
                    item.kind.display_name(),
                    item.total_amount,
                    item.goal_percent
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let log = if summary.entries.is_empty() {
        "- No drinks logged for this day yet.".to_string()
    } else {
        summary
            .entries
            .iter()
            .map(|entry| {
                format!(
                    "- {} {} {} ml",
                    format_entry_time(entry.timestamp),
                    entry.kind.display_name(),
                    entry.amount
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "# Intake for {}\n\n{} / {} ml ({:.0}%)\n{}\n\n## By drink\n{}\n\n## Log\n{}\n",
        summary.date,
        summary.total,
        summary.goal,
        summary.progress_percent,
        summary.status.label(),
        breakdown,
        log
    )
}

fn format_entry_time(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms)
        .map(|datetime| {
            datetime
                .with_timezone(&chrono::Local)
                .format("%H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "--:--".to_string())
}

fn percent_of(amount: u64, goal: u32) -> f64 {
    if goal == 0 {
        0.0
    } else {
        (amount as f64 / f64::from(goal)) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::parse_date;

    fn entry(kind: DrinkKind, amount: u32, timestamp: i64) -> DrinkEntry {
        DrinkEntry {
            kind,
            amount,
            timestamp,
        }
    }

    #[test]
    fn total_intake_sums_amounts() {
        let drinks = [
            entry(DrinkKind::Water, 250, 1),
            entry(DrinkKind::Tea, 500, 2),
        ];

        assert_eq!(total_intake(Some(&drinks[..])), 750);
        assert_eq!(total_intake(Some(&[][..])), 0);
        assert_eq!(total_intake(None), 0);
    }

    #[test]
    fn aggregate_follows_canonical_order() {
        let drinks = [
            entry(DrinkKind::Alcohol, 330, 1),
            entry(DrinkKind::Coffee, 150, 2),
            entry(DrinkKind::Water, 250, 3),
            entry(DrinkKind::Coffee, 100, 4),
        ];

        let totals = aggregate_by_type(&drinks, 2000);
        let kinds = totals.iter().map(|item| item.kind).collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![DrinkKind::Water, DrinkKind::Coffee, DrinkKind::Alcohol]
        );
        assert_eq!(totals[1].total_amount, 250);
        assert!((totals[0].goal_percent - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn aggregate_of_empty_day_is_empty() {
        assert!(aggregate_by_type(&[], 2000).is_empty());
    }

    #[test]
    fn progress_ratio_is_capped_and_guarded() {
        assert_eq!(progress_ratio(1000, 2000), 0.5);
        assert_eq!(progress_ratio(5000, 2000), 1.0);
        assert_eq!(progress_ratio(500, 0), 0.0);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let drinks = [
            entry(DrinkKind::Water, 100, 10),
            entry(DrinkKind::Juice, 200, 10),
            entry(DrinkKind::Milk, 300, 20),
        ];

        let sorted = entries_most_recent_first(&drinks);
        let amounts = sorted.iter().map(|item| item.amount).collect::<Vec<_>>();

        assert_eq!(amounts, vec![300, 100, 200]);
    }

    #[test]
    fn day_status_thresholds() {
        assert_eq!(DayStatus::from_totals(2000, 2000), DayStatus::Achieved);
        assert_eq!(DayStatus::from_totals(1999, 2000), DayStatus::Partial);
        assert_eq!(DayStatus::from_totals(0, 2000), DayStatus::Empty);
        assert_eq!(DayStatus::from_totals(0, 0), DayStatus::Empty);
    }

    #[test]
    fn summary_without_record_reports_goal_only() {
        let date = parse_date("2024-05-01").expect("date");
        let summary = summarize_day(date, None, 2465);

        assert_eq!(summary.date, "2024-05-01");
        assert_eq!(summary.total, 0);
        assert_eq!(summary.remaining, 2465);
        assert_eq!(summary.status, DayStatus::Empty);
        assert!(summary.entries.is_empty());
    }

    #[test]
    fn summary_of_met_goal() {
        let date = parse_date("2024-05-01").expect("date");
        let record = WaterIntakeRecord {
            date,
            drinks: vec![
                entry(DrinkKind::Water, 1500, 1),
                entry(DrinkKind::Juice, 700, 2),
            ],
            goal: 2000,
        };

        let summary = summarize_day(date, Some(&record), record.goal);

        assert_eq!(summary.total, 2200);
        assert_eq!(summary.remaining, 0);
        assert_eq!(summary.progress, 1.0);
        assert_eq!(summary.status, DayStatus::Achieved);
        assert_eq!(summary.entries[0].kind, DrinkKind::Juice);

        let rendered = render_day_summary(&summary);
        assert!(rendered.contains("2200 / 2000 ml (100%)"));
        assert!(rendered.contains("Goal achieved!"));
    }
}
