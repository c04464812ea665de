pub mod aggregate;
pub mod goal;
pub mod manager;
pub mod migrate;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Drink kinds in canonical order. Breakdowns and listings follow this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DrinkKind {
    Water,
    Juice,
    Coffee,
    Tea,
    Milk,
    Alcohol,
}

impl DrinkKind {
    pub const ALL: [DrinkKind; 6] = [
        DrinkKind::Water,
        DrinkKind::Juice,
        DrinkKind::Coffee,
        DrinkKind::Tea,
        DrinkKind::Milk,
        DrinkKind::Alcohol,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DrinkKind::Water => "Water",
            DrinkKind::Juice => "Juice",
            DrinkKind::Coffee => "Coffee",
            DrinkKind::Tea => "Tea",
            DrinkKind::Milk => "Milk",
            DrinkKind::Alcohol => "Alcohol",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DrinkKind::Water => "💧 Water",
            DrinkKind::Juice => "🍹 Juice",
            DrinkKind::Coffee => "☕ Coffee",
            DrinkKind::Tea => "🫖 Tea",
            DrinkKind::Milk => "🥛 Milk",
            DrinkKind::Alcohol => "🍺 Alcohol",
        }
    }
}

impl fmt::Display for DrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrinkKind {
    type Err = EntryError;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = raw.trim();

        DrinkKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| EntryError::UnknownDrinkType(trimmed.to_string()))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("amount must be a positive number of milliliters, got {0}")]
    InvalidAmount(i64),

    #[error("unknown drink type: {0}. Supported: Water, Juice, Coffee, Tea, Milk, Alcohol")]
    UnknownDrinkType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkEntry {
    #[serde(rename = "type")]
    pub kind: DrinkKind,
    /// Milliliters, always positive.
    pub amount: u32,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterIntakeRecord {
    pub date: NaiveDate,
    pub drinks: Vec<DrinkEntry>,
    pub goal: u32,
}

impl WaterIntakeRecord {
    pub fn date_key(&self) -> String {
        date_key(self.date)
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .with_context(|| format!("Invalid date format: {input}. Example: 2026-02-18"))
}

pub fn parse_optional_date(input: Option<&str>) -> Result<NaiveDate> {
    input
        .map(parse_date)
        .transpose()
        .map(|date| date.unwrap_or_else(today))
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", input.trim()), DATE_FORMAT)
        .with_context(|| format!("Invalid month format: {input}. Example: 2026-02"))
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Midnight UTC of `date` in epoch milliseconds. Used as the timestamp of
/// entries that were persisted without one.
pub fn midnight_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drink_kind_parses_case_insensitively() {
        assert_eq!("coffee".parse::<DrinkKind>(), Ok(DrinkKind::Coffee));
        assert_eq!(" Tea ".parse::<DrinkKind>(), Ok(DrinkKind::Tea));
        assert_eq!(
            "Soda".parse::<DrinkKind>(),
            Err(EntryError::UnknownDrinkType("Soda".to_string()))
        );
    }

    #[test]
    fn drink_entry_serializes_kind_as_type_field() {
        let entry = DrinkEntry {
            kind: DrinkKind::Milk,
            amount: 200,
            timestamp: 1_700_000_000_000,
        };

        let value = serde_json::to_value(&entry).expect("serialize entry");
        assert_eq!(value["type"], "Milk");
        assert_eq!(value["amount"], 200);
    }

    #[test]
    fn record_date_serializes_as_calendar_key() {
        let record = WaterIntakeRecord {
            date: parse_date("2024-03-09").expect("date"),
            drinks: Vec::new(),
            goal: 2000,
        };

        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(value["date"], "2024-03-09");
        assert_eq!(record.date_key(), "2024-03-09");
    }

    #[test]
    fn midnight_is_start_of_day_in_utc() {
        let date = parse_date("2024-01-01").expect("date");
        assert_eq!(midnight_millis(date), 1_704_067_200_000);
    }

    #[test]
    fn month_parses_to_first_day() {
        assert_eq!(
            parse_month("2024-02").expect("month"),
            parse_date("2024-02-01").expect("date")
        );
        assert!(parse_month("2024-13").is_err());
    }

    #[test]
    fn rejects_malformed_date() {
        assert!(parse_date("01/02/2024").is_err());
    }
}
