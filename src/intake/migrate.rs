use crate::intake::goal::{UserProfile, calculate_daily_goal};
use crate::intake::{DrinkEntry, DrinkKind, WaterIntakeRecord, midnight_millis, parse_date};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// A record as found in the persisted blob. Covers both the current shape and
/// the legacy `{ date, amount, goal }` shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub date: String,
    #[serde(deserialize_with = "deserialize_drinks")]
    pub drinks: Option<Vec<RawDrinkEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    pub goal: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDrinkEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: f64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<i64>,
}

/// Entries that cannot be read become an empty placeholder. Migration drops
/// it, so one bad entry never costs the rest of the record.
fn deserialize_drinks<'de, D>(deserializer: D) -> Result<Option<Vec<RawDrinkEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.into_iter().map(read_drink).collect())),
        Some(other) => Err(de::Error::custom(format!("drinks must be an array, got {other}"))),
    }
}

fn read_drink(value: Value) -> RawDrinkEntry {
    serde_json::from_value(value).unwrap_or_else(|error| {
        warn!(error = %error, "unreadable drink entry");
        RawDrinkEntry::default()
    })
}

/// Accepts integral and fractional epoch milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = Option::<f64>::deserialize(deserializer)?;

    Ok(millis
        .filter(|millis| millis.is_finite())
        .map(|millis| millis.round() as i64))
}

impl From<&WaterIntakeRecord> for RawRecord {
    fn from(record: &WaterIntakeRecord) -> Self {
        Self {
            date: record.date_key(),
            drinks: Some(
                record
                    .drinks
                    .iter()
                    .map(|drink| RawDrinkEntry {
                        kind: drink.kind.name().to_string(),
                        amount: f64::from(drink.amount),
                        timestamp: Some(drink.timestamp),
                    })
                    .collect(),
            ),
            amount: None,
            goal: Some(f64::from(record.goal)),
        }
    }
}

impl RawRecord {
    /// True when loading this record through [`migrate`] changes its shape.
    pub fn needs_migration(&self) -> bool {
        let legacy = self.drinks.is_none();
        let missing_goal = positive_ml(self.goal).is_none();
        let incomplete_drinks = self.drinks.iter().flatten().any(|drink| {
            drink.timestamp.unwrap_or_default() == 0
                || positive_ml(Some(drink.amount)).is_none()
                || drink.kind.parse::<DrinkKind>().is_err()
        });

        legacy || missing_goal || incomplete_drinks
    }
}

/// Normalizes persisted records into the current schema.
///
/// Legacy scalar `amount` becomes a single Water entry, entries without a
/// timestamp get the record's midnight, and records without a goal receive the
/// goal computed from `profile`. Unparseable dates and invalid entries are
/// dropped, and duplicate dates are merged into their first occurrence.
/// Running it again on its own output changes nothing.
pub fn migrate(raw_records: Vec<RawRecord>, profile: Option<&UserProfile>) -> Vec<WaterIntakeRecord> {
    let fallback_goal = calculate_daily_goal(profile);

    raw_records
        .into_iter()
        .filter_map(|raw| migrate_record(raw, fallback_goal))
        .fold(Vec::new(), |mut records: Vec<WaterIntakeRecord>, record| {
            match records.iter_mut().find(|existing| existing.date == record.date) {
                Some(existing) => {
                    warn!(date = %record.date_key(), "merging duplicate intake record");
                    existing.drinks.extend(record.drinks);
                }
                None => records.push(record),
            }
            records
        })
}

fn migrate_record(raw: RawRecord, fallback_goal: u32) -> Option<WaterIntakeRecord> {
    let date = match parse_date(&raw.date) {
        Ok(date) => date,
        Err(error) => {
            warn!(error = %error, "dropping intake record with invalid date");
            return None;
        }
    };
    let midnight = midnight_millis(date);

    let drinks = match raw.drinks {
        Some(drinks) => drinks,
        None => positive_ml(raw.amount)
            .map(|amount| RawDrinkEntry {
                kind: DrinkKind::Water.name().to_string(),
                amount: f64::from(amount),
                timestamp: Some(midnight),
            })
            .into_iter()
            .collect(),
    };

    let drinks = drinks
        .into_iter()
        .filter_map(|drink| {
            let Ok(kind) = drink.kind.parse::<DrinkKind>() else {
                warn!(date = %raw.date, kind = %drink.kind, "dropping drink entry with unknown type");
                return None;
            };
            let Some(amount) = positive_ml(Some(drink.amount)) else {
                warn!(date = %raw.date, amount = drink.amount, "dropping drink entry with invalid amount");
                return None;
            };

            Some(DrinkEntry {
                kind,
                amount,
                timestamp: drink.timestamp.filter(|timestamp| *timestamp != 0).unwrap_or(midnight),
            })
        })
        .collect::<Vec<_>>();

    Some(WaterIntakeRecord {
        date,
        drinks,
        goal: positive_ml(raw.goal).unwrap_or(fallback_goal),
    })
}

fn positive_ml(value: Option<f64>) -> Option<u32> {
    value
        .filter(|amount| amount.is_finite())
        .map(f64::round)
        .filter(|amount| *amount > 0.0)
        .map(|amount| amount.min(f64::from(u32::MAX)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_from_json(content: &str) -> Vec<RawRecord> {
        serde_json::from_str(content).expect("parse raw records")
    }

    fn reserialize(records: &[WaterIntakeRecord]) -> Vec<RawRecord> {
        records.iter().map(RawRecord::from).collect()
    }

    #[test]
    fn legacy_amount_becomes_single_water_entry() {
        let raw = raw_from_json(r#"[{"date":"2024-01-01","amount":500,"goal":2000}]"#);

        let records = migrate(raw, None);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date_key(), "2024-01-01");
        assert_eq!(records[0].goal, 2000);
        assert_eq!(
            records[0].drinks,
            vec![DrinkEntry {
                kind: DrinkKind::Water,
                amount: 500,
                timestamp: 1_704_067_200_000,
            }]
        );
    }

    #[test]
    fn legacy_zero_amount_becomes_empty_day() {
        let raw = raw_from_json(r#"[{"date":"2024-01-02","amount":0,"goal":1800}]"#);

        let records = migrate(raw, None);

        assert!(records[0].drinks.is_empty());
        assert_eq!(records[0].goal, 1800);
    }

    #[test]
    fn backfills_missing_timestamps_with_midnight() {
        let raw = raw_from_json(
            r#"[{"date":"2024-01-01","goal":2000,"drinks":[
                {"type":"Tea","amount":200},
                {"type":"Water","amount":300,"timestamp":1704100000000}
            ]}]"#,
        );

        let records = migrate(raw, None);

        assert_eq!(records[0].drinks[0].timestamp, 1_704_067_200_000);
        assert_eq!(records[0].drinks[1].timestamp, 1_704_100_000_000);
    }

    #[test]
    fn missing_goal_uses_profile_goal() {
        let raw = raw_from_json(r#"[{"date":"2024-02-01","drinks":[]},{"date":"2024-02-02","goal":0}]"#);
        let profile = UserProfile {
            weight: Some(70.0),
            exercise_minutes: Some(30.0),
            ..UserProfile::default()
        };

        let records = migrate(raw, Some(&profile));

        assert_eq!(records[0].goal, 2465);
        assert_eq!(records[1].goal, 2465);

        let without_profile = migrate(raw_from_json(r#"[{"date":"2024-02-01"}]"#), None);
        assert_eq!(without_profile[0].goal, 2000);
    }

    #[test]
    fn drops_invalid_entries_and_dates() {
        let raw = raw_from_json(
            r#"[
                {"date":"not-a-date","goal":2000,"drinks":[]},
                {"date":"2024-03-01","goal":2000,"drinks":[
                    {"type":"Soda","amount":300,"timestamp":1},
                    {"type":"Water","amount":-50,"timestamp":2},
                    {"type":"Milk","amount":250,"timestamp":3}
                ]}
            ]"#,
        );

        let records = migrate(raw, None);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].drinks.len(), 1);
        assert_eq!(records[0].drinks[0].kind, DrinkKind::Milk);
    }

    #[test]
    fn unreadable_drink_fields_drop_only_that_entry() {
        let raw = raw_from_json(
            r#"[{"date":"2024-01-02","goal":2000,"drinks":[
                {"type":"Tea","amount":null},
                {"type":"Water","amount":300,"timestamp":1704067200000.0},
                null,
                {"type":"Juice","amount":"lots","timestamp":4}
            ]}]"#,
        );

        assert!(raw[0].needs_migration());
        let records = migrate(raw, None);

        assert_eq!(
            records[0].drinks,
            vec![DrinkEntry {
                kind: DrinkKind::Water,
                amount: 300,
                timestamp: 1_704_067_200_000,
            }]
        );
    }

    #[test]
    fn duplicate_dates_are_merged_in_order() {
        let raw = raw_from_json(
            r#"[
                {"date":"2024-04-01","goal":2100,"drinks":[{"type":"Water","amount":100,"timestamp":5}]},
                {"date":"2024-04-02","goal":2000,"drinks":[]},
                {"date":"2024-04-01","goal":3000,"drinks":[{"type":"Tea","amount":200,"timestamp":4}]}
            ]"#,
        );

        let records = migrate(raw, None);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].goal, 2100);
        let amounts = records[0].drinks.iter().map(|drink| drink.amount).collect::<Vec<_>>();
        assert_eq!(amounts, vec![100, 200]);
    }

    #[test]
    fn migration_is_idempotent() {
        let raw = raw_from_json(
            r#"[
                {"date":"2024-01-01","amount":500,"goal":2000},
                {"date":"2024-01-02","amount":0},
                {"date":"2024-01-03","drinks":[{"type":"Coffee","amount":120}]},
                {"date":"2024-01-03","goal":2500,"drinks":[{"type":"Juice","amount":80,"timestamp":9}]}
            ]"#,
        );

        let once = migrate(raw, None);
        let twice = migrate(reserialize(&once), None);

        assert_eq!(once, twice);
        assert!(reserialize(&once).iter().all(|raw| !raw.needs_migration()));
    }

    #[test]
    fn detects_legacy_shapes() {
        let raw = raw_from_json(
            r#"[
                {"date":"2024-01-01","amount":500,"goal":2000},
                {"date":"2024-01-02","goal":2000,"drinks":[{"type":"Water","amount":250,"timestamp":7}]}
            ]"#,
        );

        assert!(raw[0].needs_migration());
        assert!(!raw[1].needs_migration());
    }
}
