use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const BASE_ML_PER_KG: f64 = 30.0;
const ML_PER_30_MIN_EXERCISE: f64 = 365.0;
pub const FALLBACK_GOAL_ML: u32 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn name(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_lowercase();

        Gender::ALL
            .into_iter()
            .find(|gender| gender.name() == normalized)
            .ok_or_else(|| anyhow!("gender must be male, female or other"))
    }
}

/// Every field is optional. Only `weight` and `exercise_minutes` feed the goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub gender: Option<Gender>,
    pub age: Option<u32>,
    /// Centimeters.
    pub height: Option<f64>,
    /// Kilograms.
    pub weight: Option<f64>,
    /// Minutes of exercise per day.
    pub exercise_minutes: Option<f64>,
}

impl UserProfile {
    /// Rejects values no profile input surface may store. Unset fields pass.
    pub fn validate(&self) -> Result<()> {
        if self.age == Some(0) {
            bail!("age must be a positive number");
        }
        if self.height.is_some_and(|height| !is_positive_measure(height)) {
            bail!("height must be a positive number");
        }
        if self.weight.is_some_and(|weight| !is_positive_measure(weight)) {
            bail!("weight must be a positive number");
        }
        if self
            .exercise_minutes
            .is_some_and(|minutes| !is_exercise_minutes(minutes))
        {
            bail!("exercise_minutes must be zero or a positive number");
        }

        Ok(())
    }
}

pub fn is_positive_measure(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Zero is a valid answer: no exercise still yields a weight-based goal.
pub fn is_exercise_minutes(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Daily goal in milliliters: `weight * 30 + exercise_minutes / 30 * 365`,
/// rounded. Falls back to [`FALLBACK_GOAL_ML`] whenever the inputs are
/// missing, non-finite, or yield a non-positive goal. Age and gender are
/// ignored.
pub fn calculate_daily_goal(profile: Option<&UserProfile>) -> u32 {
    let Some((weight, exercise_minutes)) = profile.and_then(|profile| {
        let weight = profile.weight.filter(|value| value.is_finite())?;
        let exercise_minutes = profile.exercise_minutes.filter(|value| value.is_finite())?;
        Some((weight, exercise_minutes))
    }) else {
        return FALLBACK_GOAL_ML;
    };

    if weight <= 0.0 {
        return FALLBACK_GOAL_ML;
    }

    let baseline = weight * BASE_ML_PER_KG;
    let exercise_adjustment = (exercise_minutes / 30.0) * ML_PER_30_MIN_EXERCISE;
    let total = (baseline + exercise_adjustment).round();

    if total <= 0.0 {
        return FALLBACK_GOAL_ML;
    }

    total.min(f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_zero_exercise_and_rejects_negatives() {
        let mut profile = UserProfile {
            age: Some(30),
            height: Some(175.0),
            weight: Some(70.0),
            exercise_minutes: Some(0.0),
            ..UserProfile::default()
        };
        assert!(profile.validate().is_ok());
        assert!(UserProfile::default().validate().is_ok());

        profile.exercise_minutes = Some(-10.0);
        assert!(profile.validate().is_err());

        profile.exercise_minutes = Some(30.0);
        profile.weight = Some(-70.0);
        assert!(profile.validate().is_err());

        profile.weight = Some(f64::INFINITY);
        assert!(profile.validate().is_err());

        profile.weight = Some(70.0);
        profile.age = Some(0);
        assert!(profile.validate().is_err());
    }

    fn profile(weight: Option<f64>, exercise_minutes: Option<f64>) -> UserProfile {
        UserProfile {
            weight,
            exercise_minutes,
            ..UserProfile::default()
        }
    }

    #[test]
    fn missing_profile_uses_fallback() {
        assert_eq!(calculate_daily_goal(None), FALLBACK_GOAL_ML);
    }

    #[test]
    fn incomplete_or_invalid_inputs_use_fallback() {
        let cases = [
            profile(None, Some(30.0)),
            profile(Some(70.0), None),
            profile(Some(0.0), Some(30.0)),
            profile(Some(-5.0), Some(60.0)),
            profile(Some(f64::NAN), Some(30.0)),
            profile(Some(70.0), Some(f64::INFINITY)),
        ];

        for case in cases {
            assert_eq!(calculate_daily_goal(Some(&case)), 2000, "{case:?}");
        }
    }

    #[test]
    fn weight_and_exercise_drive_goal() {
        assert_eq!(
            calculate_daily_goal(Some(&profile(Some(70.0), Some(30.0)))),
            2465
        );
        assert_eq!(
            calculate_daily_goal(Some(&profile(Some(70.0), Some(0.0)))),
            2100
        );
    }

    #[test]
    fn goal_is_rounded_to_nearest_milliliter() {
        // 61.5 * 30 + 10 / 30 * 365 = 1845 + 121.67
        assert_eq!(
            calculate_daily_goal(Some(&profile(Some(61.5), Some(10.0)))),
            1967
        );
    }

    #[test]
    fn non_positive_total_uses_fallback() {
        // 10 * 30 - 100 / 30 * 365 is negative
        assert_eq!(
            calculate_daily_goal(Some(&profile(Some(10.0), Some(-100.0)))),
            FALLBACK_GOAL_ML
        );
    }

    #[test]
    fn age_and_gender_do_not_affect_goal() {
        let base = profile(Some(80.0), Some(45.0));
        let detailed = UserProfile {
            gender: Some(Gender::Female),
            age: Some(67),
            height: Some(165.0),
            ..base.clone()
        };

        assert_eq!(
            calculate_daily_goal(Some(&base)),
            calculate_daily_goal(Some(&detailed))
        );
    }

    #[test]
    fn profile_blob_uses_camel_case_fields() {
        let parsed: UserProfile =
            serde_json::from_str(r#"{"gender":"male","weight":72.5,"exerciseMinutes":20}"#)
                .expect("parse profile");

        assert_eq!(parsed.gender, Some(Gender::Male));
        assert_eq!(parsed.exercise_minutes, Some(20.0));
        assert_eq!(parsed.age, None);
    }

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!("Female".parse::<Gender>().expect("gender"), Gender::Female);
        assert!("unknown".parse::<Gender>().is_err());
    }
}
