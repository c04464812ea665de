use crate::config::Config;
use crate::intake::goal::{
    FALLBACK_GOAL_ML, Gender, UserProfile, calculate_daily_goal, is_exercise_minutes,
    is_positive_measure,
};
use crate::store::{self, ProfileStore};
use anyhow::{Context, Result};
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::str::FromStr;

pub fn run_onboarding(config: &Config) -> Result<()> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to DailyDrops onboarding.");
    println!("──────────────────────────────────────────");
    println!("  Your daily goal is derived from weight and exercise.");
    println!("  Leave any answer empty to skip it.");

    let theme = ColorfulTheme::default();
    let profiles = ProfileStore::new(store::open_backend(config)?);
    let existing = profiles.load().unwrap_or_default();

    println!("\n[1/5] Gender");
    let choices = ["Male", "Female", "Other", "Prefer not to say"];
    let default_choice = existing
        .gender
        .and_then(|gender| Gender::ALL.iter().position(|candidate| *candidate == gender))
        .unwrap_or(choices.len() - 1);
    let selected = Select::with_theme(&theme)
        .with_prompt("  Select gender")
        .default(default_choice)
        .items(&choices[..])
        .interact()
        .context("Failed to read gender selection")?;
    let gender = Gender::ALL.get(selected).copied();

    println!("\n[2/5] Age");
    let age = prompt_optional(&theme, "  Age (years)", existing.age, |age: &u32| *age > 0, POSITIVE_HINT)?;

    println!("\n[3/5] Height");
    let height = prompt_optional(
        &theme,
        "  Height (cm)",
        existing.height,
        |height: &f64| is_positive_measure(*height),
        POSITIVE_HINT,
    )?;

    println!("\n[4/5] Weight");
    let weight = prompt_optional(
        &theme,
        "  Weight (kg)",
        existing.weight,
        |weight: &f64| is_positive_measure(*weight),
        POSITIVE_HINT,
    )?;

    println!("\n[5/5] Exercise");
    let exercise_minutes = prompt_optional(
        &theme,
        "  Exercise per day (minutes)",
        existing.exercise_minutes,
        |minutes: &f64| is_exercise_minutes(*minutes),
        "Enter zero, a positive number, or leave empty",
    )?;

    let profile = UserProfile {
        gender,
        age,
        height,
        weight,
        exercise_minutes,
    };

    profile.validate()?;
    config.ensure_bootstrap_files()?;
    config.save()?;
    profiles.save(&profile)?;

    let goal = calculate_daily_goal(Some(&profile));

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Daily goal: {goal} ml");
    if goal == FALLBACK_GOAL_ML && (weight.is_none() || exercise_minutes.is_none()) {
        println!("  (default goal; set weight and exercise minutes for a personal goal)");
    }
    println!("  Run dailydrops add 250 to log your first drink.");
    println!("──────────────────────────────────────────");

    Ok(())
}

const POSITIVE_HINT: &str = "Enter a positive number or leave empty";

fn prompt_optional<T>(
    theme: &ColorfulTheme,
    prompt: &str,
    current: Option<T>,
    accept: fn(&T) -> bool,
    hint: &'static str,
) -> Result<Option<T>>
where
    T: FromStr + ToString + 'static,
{
    let answer: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .default(current.map(|value| value.to_string()).unwrap_or_default())
        .allow_empty(true)
        .validate_with(move |input: &String| -> std::result::Result<(), &str> {
            parse_answer(input, accept).map(|_| ()).ok_or(hint)
        })
        .interact_text()
        .with_context(|| format!("Failed to read input: {}", prompt.trim()))?;

    Ok(parse_answer(&answer, accept).flatten())
}

/// `Some(None)` for an empty answer, `None` when the answer is rejected.
fn parse_answer<T: FromStr>(input: &str, accept: fn(&T) -> bool) -> Option<Option<T>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(None);
    }

    trimmed.parse::<T>().ok().filter(accept).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(input: &str) -> Option<Option<f64>> {
        parse_answer(input, |minutes: &f64| is_exercise_minutes(*minutes))
    }

    fn weight(input: &str) -> Option<Option<f64>> {
        parse_answer(input, |weight: &f64| is_positive_measure(*weight))
    }

    #[test]
    fn zero_exercise_is_accepted_and_feeds_the_goal() {
        assert_eq!(exercise("0"), Some(Some(0.0)));
        assert_eq!(exercise(" 45 "), Some(Some(45.0)));
        assert_eq!(exercise("-5"), None);

        let profile = UserProfile {
            weight: weight("70").flatten(),
            exercise_minutes: exercise("0").flatten(),
            ..UserProfile::default()
        };
        assert_eq!(calculate_daily_goal(Some(&profile)), 2100);
    }

    #[test]
    fn measures_must_be_positive_and_finite() {
        assert_eq!(weight("0"), None);
        assert_eq!(weight("inf"), None);
        assert_eq!(weight("abc"), None);
        assert_eq!(weight(""), Some(None));
        assert_eq!(parse_answer("0", |age: &u32| *age > 0), None);
        assert_eq!(parse_answer("31", |age: &u32| *age > 0), Some(Some(31)));
    }
}
