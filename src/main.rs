mod api;
mod cli;
mod config;
mod intake;
mod store;

use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands, ProfileCommands};
use crate::config::Config;
use crate::intake::aggregate::{DayStatus, render_day_summary};
use crate::intake::goal::{FALLBACK_GOAL_ML, Gender, UserProfile, calculate_daily_goal};
use crate::intake::manager::{DayRecordManager, SystemClock};
use crate::intake::{DrinkKind, parse_month, parse_optional_date, today};
use crate::store::{ProfileStore, RECORDS_KEY, RecordStore};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let config = load_or_default_config()?;
            run_onboarding(&config)
        }
        Commands::Profile { command } => handle_profile_command(command),
        Commands::Goal => handle_goal(),
        Commands::Add { amount, kind, date } => handle_add(amount, kind, date),
        Commands::Quick { slot, date } => handle_quick(slot, date),
        Commands::Clear { date } => handle_clear(date),
        Commands::Show { date, json } => handle_show(date, json),
        Commands::Calendar { month } => handle_calendar(month),
        Commands::History { limit } => handle_history(limit),
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Serve => handle_serve().await,
    }
}

fn handle_profile_command(command: ProfileCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let profiles = ProfileStore::new(store::open_backend(&config)?);

    match command {
        ProfileCommands::Set {
            gender,
            age,
            height,
            weight,
            exercise_minutes,
        } => {
            let mut profile = profiles.load().unwrap_or_default();

            if let Some(value) = gender {
                profile.gender = Some(value.parse::<Gender>()?);
            }
            profile.age = age.or(profile.age);
            profile.height = height.or(profile.height);
            profile.weight = weight.or(profile.weight);
            profile.exercise_minutes = exercise_minutes.or(profile.exercise_minutes);

            profile.validate()?;
            profiles.save(&profile)?;
            println!("Profile saved. Daily goal: {} ml", calculate_daily_goal(Some(&profile)));
            Ok(())
        }
        ProfileCommands::Get => {
            match profiles.load() {
                Some(profile) => print_profile(&profile),
                None => println!("No profile set. Run `dailydrops onboard` or `dailydrops profile set`."),
            }
            Ok(())
        }
        ProfileCommands::Clear => {
            profiles.clear()?;
            println!("Profile cleared. Daily goal: {FALLBACK_GOAL_ML} ml");
            Ok(())
        }
    }
}

fn handle_goal() -> Result<()> {
    let config = load_or_default_config()?;
    let profile = ProfileStore::new(store::open_backend(&config)?).load();
    let goal = calculate_daily_goal(profile.as_ref());

    println!("{goal}");
    if profile.is_none() {
        info!("no profile set, using the default goal");
    }

    Ok(())
}

fn handle_add(amount: i64, kind: Option<String>, date: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let date = parse_optional_date(date.as_deref())?;
    let kind = kind.unwrap_or_else(|| config.default_drink.name().to_string());
    let mut manager = open_manager(&config)?.0;

    manager.add_entry_named(date, &kind, amount)?;
    print_progress_line(&manager, date);

    Ok(())
}

fn handle_quick(slot: usize, date: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let date = parse_optional_date(date.as_deref())?;
    let amount = config.quick_add_amount(slot)?;
    let mut manager = open_manager(&config)?.0;

    manager.add_entry(date, DrinkKind::Water, i64::from(amount))?;
    print_progress_line(&manager, date);

    Ok(())
}

fn handle_clear(date: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let date = parse_optional_date(date.as_deref())?;
    let mut manager = open_manager(&config)?.0;

    if manager.clear_day(date) {
        println!("Cleared all drinks for {date}");
    } else {
        println!("Nothing logged for {date}");
    }

    Ok(())
}

fn handle_show(date: Option<String>, json: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let date = parse_optional_date(date.as_deref())?;
    let mut manager = open_manager(&config)?.0;

    let start_of_day = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Failed to build start of day: {date}"))?;
    manager.select_date(start_of_day);
    let summary = manager.summary(manager.selected_date());

    if json {
        let content =
            serde_json::to_string_pretty(&summary).context("Failed to serialize day summary")?;
        println!("{content}");
    } else {
        print!("{}", render_day_summary(&summary));
    }

    Ok(())
}

fn handle_calendar(month: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let month = month
        .as_deref()
        .map(parse_month)
        .transpose()?
        .unwrap_or_else(today);
    let manager = open_manager(&config)?.0;

    println!("Calendar {}", month.format("%B %Y"));
    for day in manager.calendar_month(month)? {
        let marker = match day.status {
            DayStatus::Achieved => "●",
            DayStatus::Partial => "◐",
            DayStatus::Empty => "·",
        };
        println!("{} {} {:>5} / {} ml", day.date, marker, day.total, day.goal);
    }

    Ok(())
}

fn handle_history(limit: Option<usize>) -> Result<()> {
    let config = load_or_default_config()?;
    let manager = open_manager(&config)?.0;
    let history = manager.history(limit);

    if history.is_empty() {
        println!("No intake logged yet.");
        return Ok(());
    }

    for entry in history {
        println!(
            "{}  {:>5} / {} ml  {} drink(s)  {}",
            entry.date, entry.total, entry.goal, entry.entries, entry.status.label()
        );
    }

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let (manager, profiles) = open_manager(&config)?;
    let summary = manager.summary(today());

    println!("DailyDrops status");
    println!(
        "- storage_backend: {}",
        config.get_value("storage_backend").unwrap_or_default()
    );
    println!("- records: {}", manager.records().len());
    println!("- profile_set: {}", profiles.load().is_some());
    println!("- live_goal: {} ml", manager.live_goal());
    println!(
        "- today: {} / {} ml ({:.0}%)",
        summary.total, summary.goal, summary.progress_percent
    );

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    match store::open_backend(&config) {
        Ok(backend) => {
            println!("[OK] storage reachable: {}", backend.describe());

            match backend.get(RECORDS_KEY) {
                Ok(Some(content)) => {
                    match serde_json::from_str::<Vec<serde_json::Value>>(&content) {
                        Ok(values) => {
                            let stored = values.len();
                            let records = values
                                .into_iter()
                                .filter_map(|value| {
                                    serde_json::from_value::<intake::migrate::RawRecord>(value).ok()
                                })
                                .collect::<Vec<_>>();
                            let unreadable = stored - records.len();
                            let outdated =
                                records.iter().filter(|record| record.needs_migration()).count();
                            println!("[OK] {} intake record(s) readable", records.len());
                            if unreadable > 0 {
                                println!("[WARN] {unreadable} record(s) are unreadable and will be dropped on next save");
                                issues.push("unreadable records".to_string());
                            }
                            if outdated > 0 {
                                println!("[WARN] {outdated} record(s) use a legacy shape or hold invalid entries and will be migrated on next load");
                                issues.push("legacy records".to_string());
                            }
                        }
                        Err(error) => {
                            println!("[WARN] intake records are corrupt: {error}");
                            issues.push("corrupt records".to_string());
                        }
                    }
                }
                Ok(None) => println!("[OK] no intake records yet"),
                Err(error) => {
                    println!("[WARN] failed to read intake records: {error}");
                    issues.push("records unreadable".to_string());
                }
            }

            let profile = ProfileStore::new(backend).load();
            let has_goal_inputs = profile
                .as_ref()
                .is_some_and(|profile| profile.weight.is_some() && profile.exercise_minutes.is_some());
            if has_goal_inputs {
                println!(
                    "[OK] profile sets a personal goal: {} ml",
                    calculate_daily_goal(profile.as_ref())
                );
            } else {
                println!("[WARN] profile lacks weight or exercise minutes; default goal {FALLBACK_GOAL_ML} ml applies");
                issues.push("profile incomplete".to_string());
            }
        }
        Err(error) => {
            println!("[WARN] storage check failed: {error}");
            issues.push("storage unreachable".to_string());
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

async fn handle_serve() -> Result<()> {
    let config = load_or_default_config()?;
    config.ensure_bootstrap_files()?;
    let (manager, profiles) = open_manager(&config)?;

    info!("DailyDrops service started");

    tokio::select! {
        api_result = api::run_server(Arc::new(config), manager, profiles) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn open_manager(config: &Config) -> Result<(DayRecordManager, ProfileStore)> {
    let backend = store::open_backend(config)?;
    let profiles = ProfileStore::new(Arc::clone(&backend));
    let manager = DayRecordManager::open(
        RecordStore::new(backend),
        Box::new(profiles.clone()),
        Box::new(SystemClock),
        today(),
    );

    Ok((manager, profiles))
}

fn print_progress_line(manager: &DayRecordManager, date: NaiveDate) {
    let summary = manager.summary(date);
    println!(
        "{}: {} / {} ml ({:.0}%) - {}",
        summary.date,
        summary.total,
        summary.goal,
        summary.progress_percent,
        summary.status.label()
    );
}

fn print_profile(profile: &UserProfile) {
    let show = |value: Option<String>| value.unwrap_or_else(|| "not_set".to_string());

    println!("gender: {}", show(profile.gender.map(|gender| gender.name().to_string())));
    println!("age: {}", show(profile.age.map(|age| age.to_string())));
    println!("height_cm: {}", show(profile.height.map(|height| height.to_string())));
    println!("weight_kg: {}", show(profile.weight.map(|weight| weight.to_string())));
    println!(
        "exercise_minutes: {}",
        show(profile.exercise_minutes.map(|minutes| minutes.to_string()))
    );
    println!("daily_goal_ml: {}", calculate_daily_goal(Some(profile)));
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}
