pub mod onboard;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "dailydrops", about = "Personal hydration tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive profile setup
    Onboard,
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Print the goal computed from the current profile
    Goal,
    /// Log a drink
    Add {
        #[arg(allow_negative_numbers = true)]
        amount: i64,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Log a configured quick-add amount of water
    Quick {
        slot: usize,
        #[arg(long)]
        date: Option<String>,
    },
    /// Remove every drink logged for a day
    Clear {
        #[arg(long)]
        date: Option<String>,
    },
    Show {
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Calendar {
        /// YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    History {
        #[arg(long)]
        limit: Option<usize>,
    },
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    Status,
    Doctor,
    /// Run the local JSON API
    Serve,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommands {
    Set {
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        height: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        exercise_minutes: Option<f64>,
    },
    Get,
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
