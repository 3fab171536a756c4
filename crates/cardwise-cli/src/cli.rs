//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cardwise - Transaction intelligence for your spending
#[derive(Parser)]
#[command(name = "cardwise")]
#[command(about = "Merchant resolution, spending analytics, and card rewards", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "cardwise.db", global = true)]
    pub db: PathBuf,

    /// User whose data to operate on
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Ingest a provider transaction batch from a JSON file
    Ingest {
        /// JSON file containing an array of provider transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Provider item the batch belongs to
        #[arg(long, default_value = "manual")]
        item: String,
    },

    /// Spending, income, and recurring-expense reports
    Report {
        #[command(subcommand)]
        kind: ReportKind,
    },

    /// Predict likely upcoming spends
    Predict,

    /// Manage learned merchants (list, review, confirm)
    Merchants {
        #[command(subcommand)]
        action: Option<MerchantsAction>,
    },

    /// Recommend the best card for a category at a monthly spend
    BestCard {
        /// Reward category (e.g. dining, grocery_stores, all)
        #[arg(short, long)]
        category: String,

        /// Expected monthly spend in the category, USD
        #[arg(short, long, default_value = "0")]
        monthly_spend: f64,
    },
}

#[derive(Subcommand)]
pub enum ReportKind {
    /// Spending by category over a trailing window
    Patterns {
        /// Window length in calendar months
        #[arg(short, long, default_value = "3")]
        months: u32,
    },

    /// Income cadence analysis
    Income {
        /// Window length in calendar months
        #[arg(short, long, default_value = "6")]
        months: u32,
    },

    /// Detected recurring expenses
    Recurring {
        /// Window length in calendar months
        #[arg(short, long, default_value = "6")]
        months: u32,
    },
}

#[derive(Subcommand)]
pub enum MerchantsAction {
    /// List all learned merchants
    List,

    /// Show merchants that would benefit from confirmation
    Review,

    /// Confirm a merchant's canonical name
    Confirm {
        /// Merchant ID (from `merchants list`)
        #[arg(long)]
        id: i64,

        /// Canonical name to set
        #[arg(long)]
        name: String,
    },
}
