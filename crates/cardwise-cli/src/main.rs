//! Cardwise CLI - Transaction intelligence for your spending
//!
//! Usage:
//!   cardwise init                          Initialize database
//!   cardwise ingest --file batch.json      Ingest a provider transaction batch
//!   cardwise report patterns               Spending by category
//!   cardwise predict                       Likely upcoming spends
//!   cardwise best-card --category dining --monthly-spend 200

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Ingest { file, item } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_ingest(&db, &cli.user, &item, &file)
        }
        Commands::Report { kind } => {
            let db = commands::open_db(&cli.db)?;
            match kind {
                ReportKind::Patterns { months } => {
                    commands::cmd_report_patterns(&db, &cli.user, months)
                }
                ReportKind::Income { months } => commands::cmd_report_income(&db, &cli.user, months),
                ReportKind::Recurring { months } => {
                    commands::cmd_report_recurring(&db, &cli.user, months)
                }
            }
        }
        Commands::Predict => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_predict(&db, &cli.user)
        }
        Commands::Merchants { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(MerchantsAction::List) => commands::cmd_merchants_list(&db, &cli.user),
                Some(MerchantsAction::Review) => commands::cmd_merchants_review(&db, &cli.user),
                Some(MerchantsAction::Confirm { id, name }) => {
                    commands::cmd_merchants_confirm(&db, &cli.user, id, &name)
                }
            }
        }
        Commands::BestCard {
            category,
            monthly_spend,
        } => commands::cmd_best_card(&category, monthly_spend),
    }
}
