//! Cardwise Core Library
//!
//! Transaction-intelligence pipeline for the Cardwise personal finance tool:
//! - Database access and migrations
//! - Merchant identity resolution with confidence scoring
//! - Spending, income-cadence, and recurring-expense analytics
//! - Short-horizon spend predictions
//! - Credit-card reward optimization over a static catalog
//! - Ingestion boundary with provider-id deduplication

pub mod analytics;
pub mod db;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod models;
pub mod predict;
pub mod resolver;
pub mod rewards;

pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{IncomingTransaction, SyncSummary};
pub use matcher::{MerchantMatcher, RegexMatcher, SubstringMatcher};
pub use resolver::MerchantResolver;
pub use rewards::{best_card_for_category, CreditCard, RewardRule};
