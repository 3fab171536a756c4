//! Ingestion boundary for provider transaction feeds
//!
//! Accepts a batch of provider-shaped transactions, normalizes defaults,
//! deduplicates on the provider transaction id, and runs merchant resolution
//! on every newly inserted row. One bad record never aborts the batch: its
//! resolution failure is logged and counted, the stored transaction stays
//! unlinked.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{Database, InsertOutcome};
use crate::error::Result;
use crate::models::{AccountType, GeoLocation, NewTransaction, PaymentMeta};
use crate::resolver::MerchantResolver;

/// A transaction as delivered by the upstream provider feed
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingTransaction {
    pub transaction_id: String,
    pub account_id: String,
    pub account_name: Option<String>,
    pub account_type: Option<AccountType>,
    /// Signed: negative is an expense, positive is income
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub authorized_date: Option<NaiveDate>,
    /// Cleaned merchant name when the provider resolved one
    #[serde(default)]
    pub merchant_name: Option<String>,
    /// Raw transaction description, the fallback merchant name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
    /// Provider's primary personal-finance category
    #[serde(default)]
    pub primary_category: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub payment_meta: Option<PaymentMeta>,
}

impl IncomingTransaction {
    /// Primary category with fallbacks: provider primary, then the first
    /// category label, then "other"
    fn primary_category_or_default(&self) -> String {
        self.primary_category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.category.first().map(|s| s.as_str()))
            .filter(|c| !c.trim().is_empty())
            .unwrap_or("other")
            .to_string()
    }

    /// Convert to a storable record, applying ingestion defaults
    fn into_record(self, item_id: &str) -> NewTransaction {
        let primary_category = self.primary_category_or_default();
        NewTransaction {
            item_id: item_id.to_string(),
            provider_transaction_id: self.transaction_id,
            account_id: self.account_id,
            account_name: self
                .account_name
                .unwrap_or_else(|| "Unknown Account".to_string()),
            account_type: self.account_type.unwrap_or_default(),
            amount: self.amount,
            date: self.date,
            authorized_date: self.authorized_date,
            merchant_name: self.merchant_name.or(self.name),
            category: self.category,
            primary_category,
            pending: self.pending,
            currency_code: self.iso_currency_code.unwrap_or_else(|| "USD".to_string()),
            location: self.location,
            payment_meta: self.payment_meta,
        }
    }
}

/// Per-batch ingestion counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncSummary {
    /// New transactions stored
    pub ingested: usize,
    /// Records skipped because the provider id was already seen
    pub duplicates: usize,
    /// New transactions linked to an existing merchant
    pub linked: usize,
    /// New transactions that created or reinforced a learned merchant
    pub learned: usize,
    /// Resolution failures; the transactions are stored but unlinked
    pub failures: usize,
}

/// Ingest a batch of provider transactions for one user and item
pub fn sync_batch(
    db: &Database,
    resolver: &MerchantResolver,
    user_id: &str,
    item_id: &str,
    batch: Vec<IncomingTransaction>,
) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();

    for incoming in batch {
        let record = incoming.into_record(item_id);

        let transaction_id = match db.insert_transaction(user_id, &record)? {
            InsertOutcome::Duplicate(id) => {
                debug!(
                    provider_id = %record.provider_transaction_id,
                    existing_id = id,
                    "skipping duplicate transaction"
                );
                summary.duplicates += 1;
                continue;
            }
            InsertOutcome::Inserted(id) => id,
        };
        summary.ingested += 1;

        let has_merchant = record
            .merchant_name
            .as_deref()
            .is_some_and(|name| !name.is_empty());
        if !has_merchant {
            continue;
        }

        match resolve_and_link(db, resolver, user_id, transaction_id) {
            Ok(Resolution::Matched) => summary.linked += 1,
            Ok(Resolution::Learned) => summary.learned += 1,
            Ok(Resolution::Skipped) => {}
            Err(err) => {
                warn!(
                    transaction_id,
                    error = %err,
                    "merchant resolution failed; transaction stored unlinked"
                );
                summary.failures += 1;
            }
        }
    }

    info!(
        user_id,
        item_id,
        ingested = summary.ingested,
        duplicates = summary.duplicates,
        linked = summary.linked,
        learned = summary.learned,
        failures = summary.failures,
        "transaction batch ingested"
    );

    Ok(summary)
}

enum Resolution {
    Matched,
    Learned,
    Skipped,
}

fn resolve_and_link(
    db: &Database,
    resolver: &MerchantResolver,
    user_id: &str,
    transaction_id: i64,
) -> Result<Resolution> {
    let Some(transaction) = db.get_transaction(transaction_id)? else {
        return Ok(Resolution::Skipped);
    };

    if let Some(merchant_id) = resolver.match_transaction(user_id, &transaction)? {
        db.link_merchant(transaction_id, merchant_id)?;
        return Ok(Resolution::Matched);
    }

    let Some(raw_name) = transaction.merchant_name.as_deref() else {
        return Ok(Resolution::Skipped);
    };
    let merchant = resolver.learn_merchant(
        user_id,
        raw_name,
        &transaction.primary_category,
        transaction.location.clone(),
    )?;
    db.link_merchant(transaction_id, merchant.id)?;
    Ok(Resolution::Learned)
}
