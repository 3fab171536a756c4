//! Domain models for Cardwise

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Account types as reported by the bank-data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Depository,
    Credit,
    Loan,
    Investment,
    #[default]
    Other,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Depository => "depository",
            Self::Credit => "credit",
            Self::Loan => "loan",
            Self::Investment => "investment",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "depository" => Ok(Self::Depository),
            "credit" => Ok(Self::Credit),
            "loan" => Ok(Self::Loan),
            "investment" => Ok(Self::Investment),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown account type: {}", s)),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cadence bucket inferred from inter-transaction gaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
    #[default]
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
            Self::Irregular => "irregular",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" => Ok(Self::Yearly),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Geo attributes attached to a transaction or merchant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Payment metadata as reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentMeta {
    pub reference_number: Option<String>,
    pub ppd_id: Option<String>,
    pub payee: Option<String>,
    pub payer: Option<String>,
}

/// A bank transaction
///
/// Immutable once created, except for `merchant_id` which is attached after
/// merchant resolution. `amount` is signed: positive = inflow (income),
/// negative = outflow (expense).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: String,
    /// Source bank-link item this transaction came from
    pub item_id: String,
    /// Provider-assigned unique id, the global dedup key
    pub provider_transaction_id: String,
    pub account_id: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub amount: f64,
    pub date: NaiveDate,
    pub authorized_date: Option<NaiveDate>,
    /// Raw merchant name as reported by the provider
    pub merchant_name: Option<String>,
    /// Resolved merchant reference, set after resolution
    pub merchant_id: Option<i64>,
    /// Provider category label list
    pub category: Vec<String>,
    pub primary_category: String,
    pub pending: bool,
    pub currency_code: String,
    pub location: Option<GeoLocation>,
    pub payment_meta: Option<PaymentMeta>,
    pub created_at: DateTime<Utc>,
}

/// A transaction record ready for insertion
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub item_id: String,
    pub provider_transaction_id: String,
    pub account_id: String,
    pub account_name: String,
    pub account_type: AccountType,
    pub amount: f64,
    pub date: NaiveDate,
    pub authorized_date: Option<NaiveDate>,
    pub merchant_name: Option<String>,
    pub category: Vec<String>,
    pub primary_category: String,
    pub pending: bool,
    pub currency_code: String,
    pub location: Option<GeoLocation>,
    pub payment_meta: Option<PaymentMeta>,
}

/// A per-user learned merchant identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: i64,
    pub user_id: String,
    /// User-confirmed or best-known display name
    pub canonical_name: String,
    /// All raw name variants observed for this merchant
    pub raw_names: Vec<String>,
    pub category: String,
    /// Trust signal in [0, 1]; gates automatic matching, never decreases
    pub confidence: f64,
    pub user_confirmed: bool,
    pub location: Option<GeoLocation>,
    pub transaction_count: i64,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A merchant record ready for insertion
#[derive(Debug, Clone)]
pub struct NewMerchant {
    pub user_id: String,
    pub canonical_name: String,
    pub raw_names: Vec<String>,
    pub category: String,
    pub confidence: f64,
    pub user_confirmed: bool,
    pub location: Option<GeoLocation>,
    pub transaction_count: i64,
    pub last_seen: DateTime<Utc>,
}

/// Per-category spending aggregate over a trailing window (derived, not persisted)
#[derive(Debug, Clone, Serialize)]
pub struct SpendingPattern {
    pub category: String,
    /// Sum of absolute expense amounts divided by the window length in months
    pub monthly_average: f64,
    pub transaction_count: i64,
    pub last_transaction: Option<NaiveDate>,
}

/// Income cadence inferred from inflow transactions (derived)
#[derive(Debug, Clone, Serialize)]
pub struct IncomePattern {
    /// Mean of per-calendar-month inflow totals
    pub monthly_average: f64,
    pub frequency: Frequency,
    pub last_income: Option<NaiveDate>,
    pub next_expected: Option<NaiveDate>,
}

/// A detected recurring expense (derived)
#[derive(Debug, Clone, Serialize)]
pub struct RecurringExpense {
    pub merchant_name: String,
    /// Mean absolute amount across the group
    pub amount: f64,
    pub frequency: Frequency,
    /// Count-based: min(count / 6, 1)
    pub confidence: f64,
    pub last_seen: NaiveDate,
    pub next_expected: Option<NaiveDate>,
}

/// A ranked next-likely-spend prediction
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub category: String,
    pub probability: f64,
    pub expected_amount: Option<f64>,
}
