//! Merchant identity resolution with confidence scoring
//!
//! Every merchant carries a confidence score in [0, 1] that only ever goes up.
//! Repeated sightings raise it slowly toward 0.9; the 0.7 threshold gates
//! automatic matching so low-confidence guesses cannot snowball into wrong
//! auto-links; explicit user confirmation is the only path to 1.0 and
//! retroactively repairs past mislabeling.

use chrono::Utc;
use tracing::debug;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::matcher::{normalize, MerchantMatcher, SubstringMatcher};
use crate::models::{GeoLocation, Merchant, NewMerchant, Transaction};

/// Confidence assigned to a freshly learned merchant
pub const INITIAL_CONFIDENCE: f64 = 0.3;
/// Per-sighting confidence increment once a merchant is established
pub const CONFIDENCE_STEP: f64 = 0.1;
/// Ceiling for automatically earned confidence; only confirmation reaches 1.0
pub const AUTO_CONFIDENCE_CAP: f64 = 0.9;
/// Minimum confidence for automatic transaction-to-merchant matching
pub const MATCH_THRESHOLD: f64 = 0.7;
/// Sightings required before confidence starts climbing
const ESTABLISHED_COUNT: i64 = 3;

/// Resolves raw merchant strings against a user's learned merchant set
pub struct MerchantResolver {
    db: Database,
    matcher: Box<dyn MerchantMatcher>,
}

impl MerchantResolver {
    /// Create a resolver with the default substring matching strategy
    pub fn new(db: Database) -> Self {
        Self::with_matcher(db, Box::new(SubstringMatcher))
    }

    /// Create a resolver with a custom matching strategy
    pub fn with_matcher(db: Database, matcher: Box<dyn MerchantMatcher>) -> Self {
        Self { db, matcher }
    }

    /// Find-or-create a merchant for a raw name sighting
    ///
    /// An existing merchant (matched fuzzily against its canonical name or any
    /// recorded variant) gets its sighting count bumped, the new variant
    /// recorded, and - once seen three or more times - its confidence raised
    /// by 0.1 up to the 0.9 cap. Confirmed merchants stay at 1.0. A location
    /// is only filled in when the merchant has none yet. Unknown names create
    /// a new merchant at confidence 0.3.
    pub fn learn_merchant(
        &self,
        user_id: &str,
        raw_name: &str,
        category: &str,
        location: Option<GeoLocation>,
    ) -> Result<Merchant> {
        if raw_name.trim().is_empty() {
            return Err(Error::InvalidData("Merchant name is required".to_string()));
        }

        let normalized = normalize(raw_name);

        if let Some(mut merchant) = self.find_match(user_id, &normalized, 0.0)? {
            if !merchant.raw_names.iter().any(|n| n == raw_name) {
                merchant.raw_names.push(raw_name.to_string());
            }
            merchant.transaction_count += 1;
            merchant.last_seen = Utc::now();

            if merchant.transaction_count >= ESTABLISHED_COUNT && !merchant.user_confirmed {
                merchant.confidence =
                    (merchant.confidence + CONFIDENCE_STEP).min(AUTO_CONFIDENCE_CAP);
            }

            if location.is_some() && !has_coordinates(&merchant.location) {
                merchant.location = location;
            }

            self.db.update_merchant(&merchant)?;
            debug!(
                merchant = %merchant.canonical_name,
                confidence = merchant.confidence,
                count = merchant.transaction_count,
                "updated learned merchant"
            );
            return Ok(merchant);
        }

        let new_merchant = NewMerchant {
            user_id: user_id.to_string(),
            canonical_name: raw_name.to_string(),
            raw_names: vec![raw_name.to_string()],
            category: category.to_string(),
            confidence: INITIAL_CONFIDENCE,
            user_confirmed: false,
            location,
            transaction_count: 1,
            last_seen: Utc::now(),
        };
        let id = self.db.insert_merchant(&new_merchant)?;
        debug!(merchant = raw_name, id, "learned new merchant");

        self.db
            .get_merchant(user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Merchant {} not found after insert", id)))
    }

    /// Match a transaction to an existing high-confidence merchant
    ///
    /// Only merchants at or above the 0.7 confidence threshold qualify; the
    /// first qualifying match in insertion order wins. Returns `None` for
    /// transactions without a raw merchant name.
    pub fn match_transaction(
        &self,
        user_id: &str,
        transaction: &Transaction,
    ) -> Result<Option<i64>> {
        let Some(merchant_name) = transaction.merchant_name.as_deref() else {
            return Ok(None);
        };

        let normalized = normalize(merchant_name);
        Ok(self
            .find_match(user_id, &normalized, MATCH_THRESHOLD)?
            .map(|m| m.id))
    }

    /// Confirm a merchant's canonical name (user action)
    ///
    /// Forces confidence to 1.0, marks the merchant confirmed, and relinks all
    /// historical transactions whose raw merchant name is among the variants.
    /// Fails with `NotFound` when the merchant does not belong to the user.
    pub fn confirm_merchant(
        &self,
        user_id: &str,
        merchant_id: i64,
        confirmed_name: &str,
    ) -> Result<Merchant> {
        if confirmed_name.trim().is_empty() {
            return Err(Error::InvalidData("Merchant name is required".to_string()));
        }
        self.db.confirm_merchant(user_id, merchant_id, confirmed_name)
    }

    /// Merchants worth asking the user about (unconfirmed, seen repeatedly,
    /// still below the matching threshold)
    pub fn merchants_needing_confirmation(&self, user_id: &str) -> Result<Vec<Merchant>> {
        self.db.merchants_needing_confirmation(user_id)
    }

    /// First merchant at or above `min_confidence` whose canonical name or any
    /// variant matches the normalized query
    fn find_match(
        &self,
        user_id: &str,
        normalized: &str,
        min_confidence: f64,
    ) -> Result<Option<Merchant>> {
        let merchants = self.db.merchants_with_min_confidence(user_id, min_confidence)?;

        Ok(merchants.into_iter().find(|m| {
            self.matcher.matches(normalized, &m.canonical_name)
                || m.raw_names
                    .iter()
                    .any(|raw| self.matcher.matches(normalized, raw))
        }))
    }
}

fn has_coordinates(location: &Option<GeoLocation>) -> bool {
    location.as_ref().map(|l| l.lat.is_some()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::RegexMatcher;

    fn resolver() -> (Database, MerchantResolver) {
        let db = Database::in_memory().unwrap();
        (db.clone(), MerchantResolver::new(db))
    }

    #[test]
    fn rejects_blank_merchant_name() {
        let (_db, resolver) = resolver();
        let err = resolver.learn_merchant("u1", "   ", "dining", None);
        assert!(matches!(err, Err(Error::InvalidData(_))));
    }

    #[test]
    fn new_merchant_starts_at_low_confidence() {
        let (_db, resolver) = resolver();
        let m = resolver
            .learn_merchant("u1", "Starbucks #123", "dining", None)
            .unwrap();
        assert_eq!(m.canonical_name, "Starbucks #123");
        assert_eq!(m.raw_names, vec!["Starbucks #123"]);
        assert_eq!(m.transaction_count, 1);
        assert!(!m.user_confirmed);
        assert!((m.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn repeated_sightings_raise_confidence_to_cap() {
        let (_db, resolver) = resolver();
        resolver
            .learn_merchant("u1", "Netflix.com", "streaming", None)
            .unwrap();

        // Second sighting: count 2, below the established threshold
        let m = resolver
            .learn_merchant("u1", "NETFLIX", "streaming", None)
            .unwrap();
        assert_eq!(m.transaction_count, 2);
        assert!((m.confidence - 0.3).abs() < 1e-9);

        // Sightings 3.. raise confidence by 0.1 each, capped at 0.9
        let mut last = m.confidence;
        for i in 0..10 {
            let m = resolver
                .learn_merchant("u1", "Netflix", "streaming", None)
                .unwrap();
            assert!(m.confidence >= last, "confidence decreased on sighting {}", i);
            assert!(m.confidence <= 0.9 + 1e-9);
            last = m.confidence;
        }
        assert!((last - 0.9).abs() < 1e-9);
    }

    #[test]
    fn variants_accumulate_without_duplicates() {
        let (_db, resolver) = resolver();
        resolver
            .learn_merchant("u1", "SHELL OIL 5771", "gas_stations", None)
            .unwrap();
        resolver.learn_merchant("u1", "Shell", "gas_stations", None).unwrap();
        let m = resolver.learn_merchant("u1", "Shell", "gas_stations", None).unwrap();
        assert_eq!(m.raw_names, vec!["SHELL OIL 5771", "Shell"]);
        assert_eq!(m.transaction_count, 3);
    }

    #[test]
    fn location_filled_only_when_absent() {
        let (_db, resolver) = resolver();
        resolver.learn_merchant("u1", "Trader Joes", "grocery_stores", None).unwrap();

        let seattle = GeoLocation {
            city: Some("Seattle".to_string()),
            lat: Some(47.6),
            lon: Some(-122.3),
            ..Default::default()
        };
        let m = resolver
            .learn_merchant("u1", "Trader Joes", "grocery_stores", Some(seattle))
            .unwrap();
        assert_eq!(m.location.as_ref().and_then(|l| l.lat), Some(47.6));

        let portland = GeoLocation {
            city: Some("Portland".to_string()),
            lat: Some(45.5),
            lon: Some(-122.6),
            ..Default::default()
        };
        let m = resolver
            .learn_merchant("u1", "Trader Joes", "grocery_stores", Some(portland))
            .unwrap();
        // Existing coordinates win
        assert_eq!(m.location.as_ref().and_then(|l| l.lat), Some(47.6));
    }

    #[test]
    fn merchants_are_scoped_per_user() {
        let (_db, resolver) = resolver();
        resolver.learn_merchant("u1", "Costco", "grocery_stores", None).unwrap();
        let m = resolver.learn_merchant("u2", "Costco", "grocery_stores", None).unwrap();
        assert_eq!(m.transaction_count, 1, "u2 must get a fresh merchant");
    }

    #[test]
    fn confidence_is_monotonic_across_learn_and_confirm() {
        let (_db, resolver) = resolver();
        let mut confidence = 0.0;
        let mut id = 0;
        for _ in 0..5 {
            let m = resolver.learn_merchant("u1", "Spotify", "streaming", None).unwrap();
            assert!(m.confidence >= confidence);
            confidence = m.confidence;
            id = m.id;
        }

        let m = resolver.confirm_merchant("u1", id, "Spotify").unwrap();
        assert!((m.confidence - 1.0).abs() < 1e-9);
        assert!(m.user_confirmed);

        // Further sightings must not pull a confirmed merchant back down
        let m = resolver.learn_merchant("u1", "Spotify", "streaming", None).unwrap();
        assert!((m.confidence - 1.0).abs() < 1e-9);
        assert!(m.user_confirmed);
    }

    #[test]
    fn confirm_rejects_foreign_merchant() {
        let (_db, resolver) = resolver();
        let m = resolver.learn_merchant("u1", "Hulu", "streaming", None).unwrap();
        let err = resolver.confirm_merchant("u2", m.id, "Hulu");
        assert!(matches!(err, Err(Error::NotFound(_))));
    }

    fn transaction_with_merchant(merchant: &str) -> Transaction {
        Transaction {
            id: 0,
            user_id: "u1".to_string(),
            item_id: "item-1".to_string(),
            provider_transaction_id: "ptx-1".to_string(),
            account_id: "acc-1".to_string(),
            account_name: "Checking".to_string(),
            account_type: crate::models::AccountType::Depository,
            amount: -12.5,
            date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            authorized_date: None,
            merchant_name: Some(merchant.to_string()),
            merchant_id: None,
            category: vec![],
            primary_category: "dining".to_string(),
            pending: false,
            currency_code: "USD".to_string(),
            location: None,
            payment_meta: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn match_requires_confidence_threshold() {
        let (db, resolver) = resolver();
        let mut m = resolver
            .learn_merchant("u1", "Blue Bottle", "dining", None)
            .unwrap();

        // Exact raw-name match but confidence 0.65: must not auto-match
        m.confidence = 0.65;
        db.update_merchant(&m).unwrap();
        let tx = transaction_with_merchant("Blue Bottle");
        assert_eq!(resolver.match_transaction("u1", &tx).unwrap(), None);

        // At exactly 0.7 the same lookup qualifies
        m.confidence = 0.7;
        db.update_merchant(&m).unwrap();
        assert_eq!(resolver.match_transaction("u1", &tx).unwrap(), Some(m.id));
    }

    #[test]
    fn match_without_merchant_name_is_none() {
        let (_db, resolver) = resolver();
        let mut tx = transaction_with_merchant("anything");
        tx.merchant_name = None;
        assert_eq!(resolver.match_transaction("u1", &tx).unwrap(), None);
    }

    #[test]
    fn regex_matcher_strategy_is_substitutable() {
        let db = Database::in_memory().unwrap();
        let resolver = MerchantResolver::with_matcher(db, Box::new(RegexMatcher));
        resolver.learn_merchant("u1", "Peets Coffee", "dining", None).unwrap();
        let m = resolver.learn_merchant("u1", "PEETS", "dining", None).unwrap();
        assert_eq!(m.transaction_count, 2, "PEETS should fuzzy-match Peets Coffee");
    }
}
