//! Merchant operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{GeoLocation, Merchant, NewMerchant};

impl Database {
    /// Insert a merchant and return its ID
    pub fn insert_merchant(&self, merchant: &NewMerchant) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            INSERT INTO merchants (
                user_id, canonical_name, raw_names, category, confidence,
                user_confirmed, location, transaction_count, last_seen
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                merchant.user_id,
                merchant.canonical_name,
                serde_json::to_string(&merchant.raw_names)?,
                merchant.category,
                merchant.confidence,
                merchant.user_confirmed,
                merchant
                    .location
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                merchant.transaction_count,
                merchant.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Persist the mutable fields of a merchant after a match or confirmation
    pub fn update_merchant(&self, merchant: &Merchant) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            r#"
            UPDATE merchants
            SET canonical_name = ?,
                raw_names = ?,
                category = ?,
                confidence = ?,
                user_confirmed = ?,
                location = ?,
                transaction_count = ?,
                last_seen = ?
            WHERE id = ?
            "#,
            params![
                merchant.canonical_name,
                serde_json::to_string(&merchant.raw_names)?,
                merchant.category,
                merchant.confidence,
                merchant.user_confirmed,
                merchant
                    .location
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                merchant.transaction_count,
                merchant.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
                merchant.id,
            ],
        )?;

        Ok(())
    }

    /// Get a merchant by ID, scoped to its owning user
    pub fn get_merchant(&self, user_id: &str, id: i64) -> Result<Option<Merchant>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM merchants WHERE id = ? AND user_id = ?",
            MERCHANT_COLUMNS
        ))?;

        let merchant = stmt
            .query_row(params![id, user_id], |row| Self::row_to_merchant(row))
            .optional()?;

        Ok(merchant)
    }

    /// List all merchants for a user in insertion order
    ///
    /// Insertion order makes "first qualifying match" deterministic for the
    /// resolver's fuzzy scan.
    pub fn list_merchants(&self, user_id: &str) -> Result<Vec<Merchant>> {
        self.merchants_with_min_confidence(user_id, 0.0)
    }

    /// List a user's merchants at or above a confidence floor, in insertion order
    pub fn merchants_with_min_confidence(
        &self,
        user_id: &str,
        min_confidence: f64,
    ) -> Result<Vec<Merchant>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM merchants
            WHERE user_id = ? AND confidence >= ?
            ORDER BY id
            "#,
            MERCHANT_COLUMNS
        ))?;

        let merchants = stmt
            .query_map(params![user_id, min_confidence], |row| {
                Self::row_to_merchant(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(merchants)
    }

    /// Merchants that would benefit from user confirmation
    ///
    /// Unconfirmed, seen at least twice, still below the automatic matching
    /// threshold. Most-seen first, top 10.
    pub fn merchants_needing_confirmation(&self, user_id: &str) -> Result<Vec<Merchant>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM merchants
            WHERE user_id = ? AND user_confirmed = 0 AND transaction_count >= 2 AND confidence < 0.7
            ORDER BY transaction_count DESC, last_seen DESC
            LIMIT 10
            "#,
            MERCHANT_COLUMNS
        ))?;

        let merchants = stmt
            .query_map(params![user_id], |row| Self::row_to_merchant(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(merchants)
    }

    /// Confirm a merchant's canonical name and retroactively relink transactions
    ///
    /// Sets the canonical name, marks the merchant confirmed at confidence 1.0,
    /// and points every transaction of this user whose raw merchant name is
    /// among the recorded variants at this merchant. The variant read and the
    /// relabel share one SQLite transaction so the relabel filter can never see
    /// a stale variant set.
    pub fn confirm_merchant(
        &self,
        user_id: &str,
        merchant_id: i64,
        confirmed_name: &str,
    ) -> Result<Merchant> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut merchant = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {} FROM merchants WHERE id = ? AND user_id = ?",
                MERCHANT_COLUMNS
            ))?;
            stmt.query_row(params![merchant_id, user_id], |row| {
                Self::row_to_merchant(row)
            })
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("Merchant {} not found", merchant_id)))?
        };

        merchant.canonical_name = confirmed_name.to_string();
        merchant.user_confirmed = true;
        merchant.confidence = 1.0;
        if !merchant.raw_names.iter().any(|n| n == confirmed_name) {
            merchant.raw_names.push(confirmed_name.to_string());
        }
        merchant.last_seen = Utc::now();

        tx.execute(
            r#"
            UPDATE merchants
            SET canonical_name = ?, raw_names = ?, confidence = ?, user_confirmed = 1, last_seen = ?
            WHERE id = ?
            "#,
            params![
                merchant.canonical_name,
                serde_json::to_string(&merchant.raw_names)?,
                merchant.confidence,
                merchant.last_seen.format("%Y-%m-%d %H:%M:%S").to_string(),
                merchant.id,
            ],
        )?;

        // Bulk relabel every historical transaction using any recorded variant
        let placeholders: Vec<String> = merchant.raw_names.iter().map(|_| "?".to_string()).collect();
        let sql = format!(
            "UPDATE transactions SET merchant_id = ? WHERE user_id = ? AND merchant_name IN ({})",
            placeholders.join(", ")
        );

        let mut relabel_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(merchant.id), Box::new(user_id.to_string())];
        for name in &merchant.raw_names {
            relabel_params.push(Box::new(name.clone()));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            relabel_params.iter().map(|p| p.as_ref()).collect();
        tx.execute(&sql, param_refs.as_slice())?;

        tx.commit()?;

        Ok(merchant)
    }

    /// Count a user's merchants
    pub fn count_merchants(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM merchants WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Helper to convert a row to Merchant
    ///
    /// Column order must match `MERCHANT_COLUMNS`.
    pub(crate) fn row_to_merchant(row: &rusqlite::Row) -> rusqlite::Result<Merchant> {
        let raw_names_json: String = row.get(3)?;
        let confirmed_int: i64 = row.get(6)?;
        let location_json: Option<String> = row.get(7)?;
        let last_seen_str: String = row.get(9)?;
        let created_at_str: String = row.get(10)?;

        Ok(Merchant {
            id: row.get(0)?,
            user_id: row.get(1)?,
            canonical_name: row.get(2)?,
            raw_names: serde_json::from_str(&raw_names_json).unwrap_or_default(),
            category: row.get(4)?,
            confidence: row.get(5)?,
            user_confirmed: confirmed_int != 0,
            location: location_json.and_then(|s| serde_json::from_str::<GeoLocation>(&s).ok()),
            transaction_count: row.get(8)?,
            last_seen: parse_datetime(&last_seen_str),
            created_at: parse_datetime(&created_at_str),
        })
    }
}

/// Shared SELECT column list; order must match `row_to_merchant`
pub(crate) const MERCHANT_COLUMNS: &str = "id, user_id, canonical_name, raw_names, category, confidence, user_confirmed, \
     location, transaction_count, last_seen, created_at";
