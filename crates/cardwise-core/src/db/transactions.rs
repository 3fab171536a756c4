//! Transaction operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{GeoLocation, NewTransaction, PaymentMeta, Transaction};

/// Result of inserting a transaction
#[derive(Debug, Clone)]
pub enum InsertOutcome {
    /// Transaction was inserted, contains the new transaction ID
    Inserted(i64),
    /// Provider transaction id was already seen, contains the existing ID
    Duplicate(i64),
}

/// Direction of money movement for windowed queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Positive amounts (income)
    Inflow,
    /// Negative amounts (expenses)
    Outflow,
}

impl Database {
    /// Insert a transaction, deduplicating on the provider transaction id
    ///
    /// A transaction is never re-inserted for the same provider id; callers
    /// get back the existing row id instead.
    pub fn insert_transaction(&self, user_id: &str, tx: &NewTransaction) -> Result<InsertOutcome> {
        let conn = self.conn()?;

        // Check for duplicate
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE provider_transaction_id = ?",
                params![tx.provider_transaction_id],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_id) = existing {
            return Ok(InsertOutcome::Duplicate(existing_id));
        }

        conn.execute(
            r#"
            INSERT INTO transactions (
                user_id, item_id, provider_transaction_id, account_id, account_name,
                account_type, amount, date, authorized_date, merchant_name,
                category, primary_category, pending, currency_code, location, payment_meta
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                tx.item_id,
                tx.provider_transaction_id,
                tx.account_id,
                tx.account_name,
                tx.account_type.as_str(),
                tx.amount,
                tx.date.to_string(),
                tx.authorized_date.map(|d| d.to_string()),
                tx.merchant_name,
                serde_json::to_string(&tx.category)?,
                tx.primary_category,
                tx.pending,
                tx.currency_code,
                tx.location
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                tx.payment_meta
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
            ],
        )?;

        Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
    }

    /// Attach a resolved merchant reference to a transaction
    pub fn link_merchant(&self, transaction_id: i64, merchant_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE transactions SET merchant_id = ? WHERE id = ?",
            params![merchant_id, transaction_id],
        )?;
        Ok(())
    }

    /// Get a single transaction by ID
    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))?;

        let transaction = stmt
            .query_row(params![id], |row| Self::row_to_transaction(row))
            .optional()?;

        Ok(transaction)
    }

    /// List a user's transactions, newest first
    pub fn list_transactions(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE user_id = ?
            ORDER BY date DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            TRANSACTION_COLUMNS
        ))?;

        let transactions = stmt
            .query_map(params![user_id, limit, offset], |row| {
                Self::row_to_transaction(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Non-pending expenses for a user since `since`, newest first
    pub fn spending_transactions(&self, user_id: &str, since: NaiveDate) -> Result<Vec<Transaction>> {
        self.window_transactions(user_id, since, Flow::Outflow, false)
    }

    /// Non-pending income for a user since `since`, newest first
    pub fn income_transactions(&self, user_id: &str, since: NaiveDate) -> Result<Vec<Transaction>> {
        self.window_transactions(user_id, since, Flow::Inflow, false)
    }

    /// Non-pending expenses that carry a raw merchant name, newest first
    pub fn merchant_spending_transactions(
        &self,
        user_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        self.window_transactions(user_id, since, Flow::Outflow, true)
    }

    fn window_transactions(
        &self,
        user_id: &str,
        since: NaiveDate,
        flow: Flow,
        require_merchant: bool,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let amount_cond = match flow {
            Flow::Inflow => "amount > 0",
            Flow::Outflow => "amount < 0",
        };
        let merchant_cond = if require_merchant {
            "AND merchant_name IS NOT NULL AND merchant_name != ''"
        } else {
            ""
        };

        let sql = format!(
            r#"
            SELECT {}
            FROM transactions
            WHERE user_id = ? AND {} AND pending = 0 AND date >= ? {}
            ORDER BY date DESC, id DESC
            "#,
            TRANSACTION_COLUMNS, amount_cond, merchant_cond
        );

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params![user_id, since.to_string()], |row| {
                Self::row_to_transaction(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// Find any transaction for a user with the given raw merchant name
    ///
    /// Used to pick a representative category for a recurring merchant.
    pub fn find_transaction_by_merchant(
        &self,
        user_id: &str,
        merchant_name: &str,
    ) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? AND merchant_name = ? ORDER BY id LIMIT 1",
            TRANSACTION_COLUMNS
        ))?;

        let transaction = stmt
            .query_row(params![user_id, merchant_name], |row| {
                Self::row_to_transaction(row)
            })
            .optional()?;

        Ok(transaction)
    }

    /// Count a user's transactions
    pub fn count_transactions(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Count transactions linked to a merchant
    pub fn count_linked_transactions(&self, merchant_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE merchant_id = ?",
            params![merchant_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Helper to convert a row to Transaction
    ///
    /// Column order must match `TRANSACTION_COLUMNS`.
    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let account_type_str: String = row.get(6)?;
        let date_str: String = row.get(8)?;
        let authorized_str: Option<String> = row.get(9)?;
        let category_json: String = row.get(12)?;
        let pending_int: i64 = row.get(14)?;
        let location_json: Option<String> = row.get(16)?;
        let payment_meta_json: Option<String> = row.get(17)?;
        let created_at_str: String = row.get(18)?;

        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            item_id: row.get(2)?,
            provider_transaction_id: row.get(3)?,
            account_id: row.get(4)?,
            account_name: row.get(5)?,
            account_type: account_type_str.parse().unwrap_or_default(),
            amount: row.get(7)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            authorized_date: authorized_str
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            merchant_name: row.get(10)?,
            merchant_id: row.get(11)?,
            category: serde_json::from_str(&category_json).unwrap_or_default(),
            primary_category: row.get(13)?,
            pending: pending_int != 0,
            currency_code: row.get(15)?,
            location: location_json.and_then(|s| serde_json::from_str::<GeoLocation>(&s).ok()),
            payment_meta: payment_meta_json
                .and_then(|s| serde_json::from_str::<PaymentMeta>(&s).ok()),
            created_at: parse_datetime(&created_at_str),
        })
    }
}

/// Shared SELECT column list; order must match `row_to_transaction`
pub(crate) const TRANSACTION_COLUMNS: &str = "id, user_id, item_id, provider_transaction_id, account_id, account_name, account_type, \
     amount, date, authorized_date, merchant_name, merchant_id, category, primary_category, \
     pending, currency_code, location, payment_meta, created_at";
