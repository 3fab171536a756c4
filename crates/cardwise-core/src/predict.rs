//! Near-term spend prediction
//!
//! Blends two signals: recurring expenses falling due within the next week
//! (high probability, known amount) and the top spending categories from the
//! trailing quarter (lower probability, amount estimated as a daily slice of
//! the monthly average). Output is sorted most-likely first.

use chrono::NaiveDate;

use crate::analytics;
use crate::db::Database;
use crate::error::Result;
use crate::models::Prediction;

const RECURRING_WINDOW_MONTHS: u32 = 6;
const PATTERN_WINDOW_MONTHS: u32 = 3;
const DUE_SOON_DAYS: i64 = 7;
const RECENT_ACTIVITY_DAYS: i64 = 30;

/// Predict the user's likely upcoming spends as of today (UTC)
pub fn next_spends(db: &Database, user_id: &str) -> Result<Vec<Prediction>> {
    next_spends_as_of(db, user_id, analytics::today_utc())
}

pub fn next_spends_as_of(
    db: &Database,
    user_id: &str,
    as_of: NaiveDate,
) -> Result<Vec<Prediction>> {
    let mut predictions: Vec<Prediction> = Vec::new();

    // Recurring charges due within a week are near-certain. Category comes
    // from a representative transaction of the same merchant; a recurring
    // entry for an already-predicted category replaces the earlier one.
    let recurring = analytics::recurring_expenses_as_of(db, user_id, RECURRING_WINDOW_MONTHS, as_of)?;
    for expense in &recurring {
        let Some(due) = expense.next_expected else {
            continue;
        };
        if due <= as_of || (due - as_of).num_days() > DUE_SOON_DAYS {
            continue;
        }

        let category = db
            .find_transaction_by_merchant(user_id, &expense.merchant_name)?
            .map(|tx| tx.primary_category)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "other".to_string());

        let prediction = Prediction {
            category: category.clone(),
            probability: 0.9,
            expected_amount: Some(expense.amount),
        };
        match predictions.iter_mut().find(|p| p.category == category) {
            Some(existing) => *existing = prediction,
            None => predictions.push(prediction),
        }
    }

    // Top spending categories, skipping any already covered by a recurring
    // prediction. Recently active categories get the higher probability.
    let patterns = analytics::spending_by_category_as_of(db, user_id, PATTERN_WINDOW_MONTHS, as_of)?;
    for pattern in patterns.iter().take(5) {
        if predictions.iter().any(|p| p.category == pattern.category) {
            continue;
        }

        let probability = match pattern.last_transaction {
            Some(last) if (as_of - last).num_days() < RECENT_ACTIVITY_DAYS => 0.6,
            _ => 0.4,
        };

        predictions.push(Prediction {
            category: pattern.category.clone(),
            probability,
            expected_amount: Some(pattern.monthly_average / 30.0),
        });
    }

    predictions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
    Ok(predictions)
}
