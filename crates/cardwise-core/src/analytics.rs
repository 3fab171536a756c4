//! Transaction aggregation: spending patterns, income cadence, recurring expenses
//!
//! All windows are trailing *calendar* months pinned to UTC: "last 6 months"
//! subtracts 6 calendar months from the reference date, never 180 days, so
//! monthly averages reproduce across environments. Every function has an
//! `*_as_of` form taking an explicit reference date; the plain forms use
//! today's UTC date.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate, Utc};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Frequency, IncomePattern, RecurringExpense, SpendingPattern};

/// Today's date in UTC, the pinned reference timezone for all windows
pub(crate) fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Start of a trailing window of `months` calendar months ending at `as_of`
fn window_start(as_of: NaiveDate, months: u32) -> NaiveDate {
    as_of
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Mean gap in days between consecutive dates (ascending); 0.0 for fewer than two
fn mean_gap_days(sorted_dates: &[NaiveDate]) -> f64 {
    if sorted_dates.len() < 2 {
        return 0.0;
    }
    let total: i64 = sorted_dates
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .sum();
    total as f64 / (sorted_dates.len() - 1) as f64
}

/// Income cadence bands over the mean inter-transaction gap
fn income_cadence(days: f64) -> Frequency {
    if (25.0..=35.0).contains(&days) {
        Frequency::Monthly
    } else if (12.0..=18.0).contains(&days) {
        Frequency::Biweekly
    } else if (5.0..=9.0).contains(&days) {
        Frequency::Weekly
    } else {
        Frequency::Irregular
    }
}

/// Recurring-expense cadence bands; monthly is the default bucket when no
/// band matches
fn recurring_cadence(days: f64) -> Frequency {
    if (25.0..=35.0).contains(&days) {
        Frequency::Monthly
    } else if (85.0..=95.0).contains(&days) {
        Frequency::Quarterly
    } else if (350.0..=380.0).contains(&days) {
        Frequency::Yearly
    } else if (5.0..=9.0).contains(&days) {
        Frequency::Weekly
    } else {
        Frequency::Monthly
    }
}

/// Project the next expected date one cadence period after `last`
fn project_next(last: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    match frequency {
        Frequency::Monthly => last.checked_add_months(Months::new(1)),
        Frequency::Quarterly => last.checked_add_months(Months::new(3)),
        Frequency::Yearly => last.checked_add_months(Months::new(12)),
        Frequency::Biweekly => Some(last + Duration::days(14)),
        Frequency::Weekly => Some(last + Duration::days(7)),
        Frequency::Irregular => None,
    }
}

/// Category spending aggregates over the trailing `months` window,
/// highest monthly average first
pub fn spending_by_category(
    db: &Database,
    user_id: &str,
    months: u32,
) -> Result<Vec<SpendingPattern>> {
    spending_by_category_as_of(db, user_id, months, today_utc())
}

pub fn spending_by_category_as_of(
    db: &Database,
    user_id: &str,
    months: u32,
    as_of: NaiveDate,
) -> Result<Vec<SpendingPattern>> {
    let months = months.max(1);
    let transactions = db.spending_transactions(user_id, window_start(as_of, months))?;

    struct Bucket {
        total: f64,
        count: i64,
        last: Option<NaiveDate>,
    }

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Bucket> = HashMap::new();

    for tx in &transactions {
        let category = if tx.primary_category.trim().is_empty() {
            "other".to_string()
        } else {
            tx.primary_category.clone()
        };
        let bucket = buckets.entry(category.clone()).or_insert_with(|| {
            order.push(category);
            Bucket {
                total: 0.0,
                count: 0,
                last: None,
            }
        });
        bucket.total += tx.amount.abs();
        bucket.count += 1;
        if bucket.last.map(|d| tx.date > d).unwrap_or(true) {
            bucket.last = Some(tx.date);
        }
    }

    let mut patterns: Vec<SpendingPattern> = order
        .into_iter()
        .map(|category| {
            let bucket = &buckets[&category];
            SpendingPattern {
                category,
                monthly_average: bucket.total / months as f64,
                transaction_count: bucket.count,
                last_transaction: bucket.last,
            }
        })
        .collect();

    patterns.sort_by(|a, b| b.monthly_average.total_cmp(&a.monthly_average));
    Ok(patterns)
}

/// Income cadence inferred from inflow transactions in the trailing window
///
/// Never fails on empty input: a user with no income yet gets a zeroed,
/// irregular pattern.
pub fn income_pattern(db: &Database, user_id: &str, months: u32) -> Result<IncomePattern> {
    income_pattern_as_of(db, user_id, months, today_utc())
}

pub fn income_pattern_as_of(
    db: &Database,
    user_id: &str,
    months: u32,
    as_of: NaiveDate,
) -> Result<IncomePattern> {
    let transactions = db.income_transactions(user_id, window_start(as_of, months))?;

    if transactions.is_empty() {
        return Ok(IncomePattern {
            monthly_average: 0.0,
            frequency: Frequency::Irregular,
            last_income: None,
            next_expected: None,
        });
    }

    // Monthly average is the mean of calendar-month totals, so a partial
    // current month is weighted the same as a full one
    let mut monthly_totals: HashMap<(i32, u32), f64> = HashMap::new();
    for tx in &transactions {
        *monthly_totals
            .entry((tx.date.year(), tx.date.month()))
            .or_insert(0.0) += tx.amount;
    }
    let monthly_average =
        monthly_totals.values().sum::<f64>() / monthly_totals.len() as f64;

    let mut dates: Vec<NaiveDate> = transactions.iter().map(|tx| tx.date).collect();
    dates.sort();

    let frequency = income_cadence(mean_gap_days(&dates));
    let last_income = dates.last().copied();
    let next_expected = match frequency {
        Frequency::Irregular => None,
        _ => last_income.and_then(|d| project_next(d, frequency)),
    };

    Ok(IncomePattern {
        monthly_average,
        frequency,
        last_income,
        next_expected,
    })
}

/// Recurring expenses detected over the trailing window, most confident first
///
/// Groups by the exact raw merchant string (not resolved merchant identity),
/// requires at least two charges, and discards any group where an amount
/// strays more than 10% from the group mean.
pub fn recurring_expenses(
    db: &Database,
    user_id: &str,
    months: u32,
) -> Result<Vec<RecurringExpense>> {
    recurring_expenses_as_of(db, user_id, months, today_utc())
}

pub fn recurring_expenses_as_of(
    db: &Database,
    user_id: &str,
    months: u32,
    as_of: NaiveDate,
) -> Result<Vec<RecurringExpense>> {
    let transactions = db.merchant_spending_transactions(user_id, window_start(as_of, months))?;

    // Group by raw merchant string, preserving newest-first encounter order
    // so output order is deterministic among equal confidences
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<(NaiveDate, f64)>> = HashMap::new();
    for tx in &transactions {
        let Some(name) = tx.merchant_name.as_deref() else {
            continue;
        };
        groups
            .entry(name.to_string())
            .or_insert_with(|| {
                order.push(name.to_string());
                Vec::new()
            })
            .push((tx.date, tx.amount));
    }

    let mut recurring = Vec::new();

    for name in order {
        let charges = &groups[&name];
        if charges.len() < 2 {
            continue;
        }

        let amounts: Vec<f64> = charges.iter().map(|(_, amount)| amount.abs()).collect();
        let mean_amount = amounts.iter().sum::<f64>() / amounts.len() as f64;
        let stable = amounts
            .iter()
            .all(|amount| (amount - mean_amount).abs() / mean_amount < 0.1);
        if !stable {
            continue;
        }

        let mut dates: Vec<NaiveDate> = charges.iter().map(|(date, _)| *date).collect();
        dates.sort();

        let frequency = recurring_cadence(mean_gap_days(&dates));
        let confidence = (charges.len() as f64 / 6.0).min(1.0);
        let last_seen = match dates.last() {
            Some(date) => *date,
            None => continue,
        };

        recurring.push(RecurringExpense {
            merchant_name: name,
            amount: mean_amount,
            frequency,
            confidence,
            last_seen,
            next_expected: project_next(last_seen, frequency),
        });
    }

    recurring.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    Ok(recurring)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, NewTransaction};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed(
        db: &Database,
        user_id: &str,
        provider_id: &str,
        tx_date: NaiveDate,
        amount: f64,
        merchant: Option<&str>,
        category: &str,
        pending: bool,
    ) {
        let tx = NewTransaction {
            item_id: "item-1".to_string(),
            provider_transaction_id: provider_id.to_string(),
            account_id: "acc-1".to_string(),
            account_name: "Checking".to_string(),
            account_type: AccountType::Depository,
            amount,
            date: tx_date,
            authorized_date: None,
            merchant_name: merchant.map(|s| s.to_string()),
            category: vec![],
            primary_category: category.to_string(),
            pending,
            currency_code: "USD".to_string(),
            location: None,
            payment_meta: None,
        };
        db.insert_transaction(user_id, &tx).unwrap();
    }

    #[test]
    fn empty_user_yields_empty_aggregates() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);

        assert!(spending_by_category_as_of(&db, "u1", 3, as_of)
            .unwrap()
            .is_empty());
        assert!(recurring_expenses_as_of(&db, "u1", 6, as_of)
            .unwrap()
            .is_empty());

        let income = income_pattern_as_of(&db, "u1", 6, as_of).unwrap();
        assert_eq!(income.monthly_average, 0.0);
        assert_eq!(income.frequency, Frequency::Irregular);
        assert!(income.last_income.is_none());
        assert!(income.next_expected.is_none());
    }

    #[test]
    fn spending_groups_by_category_and_sorts_by_monthly_average() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);

        seed(&db, "u1", "t1", date(2025, 5, 10), -90.0, None, "dining", false);
        seed(&db, "u1", "t2", date(2025, 5, 20), -60.0, None, "dining", false);
        seed(&db, "u1", "t3", date(2025, 4, 5), -300.0, None, "grocery_stores", false);
        // Pending and income rows must not count
        seed(&db, "u1", "t4", date(2025, 5, 25), -40.0, None, "dining", true);
        seed(&db, "u1", "t5", date(2025, 5, 26), 2000.0, None, "payroll", false);
        // Outside the 3-month window
        seed(&db, "u1", "t6", date(2025, 1, 15), -500.0, None, "dining", false);

        let patterns = spending_by_category_as_of(&db, "u1", 3, as_of).unwrap();
        assert_eq!(patterns.len(), 2);

        assert_eq!(patterns[0].category, "grocery_stores");
        assert!((patterns[0].monthly_average - 100.0).abs() < 1e-9);
        assert_eq!(patterns[0].transaction_count, 1);

        assert_eq!(patterns[1].category, "dining");
        assert!((patterns[1].monthly_average - 50.0).abs() < 1e-9);
        assert_eq!(patterns[1].transaction_count, 2);
        assert_eq!(patterns[1].last_transaction, Some(date(2025, 5, 20)));
    }

    #[test]
    fn blank_category_defaults_to_other() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);
        seed(&db, "u1", "t1", date(2025, 5, 10), -30.0, None, "", false);

        let patterns = spending_by_category_as_of(&db, "u1", 3, as_of).unwrap();
        assert_eq!(patterns[0].category, "other");
    }

    #[test]
    fn income_gaps_of_thirty_days_classify_monthly() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 5, 10);

        seed(&db, "u1", "p1", date(2025, 3, 1), 2500.0, None, "payroll", false);
        seed(&db, "u1", "p2", date(2025, 3, 31), 2500.0, None, "payroll", false);
        seed(&db, "u1", "p3", date(2025, 4, 30), 2500.0, None, "payroll", false);

        let income = income_pattern_as_of(&db, "u1", 6, as_of).unwrap();
        assert_eq!(income.frequency, Frequency::Monthly);
        assert_eq!(income.last_income, Some(date(2025, 4, 30)));
        assert_eq!(income.next_expected, Some(date(2025, 5, 30)));
        // March has two deposits, April one: mean of (5000, 2500)
        assert!((income.monthly_average - 3750.0).abs() < 1e-9);
    }

    #[test]
    fn income_gaps_of_twenty_days_classify_irregular() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 5, 10);

        seed(&db, "u1", "p1", date(2025, 3, 1), 1000.0, None, "payroll", false);
        seed(&db, "u1", "p2", date(2025, 3, 21), 1000.0, None, "payroll", false);
        seed(&db, "u1", "p3", date(2025, 4, 10), 1000.0, None, "payroll", false);

        let income = income_pattern_as_of(&db, "u1", 6, as_of).unwrap();
        assert_eq!(income.frequency, Frequency::Irregular);
        assert!(income.next_expected.is_none());
    }

    #[test]
    fn biweekly_income_projects_fourteen_days_out() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 5, 10);

        seed(&db, "u1", "p1", date(2025, 4, 4), 1500.0, None, "payroll", false);
        seed(&db, "u1", "p2", date(2025, 4, 18), 1500.0, None, "payroll", false);
        seed(&db, "u1", "p3", date(2025, 5, 2), 1500.0, None, "payroll", false);

        let income = income_pattern_as_of(&db, "u1", 6, as_of).unwrap();
        assert_eq!(income.frequency, Frequency::Biweekly);
        assert_eq!(income.next_expected, Some(date(2025, 5, 16)));
    }

    #[test]
    fn single_income_deposit_is_irregular() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 5, 10);
        seed(&db, "u1", "p1", date(2025, 4, 4), 1500.0, None, "payroll", false);

        let income = income_pattern_as_of(&db, "u1", 6, as_of).unwrap();
        assert_eq!(income.frequency, Frequency::Irregular);
        assert!((income.monthly_average - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn stable_monthly_charges_detected_as_recurring() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);

        // $50, $50, $54 are all within 10% of the $51.33 mean
        seed(&db, "u1", "r1", date(2025, 3, 10), -50.0, Some("Gym Co"), "fitness", false);
        seed(&db, "u1", "r2", date(2025, 4, 9), -50.0, Some("Gym Co"), "fitness", false);
        seed(&db, "u1", "r3", date(2025, 5, 9), -54.0, Some("Gym Co"), "fitness", false);

        let recurring = recurring_expenses_as_of(&db, "u1", 6, as_of).unwrap();
        assert_eq!(recurring.len(), 1);

        let gym = &recurring[0];
        assert_eq!(gym.merchant_name, "Gym Co");
        assert_eq!(gym.frequency, Frequency::Monthly);
        assert!((gym.confidence - 0.5).abs() < 1e-9);
        assert!((gym.amount - 154.0 / 3.0).abs() < 1e-9);
        assert_eq!(gym.last_seen, date(2025, 5, 9));
        assert_eq!(gym.next_expected, Some(date(2025, 6, 9)));
    }

    #[test]
    fn amount_outside_ten_percent_band_discards_group() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);

        seed(&db, "u1", "r1", date(2025, 2, 10), -50.0, Some("Gym Co"), "fitness", false);
        seed(&db, "u1", "r2", date(2025, 3, 12), -50.0, Some("Gym Co"), "fitness", false);
        seed(&db, "u1", "r3", date(2025, 4, 11), -54.0, Some("Gym Co"), "fitness", false);
        // The $80 charge breaks the band; the whole group is dropped
        seed(&db, "u1", "r4", date(2025, 5, 11), -80.0, Some("Gym Co"), "fitness", false);

        let recurring = recurring_expenses_as_of(&db, "u1", 6, as_of).unwrap();
        assert!(recurring.is_empty());
    }

    #[test]
    fn single_charge_is_not_recurring() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);
        seed(&db, "u1", "r1", date(2025, 5, 10), -9.99, Some("One Off"), "shopping", false);

        assert!(recurring_expenses_as_of(&db, "u1", 6, as_of)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn quarterly_and_weekly_cadences_are_bucketed() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);

        seed(&db, "u1", "q1", date(2024, 12, 10), -120.0, Some("Water Utility"), "utilities", false);
        seed(&db, "u1", "q2", date(2025, 3, 10), -120.0, Some("Water Utility"), "utilities", false);

        seed(&db, "u1", "w1", date(2025, 5, 2), -25.0, Some("Cleaners"), "services", false);
        seed(&db, "u1", "w2", date(2025, 5, 9), -25.0, Some("Cleaners"), "services", false);
        seed(&db, "u1", "w3", date(2025, 5, 16), -25.0, Some("Cleaners"), "services", false);

        let recurring = recurring_expenses_as_of(&db, "u1", 12, as_of).unwrap();
        assert_eq!(recurring.len(), 2);

        // Three weekly charges outrank two quarterly ones on confidence
        assert_eq!(recurring[0].merchant_name, "Cleaners");
        assert_eq!(recurring[0].frequency, Frequency::Weekly);
        assert_eq!(recurring[0].next_expected, Some(date(2025, 5, 23)));

        assert_eq!(recurring[1].merchant_name, "Water Utility");
        assert_eq!(recurring[1].frequency, Frequency::Quarterly);
        assert_eq!(recurring[1].next_expected, Some(date(2025, 6, 10)));
    }

    #[test]
    fn pending_charges_are_ignored_by_recurring_detection() {
        let db = Database::in_memory().unwrap();
        let as_of = date(2025, 6, 1);

        seed(&db, "u1", "r1", date(2025, 4, 10), -15.0, Some("Streamer"), "streaming", false);
        seed(&db, "u1", "r2", date(2025, 5, 10), -15.0, Some("Streamer"), "streaming", true);

        assert!(recurring_expenses_as_of(&db, "u1", 6, as_of)
            .unwrap()
            .is_empty());
    }
}
