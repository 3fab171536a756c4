//! Command implementations

use std::path::Path;

use anyhow::{Context, Result};
use cardwise_core::db::Database;
use cardwise_core::{analytics, ingest, predict, rewards, MerchantResolver};

/// Open the database, running migrations if needed
pub fn open_db(path: &Path) -> Result<Database> {
    Database::new(&path.to_string_lossy()).context("Failed to open database")
}

/// Truncate a string to a maximum display width
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

pub fn cmd_init(path: &Path) -> Result<()> {
    let db = open_db(path)?;
    println!("✅ Database initialized at {}", db.path());
    Ok(())
}

pub fn cmd_ingest(db: &Database, user: &str, item: &str, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let batch: Vec<ingest::IncomingTransaction> =
        serde_json::from_str(&raw).context("Batch file must be a JSON array of transactions")?;

    let resolver = MerchantResolver::new(db.clone());
    let summary = ingest::sync_batch(db, &resolver, user, item, batch)?;

    println!();
    println!("📥 Ingestion Summary");
    println!("   Ingested:   {}", summary.ingested);
    println!("   Duplicates: {}", summary.duplicates);
    println!("   Linked:     {}", summary.linked);
    println!("   Learned:    {}", summary.learned);
    if summary.failures > 0 {
        println!("   ⚠️  Failures: {} (stored unlinked)", summary.failures);
    }
    Ok(())
}

pub fn cmd_report_patterns(db: &Database, user: &str, months: u32) -> Result<()> {
    let patterns = analytics::spending_by_category(db, user, months)?;

    println!();
    println!("📊 Spending by Category (last {} months)", months);
    println!("   ─────────────────────────────────────────────────────");

    if patterns.is_empty() {
        println!("   No spending found in this window.");
        return Ok(());
    }

    println!(
        "   {:25} │ {:>10} │ {:>5} │ {:>10}",
        "Category", "Avg/month", "Count", "Last"
    );
    println!("   ──────────────────────────┼────────────┼───────┼───────────");
    for p in &patterns {
        println!(
            "   {:25} │ {:>10.2} │ {:>5} │ {:>10}",
            truncate(&p.category, 25),
            p.monthly_average,
            p.transaction_count,
            p.last_transaction
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

pub fn cmd_report_income(db: &Database, user: &str, months: u32) -> Result<()> {
    let income = analytics::income_pattern(db, user, months)?;

    println!();
    println!("💰 Income Pattern (last {} months)", months);
    println!("   Monthly average: ${:.2}", income.monthly_average);
    println!("   Frequency:       {}", income.frequency);
    match income.last_income {
        Some(date) => println!("   Last income:     {}", date),
        None => println!("   Last income:     -"),
    }
    match income.next_expected {
        Some(date) => println!("   Next expected:   {}", date),
        None => println!("   Next expected:   -"),
    }
    Ok(())
}

pub fn cmd_report_recurring(db: &Database, user: &str, months: u32) -> Result<()> {
    let recurring = analytics::recurring_expenses(db, user, months)?;

    println!();
    println!("🔁 Recurring Expenses (last {} months)", months);
    println!("   ─────────────────────────────────────────────────────");

    if recurring.is_empty() {
        println!("   No recurring expenses detected.");
        return Ok(());
    }

    println!(
        "   {:25} │ {:>8} │ {:>9} │ {:>4} │ {:>10}",
        "Merchant", "Amount", "Cadence", "Conf", "Next"
    );
    println!("   ──────────────────────────┼──────────┼───────────┼──────┼───────────");
    for exp in &recurring {
        println!(
            "   {:25} │ {:>8.2} │ {:>9} │ {:>4.2} │ {:>10}",
            truncate(&exp.merchant_name, 25),
            exp.amount,
            exp.frequency.as_str(),
            exp.confidence,
            exp.next_expected
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

pub fn cmd_predict(db: &Database, user: &str) -> Result<()> {
    let predictions = predict::next_spends(db, user)?;

    println!();
    println!("🔮 Likely Upcoming Spends");
    println!("   ─────────────────────────────────────────────────────");

    if predictions.is_empty() {
        println!("   Not enough history to predict yet.");
        return Ok(());
    }

    for p in &predictions {
        let amount = p
            .expected_amount
            .map(|a| format!("${:.2}", a))
            .unwrap_or_else(|| "?".to_string());
        println!(
            "   {:25} {:>4.0}%  ~{}",
            truncate(&p.category, 25),
            p.probability * 100.0,
            amount
        );
    }
    Ok(())
}

pub fn cmd_merchants_list(db: &Database, user: &str) -> Result<()> {
    let merchants = db.list_merchants(user)?;

    println!();
    println!("🏪 Learned Merchants ({})", merchants.len());
    println!("   ─────────────────────────────────────────────────────");

    if merchants.is_empty() {
        println!("   No merchants learned yet. Run `cardwise ingest` first.");
        return Ok(());
    }

    println!(
        "   {:>4} │ {:25} │ {:>4} │ {:>5} │ {}",
        "ID", "Name", "Conf", "Seen", "Variants"
    );
    println!("   ─────┼──────────────────────────┼──────┼───────┼─────────");
    for m in &merchants {
        let confirmed = if m.user_confirmed { " ✓" } else { "" };
        println!(
            "   {:>4} │ {:25} │ {:>4.2} │ {:>5} │ {}{}",
            m.id,
            truncate(&m.canonical_name, 25),
            m.confidence,
            m.transaction_count,
            m.raw_names.len(),
            confirmed,
        );
    }
    Ok(())
}

pub fn cmd_merchants_review(db: &Database, user: &str) -> Result<()> {
    let resolver = MerchantResolver::new(db.clone());
    let merchants = resolver.merchants_needing_confirmation(user)?;

    println!();
    println!("❓ Merchants Needing Confirmation");

    if merchants.is_empty() {
        println!("   Nothing to review.");
        return Ok(());
    }

    for m in &merchants {
        println!(
            "   [{}] {} (seen {}x, confidence {:.2})",
            m.id, m.canonical_name, m.transaction_count, m.confidence
        );
        println!("       variants: {}", m.raw_names.join(", "));
    }
    println!();
    println!("   Confirm with: cardwise merchants confirm --id <ID> --name <NAME>");
    Ok(())
}

pub fn cmd_merchants_confirm(db: &Database, user: &str, id: i64, name: &str) -> Result<()> {
    let resolver = MerchantResolver::new(db.clone());
    let merchant = resolver.confirm_merchant(user, id, name)?;
    let linked = db.count_linked_transactions(merchant.id)?;

    println!(
        "✅ Confirmed \"{}\" (confidence {:.1}), {} transactions linked",
        merchant.canonical_name, merchant.confidence, linked
    );
    Ok(())
}

pub fn cmd_best_card(category: &str, monthly_spend: f64) -> Result<()> {
    println!();
    println!(
        "💳 Best card for {} at ${:.0}/month",
        category, monthly_spend
    );

    match rewards::best_card_for_category(category, monthly_spend) {
        Some(card) => {
            println!("   {} ({})", card.name, card.issuer);
            println!("   Annual fee: ${:.0}", card.annual_fee);
            for rule in card.rewards {
                if rule.category == category {
                    if let Some(notes) = rule.notes {
                        println!("   Earning: {}", notes);
                    } else {
                        println!("   Earning: {}% on {}", rule.rate, rule.category);
                    }
                }
            }
            if let Some(bonus) = &card.signup_bonus {
                if let Some(notes) = bonus.notes {
                    println!("   Bonus: {}", notes);
                }
            }
        }
        None => {
            println!("   No card nets a positive reward at this spend level.");
        }
    }
    Ok(())
}
