//! # Seed Data Generator
//!
//! Populates the database with demo retailers, campaign budgets and their
//! current-year ledger records for development.
//!
//! ## Usage
//! ```bash
//! # Generate 50 retailers (default)
//! cargo run -p tds-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tds-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p tds-db --bin seed -- --db ./data/tds.db
//! ```
//!
//! ## Generated Retailers
//! - Ownership types cycle through sole proprietorship, partnership and
//!   private limited; every seventh retailer has no PAN
//! - 1-4 campaigns each, amounts spread between ₹8,000 and ₹75,000 so that
//!   exempt, individually taxed, near-threshold and crossed ledgers all appear

use chrono::Utc;
use std::env;
use tds_core::{CampaignAmount, FiscalYear, Money, Retailer, Thresholds};
use tds_db::{Database, DbConfig};
use uuid::Uuid;

const SHOP_NAMES: &[&str] = &[
    "Sharma Kirana",
    "Gupta General Store",
    "Patel Traders",
    "Reddy Supermart",
    "Iyer Provisions",
    "Singh Brothers",
    "Das Enterprises",
    "Khan Wholesale",
    "Nair Stores",
    "Mehta Mart",
];

const STATES: &[Option<&str>] = &[
    Some("Maharashtra"),
    Some("Karnataka"),
    Some("Tamil Nadu"),
    Some("Gujarat"),
    Some("West Bengal"),
    None,
];

const OWNERSHIP_TYPES: &[&str] = &["Sole Proprietorship", "Partnership", "Private Limited"];

const CAMPAIGNS: &[&str] = &["Summer Splash", "Monsoon Mela", "Diwali Dhamaka", "Holi Hungama"];

/// Per-campaign amounts in rupees, picked by index.
const AMOUNTS: &[i64] = &[8_000, 15_000, 25_000, 32_000, 45_000, 60_000, 75_000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./tds_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("TDS Ledger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of retailers to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./tds_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 TDS Ledger Seed Data Generator");
    println!("=================================");
    println!("Database:  {}", db_path);
    println!("Retailers: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.retailers().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} retailers", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let fiscal_year = FiscalYear::current();
    let thresholds = Thresholds::default();
    let start = std::time::Instant::now();
    let mut crossed = 0;

    for index in 0..count {
        let retailer = generate_retailer(index);
        let campaigns = generate_campaigns(index);

        db.retailers().upsert(&retailer).await?;
        db.budgets().replace(&retailer.id, &campaigns).await?;

        let mut record = db
            .ledgers()
            .get_or_create(&retailer.id, fiscal_year, retailer.tds_rate())
            .await?;
        record.rebuild_from_snapshot(&campaigns, &thresholds, Utc::now())?;
        db.ledgers().save(&mut record).await?;

        if record.threshold_crossed {
            crossed += 1;
        }

        if (index + 1) % 10 == 0 {
            println!("  Generated {} retailers...", index + 1);
        }
    }

    println!();
    println!(
        "✓ Generated {} retailers ({} crossed the threshold) in {:?}",
        count,
        crossed,
        start.elapsed()
    );

    let summary = tds_core::report::fiscal_year_summary(
        fiscal_year,
        &db.ledgers().list_for_fiscal_year(fiscal_year).await?,
    )?;
    println!("  {} total TDS: {}", fiscal_year, summary.totals.total_tds);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Generates a retailer with deterministic, varied attributes.
fn generate_retailer(index: usize) -> Retailer {
    let now = Utc::now();
    let name = SHOP_NAMES[index % SHOP_NAMES.len()];

    Retailer {
        id: Uuid::new_v4().to_string(),
        name: format!("{} #{}", name, index + 1),
        state: STATES[index % STATES.len()].map(str::to_string),
        ownership_type: Some(OWNERSHIP_TYPES[index % OWNERSHIP_TYPES.len()].to_string()),
        pan: if index % 7 == 6 {
            None
        } else {
            Some(format!("ABCDE{:04}F", index % 10_000))
        },
        created_at: now,
        updated_at: now,
    }
}

/// Generates 1-4 campaigns for a retailer.
fn generate_campaigns(index: usize) -> Vec<CampaignAmount> {
    let campaign_count = index % CAMPAIGNS.len() + 1;

    (0..campaign_count)
        .map(|c| {
            let amount = AMOUNTS[(index * 3 + c * 5) % AMOUNTS.len()];
            CampaignAmount::new(
                format!("cmp-{:04}-{}", index, c),
                CAMPAIGNS[c],
                Money::from_rupees(amount),
            )
        })
        .collect()
}
