//! # Seed Data Generator
//!
//! Populates the database with a demo shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./chairside_dev.db
//! cargo run -p chairside-db --bin seed
//!
//! # Specify database path
//! cargo run -p chairside-db --bin seed -- --db ./data/chairside.db
//! ```
//!
//! ## Generated Data
//! - One boss and three staff members with varied commission rates
//! - A handful of clients
//! - Service packages (haircuts, beard work, treatments)
//! - Retail products
//! - Discount codes: an unrestricted percentage, a beard-only percentage and
//!   a fixed amount

use std::env;

use chairside_core::{DiscountType, Money, Percent, Role};
use chairside_db::{Database, DbConfig, NewDiscountCode};

/// (name, role, service commission %, product commission %)
const STAFF: &[(&str, Role, f64, f64)] = &[
    ("Rahman", Role::Boss, 50.0, 10.0),
    ("Amir", Role::Staff, 40.0, 5.0),
    ("Wei Jie", Role::Staff, 35.0, 5.0),
    ("Kumar", Role::Staff, 45.0, 7.5),
];

const CLIENTS: &[(&str, Option<&str>)] = &[
    ("Farah", Some("012-345 6789")),
    ("Daniel", Some("017-222 3344")),
    ("Siti", None),
    ("Arjun", Some("019-876 5432")),
];

/// (name, price in cents, duration in minutes)
const PACKAGES: &[(&str, i64, i64)] = &[
    ("Haircut", 5000, 45),
    ("Beard Trim", 3000, 20),
    ("Hot Towel Shave", 4500, 30),
    ("Hair Colouring", 12000, 90),
    ("Scalp Treatment", 6000, 40),
];

const PRODUCTS: &[(&str, i64)] = &[
    ("Matte Pomade", 3990),
    ("Beard Oil", 4500),
    ("Sea Salt Spray", 2990),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./chairside_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Chairside Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./chairside_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Chairside Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.packages().list_active().await?.is_empty() {
        println!("⚠ Database already has packages");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (name, role, rate, product_rate) in STAFF {
        let user = db
            .users()
            .create(
                name,
                *role,
                Some(Percent::from_percentage(*rate)),
                Some(Percent::from_percentage(*product_rate)),
            )
            .await?;
        println!("  {} {} ({}, {})", user.role, user.name, user.commission_rate(), user.product_commission_rate());
    }

    for (name, phone) in CLIENTS {
        db.clients().create(name, *phone).await?;
    }
    println!("✓ {} clients", CLIENTS.len());

    let mut package_ids = Vec::with_capacity(PACKAGES.len());
    for (name, price, duration) in PACKAGES {
        let package = db
            .packages()
            .create(name, Money::from_cents(*price), *duration)
            .await?;
        package_ids.push(package.id);
    }
    println!("✓ {} packages", PACKAGES.len());

    for (name, price) in PRODUCTS {
        db.products().create(name, Money::from_cents(*price)).await?;
    }
    println!("✓ {} products", PRODUCTS.len());

    let codes = vec![
        NewDiscountCode {
            code: "SAVE10".to_string(),
            discount_type: DiscountType::Percentage,
            percent: Some(Percent::from_percentage(10.0)),
            amount: None,
            applicable_packages: Vec::new(),
        },
        NewDiscountCode {
            code: "BEARD20".to_string(),
            discount_type: DiscountType::Percentage,
            percent: Some(Percent::from_percentage(20.0)),
            amount: None,
            applicable_packages: package_ids.get(1).copied().into_iter().collect(),
        },
        NewDiscountCode {
            code: "RM15OFF".to_string(),
            discount_type: DiscountType::FixedAmount,
            percent: None,
            amount: Some(Money::from_cents(1500)),
            applicable_packages: Vec::new(),
        },
    ];
    for input in codes {
        let code = db.discount_codes().create(input).await?;
        println!("  code {}", code.code);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
