//! # Seed Data Loader
//!
//! Loads the demo catalog into a database file.
//!
//! ## Usage
//! ```bash
//! cargo run -p aisle-db --bin seed
//! cargo run -p aisle-db --bin seed -- --db ./data/aisle.db
//! ```

use std::env;

use aisle_db::catalog::seed_demo_catalog;
use aisle_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./aisle_dev.db");

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
                println!("Aisle Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./aisle_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Aisle Seed Data Loader");
    println!("=========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let written = seed_demo_catalog(&db).await?;
    if written == 0 {
        println!("⚠ Catalog already has products, nothing written.");
        println!("  Delete the database file to regenerate.");
    } else {
        println!("✓ Seeded {} products", written);
    }

    for product in db.products().list_active(50).await? {
        println!(
            "  {:<4} {:<28} {:>7}  {}",
            product.id,
            product.title,
            product.effective_price().to_string(),
            product.weight_spec
        );
    }

    db.close().await;
    Ok(())
}
