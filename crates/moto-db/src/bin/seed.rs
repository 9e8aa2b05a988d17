//! # Seed Data Generator
//!
//! Populates a database with a small demo shop for development.
//!
//! ## Usage
//! ```bash
//! # Uses MOTO_DB_PATH or ./moto_dev.db
//! cargo run -p moto-db --bin seed
//!
//! # Specify database path
//! cargo run -p moto-db --bin seed -- --db ./data/moto.db
//! ```
//!
//! ## Generated Data
//! - Two branches: `HN` and `HCM`
//! - A parts catalog with opening stock at both branches
//! - A cash drawer and a bank account with opening balances
//! - A loyalty customer, a counter sale, a supplier delivery
//! - A settled work order
//!
//! Finishes by logging the business snapshot of `HN` as JSON.

use chrono::{Duration, Utc};
use moto_core::report::ReportFilter;
use moto_core::{
    Branch, GoodsReceiptDraft, Money, NewCustomer, NewPart, NewPaymentSource, PartUsageDraft,
    QuotationItem, ReceiptLineDraft, SaleDraft, SaleLineDraft, WorkOrderDraft, WorkOrderStatus,
};
use moto_db::{Database, ShopConfig};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (sku, name, category, cost, selling price, stock at HN, stock at HCM)
const CATALOG: &[(&str, &str, &str, i64, i64, i64, i64)] = &[
    ("OIL-10W40", "Engine oil 10W-40 1L", "Oil", 80_000, 120_000, 40, 25),
    ("OIL-GEAR", "Gear oil 120ml", "Oil", 25_000, 40_000, 30, 20),
    ("PAD-F-WAVE", "Front brake pad Wave", "Brakes", 45_000, 75_000, 12, 8),
    ("SHOE-R-WAVE", "Rear brake shoe Wave", "Brakes", 40_000, 65_000, 10, 6),
    ("SPARK-C7", "Spark plug C7HSA", "Ignition", 30_000, 50_000, 25, 15),
    ("CHAIN-428", "Chain 428H", "Drive", 150_000, 220_000, 6, 4),
    ("SPROCKET-KIT", "Sprocket kit 428", "Drive", 180_000, 260_000, 4, 3),
    ("TIRE-80-90-17", "Tire 80/90-17", "Tires", 200_000, 300_000, 8, 6),
    ("TUBE-17", "Inner tube 17\"", "Tires", 35_000, 60_000, 20, 10),
    ("FILTER-AIR-VIS", "Air filter Vision", "Filters", 55_000, 90_000, 7, 2),
    ("BULB-H4", "Headlight bulb H4", "Electrical", 30_000, 55_000, 15, 9),
    ("BATT-5AH", "Battery 12V 5Ah", "Electrical", 250_000, 380_000, 3, 2),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,moto_core=debug,moto_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = ShopConfig::from_env()?;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.database_path = PathBuf::from(path);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Moto Shop Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $MOTO_DB_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    info!(
        shop = %config.shop_name,
        path = %config.database_path.display(),
        "Seeding database"
    );

    let db = Database::new(config.db_config())
        .await?
        .with_settings(config.book_settings());

    let existing = db.parts().count().await?;
    if existing > 0 {
        warn!(parts = existing, "Database already has parts; skipping seed");
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let last_week = today - Duration::days(7);

    for (id, name, address) in [
        ("HN", "Hà Nội", "12 Phố Huế, Hai Bà Trưng"),
        ("HCM", "Hồ Chí Minh", "85 Lê Lợi, Quận 1"),
    ] {
        db.branches()
            .create(Branch {
                id: id.to_string(),
                name: name.to_string(),
                address: Some(address.to_string()),
            })
            .await?;
    }

    let mut parts = BTreeMap::new();
    for (sku, name, category, cost, price, hn, hcm) in CATALOG {
        let part = db
            .parts()
            .create(NewPart {
                sku: sku.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                cost_price: Money::new(*cost),
                selling_price: Money::new(*price),
                opening_stock: [("HN".to_string(), *hn), ("HCM".to_string(), *hcm)]
                    .into_iter()
                    .collect(),
                date: last_week,
            })
            .await?;
        parts.insert(*sku, part.id);
    }
    info!(parts = parts.len(), "Catalog created");

    let drawer = db
        .cash()
        .create_source(NewPaymentSource {
            name: "Cash drawer".to_string(),
            opening_balance: [
                ("HN".to_string(), Money::new(2_000_000)),
                ("HCM".to_string(), Money::new(1_500_000)),
            ]
            .into_iter()
            .collect(),
            date: last_week,
        })
        .await?;
    let bank = db
        .cash()
        .create_source(NewPaymentSource {
            name: "Vietcombank".to_string(),
            opening_balance: [("HN".to_string(), Money::new(30_000_000))]
                .into_iter()
                .collect(),
            date: last_week,
        })
        .await?;

    let customer = db
        .customers()
        .create(NewCustomer {
            name: "Nguyễn Văn An".to_string(),
            phone: "0912345678".to_string(),
            vehicle: Some("Honda Wave Alpha".to_string()),
            license_plate: Some("29B1-123.45".to_string()),
            last_service_odometer: Some(12_000),
            last_service_date: Some(today - Duration::days(120)),
        })
        .await?;

    let part_id = |sku: &str| parts.get(sku).cloned().unwrap_or_default();

    db.sales()
        .create(SaleDraft {
            branch_id: "HN".to_string(),
            customer_id: Some(customer.id.clone()),
            customer_name: Some(customer.name.clone()),
            items: vec![
                SaleLineDraft {
                    part_id: part_id("OIL-10W40"),
                    quantity: 2,
                    unit_price: None,
                },
                SaleLineDraft {
                    part_id: part_id("BULB-H4"),
                    quantity: 1,
                    unit_price: None,
                },
            ],
            discount: Money::new(15_000),
            payment_source_id: drawer.id.clone(),
            date: today,
            notes: None,
        })
        .await?;

    db.goods_receipts()
        .receive(GoodsReceiptDraft {
            branch_id: "HN".to_string(),
            supplier: "Phụ tùng Thành Công".to_string(),
            items: vec![
                ReceiptLineDraft {
                    part_id: part_id("CHAIN-428"),
                    quantity: 5,
                    unit_cost: Money::new(145_000),
                },
                ReceiptLineDraft {
                    part_id: part_id("BATT-5AH"),
                    quantity: 4,
                    unit_cost: Money::new(245_000),
                },
            ],
            payment_source_id: Some(bank.id.clone()),
            date: today,
            notes: Some("Monthly restock".to_string()),
            update_cost_price: true,
        })
        .await?;

    let order = db
        .work_orders()
        .create(
            WorkOrderDraft {
                branch_id: "HN".to_string(),
                customer_id: Some(customer.id.clone()),
                customer_name: customer.name.clone(),
                customer_phone: Some(customer.phone.clone()),
                vehicle: customer.vehicle.clone(),
                license_plate: customer.license_plate.clone(),
                odometer: Some(15_400),
                issue_description: "Oil change, chain slack, weak rear brake".to_string(),
                technician: Some("Tuấn".to_string()),
                status: WorkOrderStatus::InRepair,
                parts: vec![
                    PartUsageDraft {
                        part_id: part_id("OIL-10W40"),
                        quantity: 1,
                        price: None,
                    },
                    PartUsageDraft {
                        part_id: part_id("SHOE-R-WAVE"),
                        quantity: 1,
                        price: None,
                    },
                ],
                quotation_items: vec![QuotationItem {
                    description: "Chain adjust and lube".to_string(),
                    quantity: 1,
                    unit_price: Money::new(30_000),
                }],
                labor_cost: Money::new(80_000),
                discount: Money::zero(),
                received_on: today,
            },
            today,
        )
        .await?;
    db.work_orders()
        .set_status(&order.id, WorkOrderStatus::Done, today)
        .await?;
    db.work_orders().settle(&order.id, &drawer.id, today).await?;

    if !db.reports().verify_ledger().await? {
        warn!("Ledger does not replay to the stored totals");
    }

    let snapshot = db
        .reports()
        .business_snapshot("HN", &ReportFilter::all())
        .await?;
    info!(snapshot = %snapshot.to_json()?, "Seed complete");

    db.close().await;
    Ok(())
}
