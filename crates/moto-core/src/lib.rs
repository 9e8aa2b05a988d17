//! # moto-core: Pure Business Logic for the Moto Shop
//!
//! This crate holds the shop's business rules as plain data and functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moto Shop Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Front end (TypeScript via ts-rs)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ moto-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   types · money · validation · catalog                          │   │
//! │  │   ledger ──► sales · purchasing · workorder                     │   │
//! │  │   customer · assets · report                                    │   │
//! │  │   book (ShopBook: the whole shop in memory)                     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Posting                                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    moto-db (SQLite layer)                       │   │
//! │  │      migrations, repositories, one SQL transaction per posting  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Part, Sale, WorkOrder, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`ledger`] - Stock and cash postings, the only place balances change
//! - [`sales`], [`purchasing`], [`workorder`] - Documents that post to the ledger
//! - [`report`] - Revenue, cashflow and inventory reports
//! - [`book`] - [`ShopBook`], the in-memory shop
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use chrono::NaiveDate;
//! use moto_core::{BookSettings, Branch, InventoryDirection, Money, NewInventoryTransaction, NewPart, ShopBook};
//!
//! let mut book = ShopBook::new(BookSettings::default());
//! book.add_branch(Branch { id: "HN".into(), name: "Hà Nội".into(), address: None }).unwrap();
//!
//! let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
//! let part = book.add_part(NewPart {
//!     sku: "OIL-10W40".into(),
//!     name: "Engine oil".into(),
//!     category: "Oil".into(),
//!     cost_price: Money::new(90_000),
//!     selling_price: Money::new(120_000),
//!     opening_stock: BTreeMap::from([("HN".to_string(), 10)]),
//!     date,
//! }).unwrap();
//!
//! let tx = book.record_inventory(NewInventoryTransaction {
//!     direction: InventoryDirection::Out,
//!     part_id: part.id.clone(),
//!     quantity: 3,
//!     unit_price: None,
//!     branch_id: "HN".into(),
//!     date,
//!     notes: None,
//! }).unwrap();
//! assert_eq!(book.part(&part.id).unwrap().stock_at("HN"), 7);
//!
//! book.delete_inventory(&tx.id).unwrap();
//! assert_eq!(book.part(&part.id).unwrap().stock_at("HN"), 10);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod assets;
pub mod book;
pub mod catalog;
pub mod customer;
pub mod error;
pub mod ledger;
pub mod money;
pub mod purchasing;
pub mod report;
pub mod sales;
pub mod types;
pub mod validation;
pub mod workorder;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use book::{BookSettings, ShopBook};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{PartCatalog, Posting};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single document line.
///
/// ## Business Reason
/// Catches typos like 1000 instead of 10 at the counter.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Largest unit price, cost or cash amount accepted (one trillion).
///
/// Together with `MAX_LINE_QUANTITY` and `MAX_DOCUMENT_LINES` this keeps
/// every document total inside `i64`.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// Maximum number of lines of one kind on a document.
pub const MAX_DOCUMENT_LINES: usize = 200;

/// Stock strictly below this is listed as low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Days between oil changes before a customer is reminded.
pub const DEFAULT_OIL_CHANGE_INTERVAL_DAYS: i64 = 90;

/// Money spent per loyalty point.
pub const DEFAULT_LOYALTY_POINT_VALUE: i64 = 10_000;
