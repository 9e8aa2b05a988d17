//! # moto-db: Database Layer for the Moto Shop
//!
//! SQLite storage for the shop book, using sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Moto Shop Data Flow                              │
//! │                                                                         │
//! │  Front end / seed binary                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     moto-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │   │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │   │   │
//! │  │   │               │    │ SaleRepo      │    │              │   │   │
//! │  │   │ SqlitePool    │◄───│ WorkOrderRepo │    │ 001_initial  │   │   │
//! │  │   │ BookSettings  │    │ ReportRepo    │    │              │   │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘   │   │
//! │  │                                │                                │   │
//! │  │                        ledger::commit()                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Shop configuration from the environment
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use moto_db::{Database, ShopConfig};
//!
//! let config = ShopConfig::from_env()?;
//! let db = Database::new(config.db_config())
//!     .await?
//!     .with_settings(config.book_settings());
//!
//! let sale = db.sales().create(draft).await?;
//! let low = db.reports().low_stock("HN").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, ShopConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::asset::AssetRepository;
pub use repository::branch::BranchRepository;
pub use repository::cash::{CashFilter, CashRepository};
pub use repository::customer::CustomerRepository;
pub use repository::goods_receipt::GoodsReceiptRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::part::PartRepository;
pub use repository::report::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::work_order::WorkOrderRepository;
