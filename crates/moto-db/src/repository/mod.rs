//! # Repository Module
//!
//! Database repository implementations for the moto shop.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │                                                                 │
//! │       │  db.sales().create(draft)                                       │
//! │       ▼                                                                 │
//! │  SaleRepository                                                         │
//! │  ├── require_*()        branch, payment source, customer exist          │
//! │  ├── moto_core::sales   price the draft, build the posting              │
//! │  └── ledger::commit()   check stock, write rows, move running totals    │
//! │       │                                                                 │
//! │       │  one SQL transaction                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BranchRepository`](branch::BranchRepository) - Store locations
//! - [`PartRepository`](part::PartRepository) - Parts catalog and stock
//! - [`InventoryRepository`](inventory::InventoryRepository) - Manual movements, transfers
//! - [`CashRepository`](cash::CashRepository) - Payment sources, manual cash
//! - [`SaleRepository`](sale::SaleRepository) - Retail checkouts
//! - [`GoodsReceiptRepository`](goods_receipt::GoodsReceiptRepository) - Supplier deliveries
//! - [`WorkOrderRepository`](work_order::WorkOrderRepository) - Workshop jobs
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers, loyalty, reminders
//! - [`AssetRepository`](asset::AssetRepository) - Fixed assets and capital
//! - [`ReportRepository`](report::ReportRepository) - Revenue, cashflow, snapshot

pub mod asset;
pub mod branch;
pub mod cash;
pub mod customer;
pub mod goods_receipt;
pub mod inventory;
pub(crate) mod ledger;
pub mod part;
pub mod report;
pub mod sale;
pub mod work_order;
