//! # Error Types
//!
//! Domain-specific error types for moto-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  moto-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  moto-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → front end               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Part id does not exist.
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Branch id does not exist.
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Payment source not found: {0}")]
    PaymentSourceNotFound(String),

    #[error("Inventory transaction not found: {0}")]
    InventoryTransactionNotFound(String),

    #[error("Cash transaction not found: {0}")]
    CashTransactionNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Goods receipt not found: {0}")]
    GoodsReceiptNotFound(String),

    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Work order not found: {0}")]
    WorkOrderNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Fixed asset not found: {0}")]
    FixedAssetNotFound(String),

    #[error("Capital investment not found: {0}")]
    CapitalInvestmentNotFound(String),

    /// An outbound posting would drive branch stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell 5 × BRAKE-PAD at HN
    ///      │
    ///      ▼
    /// stock[HN] = 3
    ///      │
    ///      ▼
    /// InsufficientStock { sku: "BRAKE-PAD", branch_id: "HN", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {sku} at {branch_id}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        branch_id: String,
        available: i64,
        requested: i64,
    },

    /// The transaction belongs to a document (sale, receipt, transfer,
    /// work order) and can only change through that document.
    #[error("Transaction {id} belongs to {link} and cannot be changed directly")]
    LinkedTransaction { id: String, link: String },

    /// A work order still lists the part; deleting it would leave the
    /// order unable to re-post.
    #[error("Part {sku} is used by work order {work_order_id}")]
    PartInUse { sku: String, work_order_id: String },

    /// Source and destination of a transfer are the same branch.
    #[error("Cannot transfer stock from {0} to itself")]
    SameBranchTransfer(String),

    /// Discount is larger than the gross amount it applies to.
    #[error("Discount {discount} exceeds gross amount {gross}")]
    DiscountExceedsTotal { discount: i64, gross: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid phone, invalid SKU).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
