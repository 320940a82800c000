//! # tindahan-core: Pure Business Logic for Tindahan POS
//!
//! This crate is the **heart** of the Tindahan POS transactional core. It
//! contains the domain model and business rules as pure code with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tindahan POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Caller (HTTP layer, shell, ...)                │   │
//! │  │     already authenticated; supplies organization + actor ids    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ tindahan-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   error   │  │ validation│  │   │
//! │  │   │  Branch   │  │   Money   │  │ CoreError │  │   rules   │  │   │
//! │  │   │  Variant  │  │ centavos  │  │ taxonomy  │  │  checks   │  │   │
//! │  │   │  Movement │  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tindahan-db (Database Layer)                   │   │
//! │  │        SQLite repositories, row locks, sale/adjust engines      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Organization, Branch, ItemVariant, InventoryRecord,
//!   StockMovement, SaleTransaction, TransactionItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation rules
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in centavos (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tindahan_core::Money` instead of
// `use tindahan_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a stock-movement reason, in characters.
///
/// ## Business Reason
/// Reasons are free text shown in the audit trail; this bound keeps entries
/// readable and matches what the movement ledger stores.
pub const MAX_REASON_LEN: usize = 500;

/// Maximum quantity accepted for a single sale line or manual adjustment.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., typing 100000 instead of 10).
/// Can be made configurable per-tenant in future versions.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Maximum length of a customer note on a sale.
pub const MAX_CUSTOMER_NOTE_LEN: usize = 500;

/// Width of the zero-padded sequence in a transaction display number.
///
/// Display numbers look like `2026-000042`: the year the sale was made,
/// then a per-organization sequence within that year.
pub const DISPLAY_NUMBER_WIDTH: usize = 6;
