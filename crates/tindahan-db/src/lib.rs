//! # tindahan-db: Data Layer for Tindahan POS
//!
//! SQLite persistence, tenant-scoped repositories, the stock row locks, and
//! the two write engines (manual adjustments and sales).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tindahan POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Caller (HTTP layer, shell, ...)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                tindahan-core (Pure Business Logic)              │   │
//! │  │            types • money • error taxonomy • validation          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ tindahan-db (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌────────┐ ┌────────────┐ ┌───────────────┐ ┌────────────┐  │   │
//! │  │   │  pool  │ │ repository │ │     locks     │ │   engine   │  │   │
//! │  │   │ sqlite │ │ tenant     │ │ per-(branch,  │ │ adjustment │  │   │
//! │  │   │  WAL   │ │ inventory  │ │  variant) row │ │    sale    │  │   │
//! │  │   │        │ │ movement   │ │  locks with   │ │            │  │   │
//! │  │   │        │ │ transaction│ │  bounded wait │ │            │  │   │
//! │  │   └────────┘ └────────────┘ └───────────────┘ └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │                          ┌─────▼─────┐                                  │
//! │                          │  SQLite   │                                  │
//! │                          └───────────┘                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Discipline
//! Repositories expose reads freely, but every quantity mutation goes
//! through an engine: lock the rows, open one transaction, validate under
//! the lock, write the quantity and its ledger entry together, commit. The
//! movement ledger is append-only and the sale tables are immutable.
//!
//! ## Usage
//! ```rust,ignore
//! use std::sync::Arc;
//! use tindahan_db::{Database, DbConfig, SaleProcessor, StockLockManager};
//!
//! let db = Database::new(DbConfig::new("/var/lib/tindahan/pos.db")).await?;
//! let locks = Arc::new(StockLockManager::with_default_timeout());
//! let sales = SaleProcessor::new(db.clone(), locks.clone());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use engine::{
    AdjustStockOutcome, AdjustStockRequest, AdjustmentKind, ProcessSaleOutcome,
    ProcessSaleRequest, SaleLine, SaleProcessor, StockAdjustmentEngine,
};
pub use error::{DbError, DbResult};
pub use locks::{StockGuards, StockLockManager, DEFAULT_LOCK_WAIT};
pub use pool::{Database, DbConfig};
pub use repository::movement::{LedgerReplay, MovementFilter};
