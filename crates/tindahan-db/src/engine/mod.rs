//! # Write Engines
//!
//! The only two code paths allowed to change an inventory quantity.
//!
//! ## Unit of Work
//! Both engines follow the same shape:
//! ```text
//! validate shape ─► verify tenant scope ─► acquire row locks ─► begin tx
//!                                                                  │
//!      commit ◄── append movement(s) ◄── write quantity ◄── locked read
//! ```
//! Any failure after `begin` rolls the whole transaction back; the row locks
//! are dropped only after commit or abort, so a concurrent operation on the
//! same (branch, variant) always observes either all of a unit's effects or
//! none of them.
//!
//! - [`adjustment`] - Manual stock-in / stock-out / absolute corrections
//! - [`sale`] - Atomic multi-line sale processing

pub mod adjustment;
pub mod sale;

pub use adjustment::{AdjustStockOutcome, AdjustStockRequest, AdjustmentKind, StockAdjustmentEngine};
pub use sale::{ProcessSaleOutcome, ProcessSaleRequest, SaleLine, SaleProcessor};
