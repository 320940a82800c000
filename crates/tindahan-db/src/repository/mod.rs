//! # Repository Module
//!
//! Repository implementations for database access.
//!
//! ## Repository Pattern
//! Each repository owns the SQL for one aggregate and takes the caller's
//! organization id explicitly - tenant scoping is a required parameter,
//! never an ambient assumption.
//!
//! - [`tenant`] - Organizations, branches, staff, item variants + scope checks
//! - [`inventory`] - Live quantity records (locked reads, guarded writes)
//! - [`movement`] - Append-only stock-movement ledger + history/replay
//! - [`transaction`] - Sale transaction headers, items, display-number counters

pub mod inventory;
pub mod movement;
pub mod tenant;
pub mod transaction;
