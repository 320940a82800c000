//! # Stock Adjustment Engine
//!
//! Manual inventory changes: goods received, goods removed, count
//! corrections.
//!
//! ## Three Kinds of Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Adjustment Semantics                                │
//! │                                                                         │
//! │  StockIn (qty 5):      before=10 ──► after=15   (delta +5)             │
//! │  StockOut (qty 5):     before=10 ──► after=5    (delta -5)             │
//! │  Adjustment (qty 5):   before=10 ──► after=5    (absolute target)      │
//! │                                                                         │
//! │  StockIn/StockOut take a positive magnitude; Adjustment takes the      │
//! │  counted quantity itself (zero allowed - shelves can be empty).        │
//! │                                                                         │
//! │  If the computed after is negative the whole unit is refused with      │
//! │  InsufficientStock{available, requested} and nothing is applied.       │
//! │  Quantities are never clamped to zero: a clamp would silently eat      │
//! │  the difference and break the ledger replay.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::locks::StockLockManager;
use crate::pool::Database;
use tindahan_core::validation::{validate_quantity, validate_reason, validate_target_quantity};
use tindahan_core::{CoreError, CoreResult, MovementKind, StockMovement};

// =============================================================================
// Request / Outcome
// =============================================================================

/// Kind of manual adjustment requested.
///
/// Distinct from [`MovementKind`]: a caller can never request a `Sale`
/// movement, that kind is written only by the sale processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentKind {
    /// Add `quantity` units (delivery, return to stock).
    StockIn,
    /// Remove `quantity` units (damage, shrinkage).
    StockOut,
    /// Set the quantity to `quantity` exactly (physical count).
    Adjustment,
}

/// A manual stock adjustment request.
#[derive(Debug, Clone)]
pub struct AdjustStockRequest {
    pub organization_id: String,
    pub branch_id: String,
    pub variant_id: String,
    pub kind: AdjustmentKind,
    /// Positive magnitude for StockIn/StockOut; absolute target (≥ 0) for
    /// Adjustment.
    pub quantity: i64,
    /// Required free-text reason for the audit trail, 1..=500 characters.
    pub reason: String,
    /// Staff member making the change, when known.
    pub actor_id: Option<String>,
}

/// Result of a committed adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustStockOutcome {
    pub new_quantity: i64,
    /// Id of the ledger entry this adjustment appended.
    pub movement_id: String,
}

// =============================================================================
// Engine
// =============================================================================

/// Applies manual stock adjustments as atomic, audited units of work.
#[derive(Debug, Clone)]
pub struct StockAdjustmentEngine {
    db: Database,
    locks: Arc<StockLockManager>,
}

impl StockAdjustmentEngine {
    /// Creates an engine sharing the given lock manager.
    ///
    /// The manager must be the same instance the sale processor uses, or the
    /// two engines will not serialize against each other.
    pub fn new(db: Database, locks: Arc<StockLockManager>) -> Self {
        StockAdjustmentEngine { db, locks }
    }

    /// Applies one adjustment.
    ///
    /// ## Errors
    /// * `Validation` - bad shape (quantity, reason); nothing was locked
    /// * `Unauthorized` / `BranchNotFound` / `VariantNotFound` /
    ///   `ActorNotFound` - tenant scope failures, checked before locking
    /// * `InsufficientStock` - the change would drive the quantity negative
    /// * `Busy` - row lock wait timed out; retry the whole request
    pub async fn adjust(&self, request: AdjustStockRequest) -> CoreResult<AdjustStockOutcome> {
        // Shape checks before any lock is taken.
        validate_reason(&request.reason)?;
        match request.kind {
            AdjustmentKind::StockIn | AdjustmentKind::StockOut => {
                validate_quantity(request.quantity)?
            }
            AdjustmentKind::Adjustment => validate_target_quantity(request.quantity)?,
        }

        // Tenant scope, still lock-free.
        let tenants = self.db.tenants();
        tenants
            .require_active_organization(&request.organization_id)
            .await?;
        tenants
            .require_branch(&request.organization_id, &request.branch_id)
            .await?;
        tenants
            .require_variant(&request.organization_id, &request.variant_id)
            .await?;
        if let Some(actor_id) = &request.actor_id {
            tenants
                .require_actor(&request.organization_id, actor_id)
                .await?;
        }

        // Lock, then open the transaction. The guard outlives the commit.
        let guards = self
            .locks
            .acquire_one(&request.branch_id, &request.variant_id)
            .await?;

        let inventory = self.db.inventory();
        let mut tx = self.db.pool().begin().await.map_err(crate::DbError::from)?;

        let record = inventory
            .get_for_update(
                &mut tx,
                &request.organization_id,
                &request.branch_id,
                &request.variant_id,
            )
            .await?;

        let before = record.quantity;
        let after = match request.kind {
            AdjustmentKind::StockIn => before + request.quantity,
            AdjustmentKind::StockOut => before - request.quantity,
            AdjustmentKind::Adjustment => request.quantity,
        };

        if after < 0 {
            debug!(
                variant_id = %request.variant_id,
                available = before,
                requested = request.quantity,
                "adjustment refused: would drive quantity negative"
            );
            return Err(CoreError::InsufficientStock {
                variant_id: request.variant_id.clone(),
                available: before,
                requested: request.quantity,
            });
        }

        inventory.set_quantity(&mut tx, &record.id, after).await?;

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            organization_id: request.organization_id.clone(),
            branch_id: request.branch_id.clone(),
            variant_id: request.variant_id.clone(),
            kind: match request.kind {
                AdjustmentKind::StockIn => MovementKind::StockIn,
                AdjustmentKind::StockOut => MovementKind::StockOut,
                AdjustmentKind::Adjustment => MovementKind::Adjustment,
            },
            quantity_delta: after - before,
            quantity_before: before,
            quantity_after: after,
            actor_id: request.actor_id.clone(),
            // Manual adjustments have no causing record of their own; the
            // movement row is the record.
            reference_kind: None,
            reference_id: None,
            reason: request.reason.trim().to_string(),
            created_at: Utc::now(),
        };
        let movement_id = movement.id.clone();

        self.db.movements().append(&mut tx, &movement).await?;

        tx.commit().await.map_err(crate::DbError::from)?;
        drop(guards);

        info!(
            variant_id = %request.variant_id,
            branch_id = %request.branch_id,
            before,
            after,
            kind = ?request.kind,
            "stock adjustment committed"
        );

        Ok(AdjustStockOutcome {
            new_quantity: after,
            movement_id,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
