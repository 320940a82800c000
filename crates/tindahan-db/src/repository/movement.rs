//! # Stock Movement Ledger
//!
//! Append-only audit trail of every quantity change.
//!
//! ## Ledger Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Append-Only Movement Ledger                          │
//! │                                                                         │
//! │  append ──► INSERT only. No UPDATE or DELETE statement exists in       │
//! │             this file, on purpose.                                      │
//! │                                                                         │
//! │  Each entry snapshots quantity_before and quantity_after so the        │
//! │  ledger can be audited without replaying from zero:                     │
//! │                                                                         │
//! │    entry N:   before=10  delta=-3  after=7                             │
//! │    entry N+1: before=7   delta=+5  after=12   ◄── chains               │
//! │                                                                         │
//! │  replay_quantity re-walks the chain and checks it against the live     │
//! │  inventory record (reconciliation).                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tindahan_core::{MovementKind, StockMovement};

/// Default page size for movement history queries.
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

/// Largest page size an explicit `limit` may request.
pub const MAX_HISTORY_LIMIT: i64 = 500;

// =============================================================================
// Query Filter
// =============================================================================

/// Filter for movement history queries. All fields optional; organization
/// scope is a separate required parameter on [`MovementRepository::history`].
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub branch_id: Option<String>,
    pub variant_id: Option<String>,
    pub kind: Option<MovementKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Page size. Defaults to [`DEFAULT_HISTORY_LIMIT`] when unset; explicit
    /// values are capped at [`MAX_HISTORY_LIMIT`].
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// =============================================================================
// Replay Result
// =============================================================================

/// Result of replaying one (branch, variant) ledger chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReplay {
    /// Number of movements in the chain.
    pub movement_count: usize,
    /// Quantity after applying every delta in order, starting from zero.
    pub final_quantity: i64,
    /// True when every entry's `quantity_before` equals the previous entry's
    /// `quantity_after` and each delta matches `after - before`.
    pub chain_intact: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the stock-movement ledger.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

const MOVEMENT_COLUMNS: &str = "id, organization_id, branch_id, variant_id, kind, \
     quantity_delta, quantity_before, quantity_after, actor_id, \
     reference_kind, reference_id, reason, created_at";

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends one movement inside the caller's transaction.
    ///
    /// The caller constructs the full entry (including before/after snapshots
    /// read under the row lock); this method only persists it. Movement rows
    /// are never updated or deleted afterwards.
    pub async fn append(
        &self,
        conn: &mut SqliteConnection,
        movement: &StockMovement,
    ) -> DbResult<()> {
        debug!(
            movement_id = %movement.id,
            variant_id = %movement.variant_id,
            delta = movement.quantity_delta,
            "appending stock movement"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_movements
                (id, organization_id, branch_id, variant_id, kind,
                 quantity_delta, quantity_before, quantity_after, actor_id,
                 reference_kind, reference_id, reason, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.organization_id)
        .bind(&movement.branch_id)
        .bind(&movement.variant_id)
        .bind(movement.kind)
        .bind(movement.quantity_delta)
        .bind(movement.quantity_before)
        .bind(movement.quantity_after)
        .bind(&movement.actor_id)
        .bind(movement.reference_kind)
        .bind(&movement.reference_id)
        .bind(&movement.reason)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Queries movement history for an organization, newest first.
    pub async fn history(
        &self,
        organization_id: &str,
        filter: &MovementFilter,
    ) -> DbResult<Vec<StockMovement>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE organization_id = "
        ));
        qb.push_bind(organization_id);

        if let Some(branch_id) = &filter.branch_id {
            qb.push(" AND branch_id = ").push_bind(branch_id);
        }
        if let Some(variant_id) = &filter.variant_id {
            qb.push(" AND variant_id = ").push_bind(variant_id);
        }
        if let Some(kind) = filter.kind {
            qb.push(" AND kind = ").push_bind(kind);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at <= ").push_bind(to);
        }

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(limit);
        if let Some(offset) = filter.offset {
            qb.push(" OFFSET ").push_bind(offset.max(0));
        }

        let movements = qb
            .build_query_as::<StockMovement>()
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Returns the full chain for one (branch, variant), oldest first.
    ///
    /// Ordered by rowid: appends to one pair are serialized under the row
    /// lock and the table is insert-only, so insertion order is the ledger
    /// order. Timestamps alone cannot break ties between entries written in
    /// the same microsecond.
    pub async fn chain(
        &self,
        organization_id: &str,
        branch_id: &str,
        variant_id: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements
             WHERE organization_id = ?1 AND branch_id = ?2 AND variant_id = ?3
             ORDER BY rowid ASC"
        ))
        .bind(organization_id)
        .bind(branch_id)
        .bind(variant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Replays the ledger chain for one (branch, variant) from zero.
    ///
    /// Used by reconciliation: `final_quantity` should equal the live
    /// inventory record and `chain_intact` should be true. A broken chain
    /// means writes bypassed the engines.
    pub async fn replay_quantity(
        &self,
        organization_id: &str,
        branch_id: &str,
        variant_id: &str,
    ) -> DbResult<LedgerReplay> {
        let chain = self.chain(organization_id, branch_id, variant_id).await?;

        let mut quantity = 0i64;
        let mut intact = true;

        for movement in &chain {
            if movement.quantity_before != quantity
                || movement.quantity_after != movement.quantity_before + movement.quantity_delta
            {
                intact = false;
            }
            quantity += movement.quantity_delta;
        }

        Ok(LedgerReplay {
            movement_count: chain.len(),
            final_quantity: quantity,
            chain_intact: intact,
        })
    }

    /// Counts movements recorded against one reference (e.g. one sale).
    pub async fn count_for_reference(&self, reference_id: &str) -> DbResult<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stock_movements WHERE reference_id = ?1")
                .bind(reference_id)
                .fetch_one(&self.pool)
                .await
                .map_err(DbError::from)?;
        Ok(count.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tindahan_core::MovementKind;
    use uuid::Uuid;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn fixture(db: &Database) -> (String, String, String) {
        let org = db.tenants().create_organization("Shop").await.unwrap();
        let branch = db
            .tenants()
            .create_branch(&org.id, "Main", true)
            .await
            .unwrap();
        let variant = db
            .tenants()
            .create_variant(&org.id, "Tuyo Pack", "TYO-01", 2500, 1500)
            .await
            .unwrap();
        db.inventory()
            .create(&org.id, &branch.id, &variant.id)
            .await
            .unwrap();
        (org.id, branch.id, variant.id)
    }

    fn movement(
        org: &str,
        branch: &str,
        variant: &str,
        kind: MovementKind,
        before: i64,
        delta: i64,
    ) -> StockMovement {
        StockMovement {
            id: Uuid::new_v4().to_string(),
            organization_id: org.to_string(),
            branch_id: branch.to_string(),
            variant_id: variant.to_string(),
            kind,
            quantity_delta: delta,
            quantity_before: before,
            quantity_after: before + delta,
            actor_id: None,
            reference_kind: None,
            reference_id: None,
            reason: "test movement".to_string(),
            created_at: Utc::now(),
        }
    }

    async fn append(db: &Database, m: &StockMovement) {
        let mut tx = db.pool().begin().await.unwrap();
        db.movements().append(&mut tx, m).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_append_and_history_newest_first() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 0, 10)).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::Sale, 10, -3)).await;

        let history = db
            .movements()
            .history(&org, &MovementFilter::default())
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, MovementKind::Sale);
        assert_eq!(history[1].kind, MovementKind::StockIn);
    }

    #[tokio::test]
    async fn test_history_filters_by_kind_and_variant() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;
        let other_variant = db
            .tenants()
            .create_variant(&org, "Bagoong Jar", "BGG-01", 9500, 6000)
            .await
            .unwrap();

        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 0, 5)).await;
        append(&db, &movement(&org, &branch, &other_variant.id, MovementKind::StockIn, 0, 2)).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::StockOut, 5, -1)).await;

        let filter = MovementFilter {
            variant_id: Some(variant.clone()),
            kind: Some(MovementKind::StockIn),
            ..Default::default()
        };
        let history = db.movements().history(&org, &filter).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].variant_id, variant);
        assert_eq!(history[0].quantity_delta, 5);
    }

    #[tokio::test]
    async fn test_history_is_tenant_scoped() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 0, 5)).await;

        let other = db.tenants().create_organization("Other").await.unwrap();
        let history = db
            .movements()
            .history(&other.id, &MovementFilter::default())
            .await
            .unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_history_honors_explicit_limit() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 0, 5)).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 5, 5)).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::Sale, 10, -1)).await;

        let filter = MovementFilter {
            limit: Some(2),
            ..Default::default()
        };
        let page = db.movements().history(&org, &filter).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].kind, MovementKind::Sale);

        // A limit above the cap is accepted, just bounded.
        let filter = MovementFilter {
            limit: Some(MAX_HISTORY_LIMIT + 1),
            ..Default::default()
        };
        let all = db.movements().history(&org, &filter).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_replay_intact_chain() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 0, 10)).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::Sale, 10, -4)).await;
        append(&db, &movement(&org, &branch, &variant, MovementKind::Adjustment, 6, 2)).await;

        let replay = db
            .movements()
            .replay_quantity(&org, &branch, &variant)
            .await
            .unwrap();
        assert_eq!(replay.movement_count, 3);
        assert_eq!(replay.final_quantity, 8);
        assert!(replay.chain_intact);
    }

    #[tokio::test]
    async fn test_replay_detects_broken_chain() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        append(&db, &movement(&org, &branch, &variant, MovementKind::StockIn, 0, 10)).await;
        // before=12 does not match previous after=10
        append(&db, &movement(&org, &branch, &variant, MovementKind::Sale, 12, -2)).await;

        let replay = db
            .movements()
            .replay_quantity(&org, &branch, &variant)
            .await
            .unwrap();
        assert!(!replay.chain_intact);
        assert_eq!(replay.final_quantity, 8);
    }

    #[tokio::test]
    async fn test_replay_order_survives_identical_timestamps() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        // Two entries written in the same microsecond, with ids whose
        // lexicographic order inverts insertion order. Replay must follow
        // insertion order, not id order.
        let stamp = Utc::now();
        let mut first = movement(&org, &branch, &variant, MovementKind::StockIn, 0, 5);
        first.id = "zz-first".to_string();
        first.created_at = stamp;
        let mut second = movement(&org, &branch, &variant, MovementKind::Sale, 5, -2);
        second.id = "aa-second".to_string();
        second.created_at = stamp;

        append(&db, &first).await;
        append(&db, &second).await;

        let replay = db
            .movements()
            .replay_quantity(&org, &branch, &variant)
            .await
            .unwrap();
        assert!(replay.chain_intact);
        assert_eq!(replay.final_quantity, 3);
    }

    #[tokio::test]
    async fn test_replay_empty_chain() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        let replay = db
            .movements()
            .replay_quantity(&org, &branch, &variant)
            .await
            .unwrap();
        assert_eq!(replay.movement_count, 0);
        assert_eq!(replay.final_quantity, 0);
        assert!(replay.chain_intact);
    }
}
