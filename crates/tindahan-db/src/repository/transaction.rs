//! # Sale Transaction Repository
//!
//! Immutable sale headers, snapshotted line items, and the per-year
//! display-number counters.
//!
//! ## Display Numbers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Display Number Reservation                             │
//! │                                                                         │
//! │  One counter row per (organization, year):                              │
//! │                                                                         │
//! │    INSERT .. ON CONFLICT DO UPDATE SET last_seq = last_seq + 1          │
//! │    RETURNING last_seq                                                   │
//! │                                                                         │
//! │  The increment happens inside the sale's transaction, so a rolled-back │
//! │  sale releases its number and two concurrent sales can never collide.  │
//! │  Counting existing transaction rows and adding one would race.          │
//! │                                                                         │
//! │  Format: "{year}-{seq:06}"  e.g. 2026-000042                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tindahan_core::{SaleTransaction, TransactionItem, DISPLAY_NUMBER_WIDTH};

/// Repository for sale transactions.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Reserves the next display number for (organization, year) inside the
    /// caller's transaction.
    ///
    /// Atomic upsert: the first sale of a year creates the counter at 1,
    /// every later sale increments it. Uniqueness is additionally backed by
    /// the UNIQUE (organization_id, display_number) constraint.
    pub async fn next_display_number(
        &self,
        conn: &mut SqliteConnection,
        organization_id: &str,
        year: i32,
    ) -> DbResult<String> {
        let (seq,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO transaction_counters (organization_id, year, last_seq)
            VALUES (?1, ?2, 1)
            ON CONFLICT (organization_id, year)
                DO UPDATE SET last_seq = last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(organization_id)
        .bind(year)
        .fetch_one(&mut *conn)
        .await?;

        let display_number = format!("{year}-{seq:0width$}", width = DISPLAY_NUMBER_WIDTH);
        debug!(organization_id, %display_number, "reserved display number");
        Ok(display_number)
    }

    /// Inserts a sale header inside the caller's transaction.
    pub async fn insert_transaction(
        &self,
        conn: &mut SqliteConnection,
        tx: &SaleTransaction,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions
                (id, organization_id, branch_id, actor_id, display_number,
                 subtotal_centavos, total_cost_centavos, gross_profit_centavos,
                 payment_method, customer_note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.organization_id)
        .bind(&tx.branch_id)
        .bind(&tx.actor_id)
        .bind(&tx.display_number)
        .bind(tx.subtotal_centavos)
        .bind(tx.total_cost_centavos)
        .bind(tx.gross_profit_centavos)
        .bind(tx.payment_method)
        .bind(&tx.customer_note)
        .bind(tx.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one snapshotted line item inside the caller's transaction.
    pub async fn insert_item(
        &self,
        conn: &mut SqliteConnection,
        item: &TransactionItem,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transaction_items
                (id, transaction_id, variant_id, name_snapshot, sku_snapshot,
                 unit_price_centavos, unit_cost_centavos, quantity,
                 line_total_centavos, line_cost_centavos, line_profit_centavos,
                 created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.transaction_id)
        .bind(&item.variant_id)
        .bind(&item.name_snapshot)
        .bind(&item.sku_snapshot)
        .bind(item.unit_price_centavos)
        .bind(item.unit_cost_centavos)
        .bind(item.quantity)
        .bind(item.line_total_centavos)
        .bind(item.line_cost_centavos)
        .bind(item.line_profit_centavos)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Fetches a sale header by id, tenant-scoped.
    pub async fn get_by_id(
        &self,
        organization_id: &str,
        transaction_id: &str,
    ) -> DbResult<Option<SaleTransaction>> {
        let tx = sqlx::query_as::<_, SaleTransaction>(
            "SELECT id, organization_id, branch_id, actor_id, display_number,
                    subtotal_centavos, total_cost_centavos, gross_profit_centavos,
                    payment_method, customer_note, created_at
             FROM transactions
             WHERE organization_id = ?1 AND id = ?2",
        )
        .bind(organization_id)
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tx)
    }

    /// Returns the line items of a transaction, in insertion order.
    pub async fn items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let items = sqlx::query_as::<_, TransactionItem>(
            "SELECT id, transaction_id, variant_id, name_snapshot, sku_snapshot,
                    unit_price_centavos, unit_cost_centavos, quantity,
                    line_total_centavos, line_cost_centavos, line_profit_centavos,
                    created_at
             FROM transaction_items
             WHERE transaction_id = ?1
             ORDER BY rowid",
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(items)
    }

    /// Lists recent sale headers for an organization, newest first.
    pub async fn list_recent(
        &self,
        organization_id: &str,
        limit: i64,
    ) -> DbResult<Vec<SaleTransaction>> {
        let txs = sqlx::query_as::<_, SaleTransaction>(
            "SELECT id, organization_id, branch_id, actor_id, display_number,
                    subtotal_centavos, total_cost_centavos, gross_profit_centavos,
                    payment_method, customer_note, created_at
             FROM transactions
             WHERE organization_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .bind(organization_id)
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.pool)
        .await?;

        Ok(txs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
