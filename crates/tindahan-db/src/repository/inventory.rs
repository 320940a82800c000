//! # Inventory Repository
//!
//! The live quantity-on-hand records - the single mutable piece of state the
//! whole system protects.
//!
//! ## Locked Read / Guarded Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Who May Touch Quantity                              │
//! │                                                                         │
//! │  Reporting:   get / list_for_branch        (pool, no lock)             │
//! │                                                                         │
//! │  Mutation:    get_for_update ──► set_quantity                          │
//! │               only inside a unit of work that holds the                │
//! │               StockLockManager guard for this (branch, variant)        │
//! │               AND an open sqlx transaction                             │
//! │                                                                         │
//! │  set_quantity re-checks new_quantity >= 0 defensively; the CHECK       │
//! │  constraint in the schema is the last line of defense.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tindahan_core::{CoreError, CoreResult, InventoryRecord};

/// Repository for inventory record operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

const SELECT_RECORD: &str =
    "SELECT id, organization_id, branch_id, variant_id, quantity, created_at, updated_at
     FROM inventory_records WHERE branch_id = ?1 AND variant_id = ?2";

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Creates the single inventory record for a (branch, variant) pair,
    /// starting at quantity 0. Stock arrives through the adjustment engine
    /// so that the opening balance is on the ledger too.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - a record already exists for the pair
    pub async fn create(
        &self,
        organization_id: &str,
        branch_id: &str,
        variant_id: &str,
    ) -> DbResult<InventoryRecord> {
        // Pre-check for a friendlier error; the UNIQUE index is the backstop
        // against a concurrent insert.
        if self.get(branch_id, variant_id).await?.is_some() {
            return Err(DbError::duplicate(
                "inventory_records(branch_id, variant_id)",
                format!("{branch_id}/{variant_id}"),
            ));
        }

        let now = Utc::now();
        let record = InventoryRecord {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            branch_id: branch_id.to_string(),
            variant_id: variant_id.to_string(),
            quantity: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(branch_id, variant_id, "creating inventory record");

        sqlx::query(
            r#"
            INSERT INTO inventory_records
                (id, organization_id, branch_id, variant_id, quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.organization_id)
        .bind(&record.branch_id)
        .bind(&record.variant_id)
        .bind(record.quantity)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Reads the current record for a (branch, variant) pair. No lock taken -
    /// reporting surface only.
    pub async fn get(&self, branch_id: &str, variant_id: &str) -> DbResult<Option<InventoryRecord>> {
        let record = sqlx::query_as::<_, InventoryRecord>(SELECT_RECORD)
            .bind(branch_id)
            .bind(variant_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Lists all inventory records for a branch, tenant-scoped.
    pub async fn list_for_branch(
        &self,
        organization_id: &str,
        branch_id: &str,
    ) -> DbResult<Vec<InventoryRecord>> {
        let records = sqlx::query_as::<_, InventoryRecord>(
            "SELECT id, organization_id, branch_id, variant_id, quantity, created_at, updated_at
             FROM inventory_records
             WHERE organization_id = ?1 AND branch_id = ?2
             ORDER BY variant_id",
        )
        .bind(organization_id)
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Locked read inside a unit of work.
    ///
    /// ## Preconditions
    /// The caller holds the StockLockManager guard for this (branch, variant)
    /// and `conn` belongs to an open transaction. The guard is what makes
    /// this read-then-write safe; this method checks the tenant, not the lock.
    ///
    /// ## Returns
    /// * `Err(VariantNotFound)` - no record exists for the pair
    /// * `Err(Unauthorized)` - record belongs to another organization
    pub async fn get_for_update(
        &self,
        conn: &mut SqliteConnection,
        organization_id: &str,
        branch_id: &str,
        variant_id: &str,
    ) -> CoreResult<InventoryRecord> {
        let record = sqlx::query_as::<_, InventoryRecord>(SELECT_RECORD)
            .bind(branch_id)
            .bind(variant_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(DbError::from)?;

        match record {
            None => Err(CoreError::VariantNotFound(variant_id.to_string())),
            Some(r) if r.organization_id != organization_id => Err(CoreError::unauthorized(
                organization_id,
                "inventory record",
                &r.id,
            )),
            Some(r) => Ok(r),
        }
    }

    /// Writes a new quantity for a record the caller has locked.
    ///
    /// Callers compute `new_quantity` after validating, so a negative value
    /// here means a bug upstream - the store re-checks defensively and
    /// refuses rather than trusting the caller.
    pub async fn set_quantity(
        &self,
        conn: &mut SqliteConnection,
        record_id: &str,
        new_quantity: i64,
    ) -> CoreResult<()> {
        if new_quantity < 0 {
            return Err(CoreError::InvariantViolation(format!(
                "attempted to set quantity of inventory record {record_id} to {new_quantity}"
            )));
        }

        let result = sqlx::query(
            "UPDATE inventory_records SET quantity = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(record_id)
        .bind(new_quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(DbError::from)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::Internal(format!(
                "inventory record {record_id} vanished mid-transaction"
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use tindahan_core::CoreError;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// org + branch + variant fixture for inventory tests.
    async fn fixture(db: &Database) -> (String, String, String) {
        let org = db.tenants().create_organization("Shop").await.unwrap();
        let branch = db
            .tenants()
            .create_branch(&org.id, "Main", true)
            .await
            .unwrap();
        let variant = db
            .tenants()
            .create_variant(&org.id, "Sinigang Mix", "SNG-40", 1850, 1200)
            .await
            .unwrap();
        (org.id, branch.id, variant.id)
    }

    #[tokio::test]
    async fn test_create_starts_at_zero() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        let record = db.inventory().create(&org, &branch, &variant).await.unwrap();
        assert_eq!(record.quantity, 0);

        let read = db.inventory().get(&branch, &variant).await.unwrap().unwrap();
        assert_eq!(read.id, record.id);
        assert_eq!(read.quantity, 0);
    }

    #[tokio::test]
    async fn test_one_record_per_branch_variant_pair() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        db.inventory().create(&org, &branch, &variant).await.unwrap();
        let err = db
            .inventory()
            .create(&org, &branch, &variant)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_get_for_update_missing_record() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = db
            .inventory()
            .get_for_update(&mut tx, &org, &branch, &variant)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::VariantNotFound(_)));
    }

    #[tokio::test]
    async fn test_get_for_update_cross_tenant() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;
        db.inventory().create(&org, &branch, &variant).await.unwrap();

        let other = db.tenants().create_organization("Other").await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = db
            .inventory()
            .get_for_update(&mut tx, &other.id, &branch, &variant)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_negative() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;
        let record = db.inventory().create(&org, &branch, &variant).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = db
            .inventory()
            .set_quantity(&mut tx, &record.id, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_set_quantity_within_transaction_rolls_back() {
        let db = db().await;
        let (org, branch, variant) = fixture(&db).await;
        let record = db.inventory().create(&org, &branch, &variant).await.unwrap();

        {
            let mut tx = db.pool().begin().await.unwrap();
            db.inventory()
                .set_quantity(&mut tx, &record.id, 42)
                .await
                .unwrap();
            // dropped without commit
        }

        let read = db.inventory().get(&branch, &variant).await.unwrap().unwrap();
        assert_eq!(read.quantity, 0);
    }
}
