//! # Tenant Repository
//!
//! Organizations, branches, staff, and item variants - plus the tenant scope
//! checks every engine runs before touching inventory.
//!
//! ## The Enforcement Boundary
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Tenant Isolation                                   │
//! │                                                                         │
//! │  Caller supplies organization_id on EVERY operation                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  require_branch(org, branch)                                           │
//! │       ├── row missing or deleted  → BranchNotFound                     │
//! │       ├── row owned by other org  → Unauthorized (short-circuits       │
//! │       │                              before any lock is taken)         │
//! │       └── active + owned          → Branch                             │
//! │                                                                         │
//! │  This is not a cosmetic filter: absence of this check is a             │
//! │  correctness bug, not a convenience gap.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tindahan_core::validation::{validate_price_centavos, validate_selling_price, validate_sku};
use tindahan_core::{
    Branch, CoreError, CoreResult, ItemVariant, Organization, RecordState, Staff,
    SubscriptionState,
};

/// Repository for tenant-level entities and scope checks.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    /// Creates a new TenantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    // =========================================================================
    // Creation (signup / provisioning surface)
    // =========================================================================

    /// Creates a new organization in trial standing.
    pub async fn create_organization(&self, name: &str) -> DbResult<Organization> {
        let now = Utc::now();
        let org = Organization {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            subscription: SubscriptionState::Trial,
            state: RecordState::Active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %org.id, name = %org.name, "creating organization");

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, subscription, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&org.id)
        .bind(&org.name)
        .bind(org.subscription)
        .bind(org.state)
        .bind(org.created_at)
        .bind(org.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(org)
    }

    /// Creates a branch for an organization.
    ///
    /// When `is_default` is set, any existing default branch is cleared in
    /// the same transaction - at most one default branch per organization is
    /// enforced on write (and backstopped by a partial unique index).
    pub async fn create_branch(
        &self,
        organization_id: &str,
        name: &str,
        is_default: bool,
    ) -> DbResult<Branch> {
        let now = Utc::now();
        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            is_default,
            state: RecordState::Active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %branch.id, org = %organization_id, "creating branch");

        let mut tx = self.pool.begin().await?;

        if is_default {
            sqlx::query(
                "UPDATE branches SET is_default = 0, updated_at = ?2
                 WHERE organization_id = ?1 AND is_default = 1",
            )
            .bind(organization_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO branches (id, organization_id, name, is_default, state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&branch.id)
        .bind(&branch.organization_id)
        .bind(&branch.name)
        .bind(branch.is_default)
        .bind(branch.state)
        .bind(branch.created_at)
        .bind(branch.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(branch)
    }

    /// Makes the given branch the organization's default, clearing any
    /// previous default in the same transaction.
    pub async fn set_default_branch(
        &self,
        organization_id: &str,
        branch_id: &str,
    ) -> CoreResult<()> {
        // Scope check first: never mutate rows we haven't verified.
        self.require_branch(organization_id, branch_id).await?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        sqlx::query(
            "UPDATE branches SET is_default = 0, updated_at = ?2
             WHERE organization_id = ?1 AND is_default = 1",
        )
        .bind(organization_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DbError::from)?;

        sqlx::query("UPDATE branches SET is_default = 1, updated_at = ?2 WHERE id = ?1")
            .bind(branch_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DbError::from)?;

        tx.commit().await.map_err(DbError::from)?;

        Ok(())
    }

    /// Creates a staff member for an organization.
    pub async fn create_staff(&self, organization_id: &str, name: &str) -> DbResult<Staff> {
        let staff = Staff {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            state: RecordState::Active,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO staff (id, organization_id, name, state, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&staff.id)
        .bind(&staff.organization_id)
        .bind(&staff.name)
        .bind(staff.state)
        .bind(staff.created_at)
        .execute(&self.pool)
        .await?;

        Ok(staff)
    }

    /// Creates an item variant.
    ///
    /// ## Returns
    /// * `Err(Validation)` - bad SKU, non-positive price, negative cost
    /// * `Err(Internal)` wrapping a unique violation - SKU already exists
    ///   within the organization
    pub async fn create_variant(
        &self,
        organization_id: &str,
        name: &str,
        sku: &str,
        price_centavos: i64,
        cost_centavos: i64,
    ) -> CoreResult<ItemVariant> {
        validate_sku(sku)?;
        validate_selling_price(price_centavos)?;
        validate_price_centavos("cost_centavos", cost_centavos)?;

        let now = Utc::now();
        let variant = ItemVariant {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            name: name.to_string(),
            sku: sku.trim().to_string(),
            price_centavos,
            cost_centavos,
            state: RecordState::Active,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %variant.id, sku = %variant.sku, "creating item variant");

        sqlx::query(
            r#"
            INSERT INTO item_variants
                (id, organization_id, name, sku, price_centavos, cost_centavos,
                 state, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.organization_id)
        .bind(&variant.name)
        .bind(&variant.sku)
        .bind(variant.price_centavos)
        .bind(variant.cost_centavos)
        .bind(variant.state)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(variant)
    }

    /// Soft-deletes a variant. Historical movements and receipt lines keep
    /// referencing it; new sales and adjustments no longer see it.
    pub async fn delete_variant(&self, organization_id: &str, variant_id: &str) -> CoreResult<()> {
        self.require_variant(organization_id, variant_id).await?;

        sqlx::query("UPDATE item_variants SET state = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(variant_id)
            .bind(RecordState::Deleted)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    // =========================================================================
    // Scope checks (the tenant context)
    // =========================================================================

    /// Fetches an organization by id.
    pub async fn get_organization(&self, id: &str) -> DbResult<Option<Organization>> {
        let org = sqlx::query_as::<_, Organization>(
            "SELECT id, name, subscription, state, created_at, updated_at
             FROM organizations WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(org)
    }

    /// Requires an active (not deleted, not suspended) organization.
    pub async fn require_active_organization(&self, id: &str) -> CoreResult<Organization> {
        let org = self
            .get_organization(id)
            .await?
            .filter(|o| o.state.is_active())
            .ok_or_else(|| CoreError::unauthorized(id, "organization", id))?;

        if org.subscription == SubscriptionState::Suspended {
            return Err(CoreError::unauthorized(id, "organization", id));
        }

        Ok(org)
    }

    /// Requires an active branch owned by the organization.
    ///
    /// Wrong org → Unauthorized; missing or deleted → BranchNotFound.
    pub async fn require_branch(
        &self,
        organization_id: &str,
        branch_id: &str,
    ) -> CoreResult<Branch> {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT id, organization_id, name, is_default, state, created_at, updated_at
             FROM branches WHERE id = ?1",
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        match branch {
            None => Err(CoreError::BranchNotFound(branch_id.to_string())),
            Some(b) if b.organization_id != organization_id => Err(CoreError::unauthorized(
                organization_id,
                "branch",
                branch_id,
            )),
            Some(b) if !b.state.is_active() => Err(CoreError::BranchNotFound(branch_id.to_string())),
            Some(b) => Ok(b),
        }
    }

    /// Requires an active item variant owned by the organization.
    pub async fn require_variant(
        &self,
        organization_id: &str,
        variant_id: &str,
    ) -> CoreResult<ItemVariant> {
        let variant = sqlx::query_as::<_, ItemVariant>(
            "SELECT id, organization_id, name, sku, price_centavos, cost_centavos,
                    state, created_at, updated_at
             FROM item_variants WHERE id = ?1",
        )
        .bind(variant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        match variant {
            None => Err(CoreError::VariantNotFound(variant_id.to_string())),
            Some(v) if v.organization_id != organization_id => Err(CoreError::unauthorized(
                organization_id,
                "item variant",
                variant_id,
            )),
            Some(v) if !v.state.is_active() => {
                Err(CoreError::VariantNotFound(variant_id.to_string()))
            }
            Some(v) => Ok(v),
        }
    }

    /// Requires an active staff member owned by the organization.
    pub async fn require_actor(&self, organization_id: &str, actor_id: &str) -> CoreResult<Staff> {
        let staff = sqlx::query_as::<_, Staff>(
            "SELECT id, organization_id, name, state, created_at
             FROM staff WHERE id = ?1",
        )
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        match staff {
            None => Err(CoreError::ActorNotFound(actor_id.to_string())),
            Some(s) if s.organization_id != organization_id => {
                Err(CoreError::unauthorized(organization_id, "staff", actor_id))
            }
            Some(s) if !s.state.is_active() => Err(CoreError::ActorNotFound(actor_id.to_string())),
            Some(s) => Ok(s),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
