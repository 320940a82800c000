//! # Domain Types
//!
//! Core domain types for the Tindahan POS transactional core.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Organization ──┬── Branch ──┬── InventoryRecord ──── StockMovement    │
//! │   (tenant)      │            │   (one per branch ×     (append-only    │
//! │                 │            │    variant, the only     audit entry)   │
//! │                 │            │    mutable state)                       │
//! │                 │            │                                         │
//! │                 ├── Staff    └── SaleTransaction ── TransactionItem    │
//! │                 │                 (immutable header)  (snapshotted     │
//! │                 └── ItemVariant                        line)           │
//! │                      (sellable SKU)                                    │
//! │                                                                         │
//! │  Every child entity carries organization_id: the tenant isolation      │
//! │  boundary enforced by the data layer.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, display_number) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Record State
// =============================================================================

/// Explicit lifecycle state for soft-deletable entities.
///
/// ## Why an enum instead of a nullable `deleted_at`?
/// A nullable timestamp means "deleted" only if every query remembers to
/// filter on it. An explicit state makes exclusion a matter of construction:
/// lookups on the sale/adjustment paths only accept `Active` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Visible and usable.
    Active,
    /// Hidden from sale/adjustment paths but not deleted (e.g. seasonal SKU).
    Inactive,
    /// Soft-deleted. Historical rows still reference it.
    Deleted,
}

impl RecordState {
    /// Whether the entity may participate in new sales and adjustments.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, RecordState::Active)
    }
}

// =============================================================================
// Organization (Tenant)
// =============================================================================

/// Subscription standing of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Trial,
    Active,
    Suspended,
}

/// A tenant. Every other entity in the system belongs to exactly one
/// organization, and the data layer rejects any operation whose target rows
/// carry a different organization id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub subscription: SubscriptionState,
    /// Soft-deleted organizations are never hard-deleted while child data exists.
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Branch
// =============================================================================

/// A physical shop location owned by exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Branch {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// At most one default branch per organization (enforced on write).
    pub is_default: bool,
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Staff
// =============================================================================

/// A staff member (cashier, manager) of one organization.
///
/// Administrative CRUD for staff lives outside the core; this type exists so
/// the sale processor can verify an actor belongs to the organization and so
/// movements can record who made them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Staff {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Item Variant
// =============================================================================

/// A sellable SKU.
///
/// `sku` is unique within an organization. Selling price must be > 0 and unit
/// cost ≥ 0, both in centavos.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ItemVariant {
    pub id: String,
    pub organization_id: String,
    /// Display name shown to cashier and snapshotted onto receipts.
    pub name: String,
    /// Stock Keeping Unit - business identifier, unique per organization.
    pub sku: String,
    /// Selling price in centavos (> 0).
    pub price_centavos: i64,
    /// Unit cost in centavos (≥ 0), used for profit calculations.
    pub cost_centavos: i64,
    pub state: RecordState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemVariant {
    /// Returns the selling price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_centavos(self.price_centavos)
    }

    /// Returns the unit cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_centavos(self.cost_centavos)
    }
}

// =============================================================================
// Inventory Record
// =============================================================================

/// The live quantity-on-hand of one ItemVariant at one Branch.
///
/// Exactly one record exists per (branch, variant) pair. `quantity` is the
/// single mutable piece of state the whole system protects: it is changed
/// only by the adjustment engine and the sale processor, under the row lock,
/// and only ever after a non-negativity check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryRecord {
    pub id: String,
    pub organization_id: String,
    pub branch_id: String,
    pub variant_id: String,
    /// Non-negative, always.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock Movement
// =============================================================================

/// What caused a quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Goods received (restock, return to stock).
    StockIn,
    /// Goods removed manually (damage, shrinkage).
    StockOut,
    /// Absolute correction to a counted quantity.
    Adjustment,
    /// Deduction made by a committed sale.
    Sale,
}

/// What kind of record a movement's reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A committed SaleTransaction.
    SaleTransaction,
    /// A manual adjustment request.
    ManualAdjustment,
}

/// One immutable audit entry in the movement ledger.
///
/// ## Replay invariant
/// For a given (branch, variant), `quantity_after` of entry N equals
/// `quantity_before` of the chronologically next entry. Replaying deltas in
/// order reproduces every recorded `after` and ends at the live quantity -
/// this is what reconciliation checks.
///
/// Once written, a movement is never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockMovement {
    pub id: String,
    pub organization_id: String,
    pub branch_id: String,
    pub variant_id: String,
    pub kind: MovementKind,
    /// Signed change applied to the quantity (after − before).
    pub quantity_delta: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    /// Staff member who caused the change, when known.
    pub actor_id: Option<String>,
    /// Kind + id of the causing record (sale transaction or manual request).
    pub reference_kind: Option<ReferenceKind>,
    pub reference_id: Option<String>,
    /// Free-text reason, required, ≤ 500 characters.
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// GCash mobile wallet.
    Gcash,
    /// Card payment on external terminal.
    Card,
    /// Direct bank transfer.
    BankTransfer,
}

// =============================================================================
// Sale Transaction
// =============================================================================

/// Header for one completed sale.
///
/// Immutable after creation: there is no update or delete path. Corrections
/// happen via new transactions or explicit refund records, never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleTransaction {
    pub id: String,
    pub organization_id: String,
    pub branch_id: String,
    pub actor_id: String,
    /// Sequential display number, unique per organization per year,
    /// e.g. `2026-000042`.
    pub display_number: String,
    pub subtotal_centavos: i64,
    pub total_cost_centavos: i64,
    /// Always subtotal − total cost.
    pub gross_profit_centavos: i64,
    pub payment_method: PaymentMethod,
    pub customer_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SaleTransaction {
    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_centavos(self.subtotal_centavos)
    }

    /// Returns the gross profit as Money.
    #[inline]
    pub fn gross_profit(&self) -> Money {
        Money::from_centavos(self.gross_profit_centavos)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// One line of a sale transaction.
///
/// Uses the snapshot pattern: variant name and SKU are frozen at sale time so
/// historical receipts stay stable if the catalog later changes. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub variant_id: String,
    /// Variant name at time of sale (frozen).
    pub name_snapshot: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_centavos: i64,
    /// Unit cost in centavos at time of sale (frozen).
    pub unit_cost_centavos: i64,
    /// Quantity sold (> 0).
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_centavos: i64,
    /// unit_cost × quantity.
    pub line_cost_centavos: i64,
    /// line_total − line_cost.
    pub line_profit_centavos: i64,
    pub created_at: DateTime<Utc>,
}

impl TransactionItem {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_centavos(self.line_total_centavos)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_state_is_active() {
        assert!(RecordState::Active.is_active());
        assert!(!RecordState::Inactive.is_active());
        assert!(!RecordState::Deleted.is_active());
    }

    #[test]
    fn test_payment_method_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::BankTransfer).unwrap(),
            "\"bank_transfer\""
        );
        assert_eq!(
            serde_json::from_str::<PaymentMethod>("\"gcash\"").unwrap(),
            PaymentMethod::Gcash
        );
    }

    #[test]
    fn test_movement_kind_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&MovementKind::StockIn).unwrap(),
            "\"stock_in\""
        );
        assert_eq!(
            serde_json::from_str::<MovementKind>("\"sale\"").unwrap(),
            MovementKind::Sale
        );
    }

    #[test]
    fn test_variant_money_accessors() {
        let now = Utc::now();
        let variant = ItemVariant {
            id: "v1".to_string(),
            organization_id: "org1".to_string(),
            name: "Sinigang Mix 40g".to_string(),
            sku: "SNG-40".to_string(),
            price_centavos: 1850,
            cost_centavos: 1200,
            state: RecordState::Active,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(variant.price().centavos(), 1850);
        assert_eq!(variant.cost().centavos(), 1200);
    }
}
