//! # Sale Transaction Processor
//!
//! Turns a validated cart into: an immutable transaction header, snapshotted
//! line items, quantity deductions, and one ledger entry per line - all in a
//! single atomic unit of work.
//!
//! ## Processing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       process_sale Pipeline                             │
//! │                                                                         │
//! │  1. shape validation      empty cart, quantities, prices, duplicates   │
//! │  2. tenant scope          org / branch / actor all verified            │
//! │  3. variant lookups       Active + org-scoped, name/SKU snapshots      │
//! │  4. lock all rows         sorted variant order, bounded wait ⇒ Busy    │
//! │  5. BEGIN                                                               │
//! │  6. sufficiency pass      every line checked before anything writes;   │
//! │                           first shortfall aborts the whole sale        │
//! │  7. write pass            display number ─► header ─► items ─►         │
//! │                           deductions ─► sale movements                 │
//! │  8. COMMIT, release locks                                               │
//! │                                                                         │
//! │  A sale is never partially applied: a failure at any step leaves       │
//! │  every quantity and both ledgers exactly as they were.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Discipline
//! All amounts are integer centavos. Line total = unit price × quantity,
//! subtotal = Σ line totals, gross profit = subtotal − total cost. Integer
//! arithmetic end to end means the aggregates always reconcile exactly
//! against the stored lines.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::locks::StockLockManager;
use crate::pool::Database;
use tindahan_core::validation::{
    validate_customer_note, validate_price_centavos, validate_quantity,
};
use tindahan_core::{
    CoreError, CoreResult, InventoryRecord, ItemVariant, MovementKind, PaymentMethod,
    ReferenceKind, SaleTransaction, StockMovement, TransactionItem, ValidationError,
};

// =============================================================================
// Request / Outcome
// =============================================================================

/// One cart line as rung up at the register.
///
/// Price and cost come from the cart (the register may discount below the
/// catalog price); the variant's name and SKU are snapshotted from the
/// catalog at commit time.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub variant_id: String,
    /// Units sold (> 0).
    pub quantity: i64,
    /// Price charged per unit, centavos (≥ 0; zero means a freebie).
    pub unit_price_centavos: i64,
    /// Cost basis per unit, centavos (≥ 0).
    pub unit_cost_centavos: i64,
}

/// A complete sale to process atomically.
#[derive(Debug, Clone)]
pub struct ProcessSaleRequest {
    pub organization_id: String,
    pub branch_id: String,
    /// Cashier completing the sale.
    pub actor_id: String,
    pub payment_method: PaymentMethod,
    pub customer_note: Option<String>,
    pub items: Vec<SaleLine>,
}

/// Result of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSaleOutcome {
    pub transaction_id: String,
    /// Human-facing receipt number, e.g. `2026-000042`.
    pub display_number: String,
    pub subtotal_centavos: i64,
    pub total_cost_centavos: i64,
    pub gross_profit_centavos: i64,
}

// =============================================================================
// Processor
// =============================================================================

/// Processes sales as atomic, audited units of work.
#[derive(Debug, Clone)]
pub struct SaleProcessor {
    db: Database,
    locks: Arc<StockLockManager>,
}

impl SaleProcessor {
    /// Creates a processor sharing the given lock manager with the
    /// adjustment engine.
    pub fn new(db: Database, locks: Arc<StockLockManager>) -> Self {
        SaleProcessor { db, locks }
    }

    /// Processes one sale.
    ///
    /// ## Errors
    /// * `Validation` - empty cart, bad quantity/price, duplicate variant,
    ///   oversized note; nothing was locked
    /// * `Unauthorized` / `BranchNotFound` / `VariantNotFound` /
    ///   `ActorNotFound` - tenant scope failures, checked before locking
    /// * `InsufficientStock` - some line exceeds available stock; no line
    ///   of the sale was applied
    /// * `Busy` - a row lock wait timed out; retry the whole sale
    pub async fn process_sale(&self, request: ProcessSaleRequest) -> CoreResult<ProcessSaleOutcome> {
        self.validate_shape(&request)?;

        // Tenant scope, lock-free.
        let tenants = self.db.tenants();
        tenants
            .require_active_organization(&request.organization_id)
            .await?;
        tenants
            .require_branch(&request.organization_id, &request.branch_id)
            .await?;
        tenants
            .require_actor(&request.organization_id, &request.actor_id)
            .await?;

        // Canonical processing order: ascending variant id. Lock acquisition
        // and both write passes all walk the cart in this order.
        let mut lines = request.items.clone();
        lines.sort_by(|a, b| a.variant_id.cmp(&b.variant_id));

        // Line amounts and aggregates in integer centavos, overflow-checked
        // before any lock is taken. Quantity is bounded by validation but
        // prices are only bounded below, so the products and running sums
        // need explicit checks.
        let mut line_amounts: Vec<(i64, i64)> = Vec::with_capacity(lines.len());
        let mut subtotal = 0i64;
        let mut total_cost = 0i64;
        for line in &lines {
            let line_total =
                checked_amount("line_total_centavos", line.unit_price_centavos, line.quantity)?;
            let line_cost =
                checked_amount("line_cost_centavos", line.unit_cost_centavos, line.quantity)?;
            subtotal = checked_sum("subtotal_centavos", subtotal, line_total)?;
            total_cost = checked_sum("total_cost_centavos", total_cost, line_cost)?;
            line_amounts.push((line_total, line_cost));
        }
        // Both aggregates are in [0, i64::MAX], so the difference cannot wrap.
        let gross_profit = subtotal - total_cost;

        let mut variants: Vec<ItemVariant> = Vec::with_capacity(lines.len());
        for line in &lines {
            let variant = tenants
                .require_variant(&request.organization_id, &line.variant_id)
                .await?;
            variants.push(variant);
        }

        let variant_ids: Vec<String> = lines.iter().map(|l| l.variant_id.clone()).collect();
        let guards = self.locks.acquire(&request.branch_id, &variant_ids).await?;

        let inventory = self.db.inventory();
        let transactions = self.db.transactions();
        let movements = self.db.movements();
        let mut tx = self.db.pool().begin().await.map_err(crate::DbError::from)?;

        // Sufficiency pass: every line is checked before anything is written,
        // so the first shortfall aborts with no cleanup needed.
        let mut records: Vec<InventoryRecord> = Vec::with_capacity(lines.len());
        for line in &lines {
            let record = inventory
                .get_for_update(
                    &mut tx,
                    &request.organization_id,
                    &request.branch_id,
                    &line.variant_id,
                )
                .await?;

            if record.quantity < line.quantity {
                debug!(
                    variant_id = %line.variant_id,
                    available = record.quantity,
                    requested = line.quantity,
                    "sale refused: insufficient stock"
                );
                return Err(CoreError::InsufficientStock {
                    variant_id: line.variant_id.clone(),
                    available: record.quantity,
                    requested: line.quantity,
                });
            }
            records.push(record);
        }

        let now = Utc::now();
        let display_number = transactions
            .next_display_number(&mut tx, &request.organization_id, now.year())
            .await?;

        let header = SaleTransaction {
            id: Uuid::new_v4().to_string(),
            organization_id: request.organization_id.clone(),
            branch_id: request.branch_id.clone(),
            actor_id: request.actor_id.clone(),
            display_number: display_number.clone(),
            subtotal_centavos: subtotal,
            total_cost_centavos: total_cost,
            gross_profit_centavos: gross_profit,
            payment_method: request.payment_method,
            customer_note: request.customer_note.clone(),
            created_at: now,
        };
        transactions.insert_transaction(&mut tx, &header).await?;

        for (((line, variant), record), &(line_total, line_cost)) in
            lines.iter().zip(&variants).zip(&records).zip(&line_amounts)
        {
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: header.id.clone(),
                variant_id: line.variant_id.clone(),
                name_snapshot: variant.name.clone(),
                sku_snapshot: variant.sku.clone(),
                unit_price_centavos: line.unit_price_centavos,
                unit_cost_centavos: line.unit_cost_centavos,
                quantity: line.quantity,
                line_total_centavos: line_total,
                line_cost_centavos: line_cost,
                line_profit_centavos: line_total - line_cost,
                created_at: now,
            };
            transactions.insert_item(&mut tx, &item).await?;

            let after = record.quantity - line.quantity;
            inventory.set_quantity(&mut tx, &record.id, after).await?;

            let movement = StockMovement {
                id: Uuid::new_v4().to_string(),
                organization_id: request.organization_id.clone(),
                branch_id: request.branch_id.clone(),
                variant_id: line.variant_id.clone(),
                kind: MovementKind::Sale,
                quantity_delta: -line.quantity,
                quantity_before: record.quantity,
                quantity_after: after,
                actor_id: Some(request.actor_id.clone()),
                reference_kind: Some(ReferenceKind::SaleTransaction),
                reference_id: Some(header.id.clone()),
                reason: format!("sale {display_number}"),
                created_at: now,
            };
            movements.append(&mut tx, &movement).await?;
        }

        tx.commit().await.map_err(crate::DbError::from)?;
        drop(guards);

        info!(
            transaction_id = %header.id,
            %display_number,
            lines = lines.len(),
            subtotal_centavos = subtotal,
            "sale committed"
        );

        Ok(ProcessSaleOutcome {
            transaction_id: header.id,
            display_number,
            subtotal_centavos: subtotal,
            total_cost_centavos: total_cost,
            gross_profit_centavos: gross_profit,
        })
    }

    /// Shape checks. Runs before any lock or database read.
    fn validate_shape(&self, request: &ProcessSaleRequest) -> CoreResult<()> {
        if request.items.is_empty() {
            return Err(ValidationError::EmptyItems.into());
        }
        validate_customer_note(request.customer_note.as_deref())?;

        let mut seen = HashSet::with_capacity(request.items.len());
        for line in &request.items {
            validate_quantity(line.quantity)?;
            validate_price_centavos("unit_price_centavos", line.unit_price_centavos)?;
            validate_price_centavos("unit_cost_centavos", line.unit_cost_centavos)?;

            if !seen.insert(line.variant_id.as_str()) {
                return Err(ValidationError::DuplicateVariant {
                    variant_id: line.variant_id.clone(),
                }
                .into());
            }
        }

        Ok(())
    }
}

// =============================================================================
// Checked Centavo Arithmetic
// =============================================================================

fn checked_amount(field: &'static str, unit_centavos: i64, quantity: i64) -> CoreResult<i64> {
    unit_centavos
        .checked_mul(quantity)
        .ok_or_else(|| centavo_overflow(field))
}

fn checked_sum(field: &'static str, acc: i64, amount: i64) -> CoreResult<i64> {
    acc.checked_add(amount).ok_or_else(|| centavo_overflow(field))
}

fn centavo_overflow(field: &'static str) -> CoreError {
    ValidationError::OutOfRange {
        field,
        min: 0,
        max: i64::MAX,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::movement::MovementFilter;

    struct Fixture {
        db: Database,
        processor: SaleProcessor,
        org: String,
        branch: String,
        actor: String,
        /// Variant ids, each stocked at 10.
        soap: String,
        oil: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let locks = Arc::new(StockLockManager::with_default_timeout());
        let processor = SaleProcessor::new(db.clone(), locks.clone());

        let org = db.tenants().create_organization("Shop").await.unwrap();
        let branch = db
            .tenants()
            .create_branch(&org.id, "Main", true)
            .await
            .unwrap();
        let actor = db.tenants().create_staff(&org.id, "Aling Nena").await.unwrap();

        let soap = db
            .tenants()
            .create_variant(&org.id, "Soap Bar", "SOAP-01", 1500, 900)
            .await
            .unwrap();
        let oil = db
            .tenants()
            .create_variant(&org.id, "Cooking Oil 1L", "OIL-1L", 8500, 7000)
            .await
            .unwrap();

        let adjuster = crate::engine::StockAdjustmentEngine::new(db.clone(), locks);
        for variant in [&soap.id, &oil.id] {
            db.inventory().create(&org.id, &branch.id, variant).await.unwrap();
            adjuster
                .adjust(crate::engine::AdjustStockRequest {
                    organization_id: org.id.clone(),
                    branch_id: branch.id.clone(),
                    variant_id: variant.clone(),
                    kind: crate::engine::AdjustmentKind::StockIn,
                    quantity: 10,
                    reason: "opening stock".to_string(),
                    actor_id: None,
                })
                .await
                .unwrap();
        }

        Fixture {
            db,
            processor,
            org: org.id,
            branch: branch.id,
            actor: actor.id,
            soap: soap.id,
            oil: oil.id,
        }
    }

    fn request(f: &Fixture, items: Vec<SaleLine>) -> ProcessSaleRequest {
        ProcessSaleRequest {
            organization_id: f.org.clone(),
            branch_id: f.branch.clone(),
            actor_id: f.actor.clone(),
            payment_method: PaymentMethod::Cash,
            customer_note: None,
            items,
        }
    }

    fn line(variant: &str, quantity: i64, price: i64, cost: i64) -> SaleLine {
        SaleLine {
            variant_id: variant.to_string(),
            quantity,
            unit_price_centavos: price,
            unit_cost_centavos: cost,
        }
    }

    #[tokio::test]
    async fn test_multi_line_sale_commits_everything() {
        let f = fixture().await;

        let outcome = f
            .processor
            .process_sale(request(
                &f,
                vec![line(&f.soap, 2, 1500, 900), line(&f.oil, 1, 8500, 7000)],
            ))
            .await
            .unwrap();

        assert_eq!(outcome.subtotal_centavos, 2 * 1500 + 8500);
        assert_eq!(outcome.total_cost_centavos, 2 * 900 + 7000);
        assert_eq!(
            outcome.gross_profit_centavos,
            outcome.subtotal_centavos - outcome.total_cost_centavos
        );
        assert_eq!(outcome.display_number, format!("{}-000001", Utc::now().year()));

        // Quantities deducted.
        let soap = f.db.inventory().get(&f.branch, &f.soap).await.unwrap().unwrap();
        let oil = f.db.inventory().get(&f.branch, &f.oil).await.unwrap().unwrap();
        assert_eq!(soap.quantity, 8);
        assert_eq!(oil.quantity, 9);

        // Header + items persisted with snapshots.
        let header = f
            .db
            .transactions()
            .get_by_id(&f.org, &outcome.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header.subtotal_centavos, outcome.subtotal_centavos);

        let items = f.db.transactions().items(&outcome.transaction_id).await.unwrap();
        assert_eq!(items.len(), 2);
        let line_sum: i64 = items.iter().map(|i| i.line_total_centavos).sum();
        assert_eq!(line_sum, header.subtotal_centavos);
        assert!(items.iter().any(|i| i.sku_snapshot == "SOAP-01"));

        // One sale movement per line, referencing the transaction.
        let count = f
            .db
            .movements()
            .count_for_reference(&outcome.transaction_id)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_insufficient_line_aborts_whole_sale() {
        let f = fixture().await;

        // First line is satisfiable; second asks for more than stocked.
        let err = f
            .processor
            .process_sale(request(
                &f,
                vec![line(&f.oil, 1, 8500, 7000), line(&f.soap, 11, 1500, 900)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            }
        ));

        // Neither line was applied.
        let soap = f.db.inventory().get(&f.branch, &f.soap).await.unwrap().unwrap();
        let oil = f.db.inventory().get(&f.branch, &f.oil).await.unwrap().unwrap();
        assert_eq!(soap.quantity, 10);
        assert_eq!(oil.quantity, 10);

        // No header, no sale movements.
        let sales = f
            .db
            .movements()
            .history(
                &f.org,
                &MovementFilter {
                    kind: Some(MovementKind::Sale),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(sales.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_line_total_rejected() {
        let f = fixture().await;

        // qty 2 at i64::MAX per unit cannot be represented in centavos;
        // the sale is refused before anything is locked or written.
        let err = f
            .processor
            .process_sale(request(&f, vec![line(&f.soap, 2, i64::MAX, 900)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));

        let record = f.db.inventory().get(&f.branch, &f.soap).await.unwrap().unwrap();
        assert_eq!(record.quantity, 10);
    }

    #[tokio::test]
    async fn test_oversized_subtotal_rejected() {
        let f = fixture().await;

        // Each line total fits in i64 but their sum does not.
        let huge = i64::MAX / 2 + 1;
        let err = f
            .processor
            .process_sale(request(
                &f,
                vec![line(&f.soap, 1, huge, 0), line(&f.oil, 1, huge, 0)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let f = fixture().await;
        let err = f.processor.process_sale(request(&f, vec![])).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyItems)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_variant_rejected() {
        let f = fixture().await;
        let err = f
            .processor
            .process_sale(request(
                &f,
                vec![line(&f.soap, 1, 1500, 900), line(&f.soap, 2, 1500, 900)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::DuplicateVariant { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_variant_rejected_before_locking() {
        let f = fixture().await;
        let err = f
            .processor
            .process_sale(request(&f, vec![line("no-such-variant", 1, 100, 50)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::VariantNotFound(_)));
    }

    #[tokio::test]
    async fn test_cross_tenant_actor_rejected() {
        let f = fixture().await;
        let other = f.db.tenants().create_organization("Other").await.unwrap();
        let outsider = f
            .db
            .tenants()
            .create_staff(&other.id, "Outsider")
            .await
            .unwrap();

        let mut req = request(&f, vec![line(&f.soap, 1, 1500, 900)]);
        req.actor_id = outsider.id;

        let err = f.processor.process_sale(req).await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_display_numbers_increment_across_sales() {
        let f = fixture().await;
        let year = Utc::now().year();

        let first = f
            .processor
            .process_sale(request(&f, vec![line(&f.soap, 1, 1500, 900)]))
            .await
            .unwrap();
        let second = f
            .processor
            .process_sale(request(&f, vec![line(&f.soap, 1, 1500, 900)]))
            .await
            .unwrap();

        assert_eq!(first.display_number, format!("{year}-000001"));
        assert_eq!(second.display_number, format!("{year}-000002"));
    }

    #[tokio::test]
    async fn test_ledger_replays_to_live_quantity_after_mixed_traffic() {
        let f = fixture().await;

        f.processor
            .process_sale(request(&f, vec![line(&f.soap, 3, 1500, 900)]))
            .await
            .unwrap();
        f.processor
            .process_sale(request(&f, vec![line(&f.soap, 2, 1400, 900)]))
            .await
            .unwrap();

        let replay = f
            .db
            .movements()
            .replay_quantity(&f.org, &f.branch, &f.soap)
            .await
            .unwrap();
        let record = f.db.inventory().get(&f.branch, &f.soap).await.unwrap().unwrap();

        assert!(replay.chain_intact);
        assert_eq!(replay.final_quantity, record.quantity);
        assert_eq!(record.quantity, 5);
        // opening stock-in + two sales
        assert_eq!(replay.movement_count, 3);
    }

    #[tokio::test]
    async fn test_concurrent_sales_on_same_variant_serialize() {
        let f = fixture().await;

        let a = {
            let p = f.processor.clone();
            let req = request(&f, vec![line(&f.soap, 4, 1500, 900)]);
            tokio::spawn(async move { p.process_sale(req).await })
        };
        let b = {
            let p = f.processor.clone();
            let req = request(&f, vec![line(&f.soap, 4, 1500, 900)]);
            tokio::spawn(async move { p.process_sale(req).await })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let record = f.db.inventory().get(&f.branch, &f.soap).await.unwrap().unwrap();
        assert_eq!(record.quantity, 2);

        let replay = f
            .db
            .movements()
            .replay_quantity(&f.org, &f.branch, &f.soap)
            .await
            .unwrap();
        assert!(replay.chain_intact);
        assert_eq!(replay.final_quantity, 2);
    }
}
