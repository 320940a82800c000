//! Seeds a demo database: one organization, two branches, a small catalog,
//! opening stock, and one example sale.
//!
//! ## Usage
//! ```text
//! cargo run --bin seed -- [path/to/tindahan.db]
//! ```
//! Defaults to `tindahan.db` in the current directory. Safe to point at a
//! fresh file only; seeding an existing database will collide on SKUs.

use std::sync::Arc;

use tindahan_db::{
    AdjustStockRequest, AdjustmentKind, Database, DbConfig, ProcessSaleRequest, SaleLine,
    SaleProcessor, StockAdjustmentEngine, StockLockManager,
};

use tindahan_core::{Money, PaymentMethod};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tindahan.db".to_string());

    println!("Seeding demo data into {path}");

    let db = Database::new(DbConfig::new(&path)).await?;
    let locks = Arc::new(StockLockManager::with_default_timeout());
    let adjuster = StockAdjustmentEngine::new(db.clone(), locks.clone());
    let sales = SaleProcessor::new(db.clone(), locks);

    // Organization + branches
    let org = db.tenants().create_organization("Nena's Sari-Sari").await?;
    println!("  organization: {} ({})", org.name, org.id);

    let main_branch = db.tenants().create_branch(&org.id, "Main Store", true).await?;
    let stall = db.tenants().create_branch(&org.id, "Market Stall", false).await?;
    println!("  branches:     {} (default), {}", main_branch.name, stall.name);

    let cashier = db.tenants().create_staff(&org.id, "Aling Nena").await?;
    println!("  staff:        {}", cashier.name);

    // Catalog: (name, sku, price, cost) in centavos
    let catalog = [
        ("Sinigang Mix 40g", "SNG-40", 1850, 1200),
        ("Cooking Oil 1L", "OIL-1L", 8500, 7000),
        ("Soap Bar", "SOAP-01", 1500, 900),
        ("Instant Coffee Twin Pack", "KFE-2PK", 1200, 800),
    ];

    let mut variant_ids = Vec::new();
    for (name, sku, price, cost) in catalog {
        let variant = db
            .tenants()
            .create_variant(&org.id, name, sku, price, cost)
            .await?;
        println!(
            "  variant:      {} [{}] at {}",
            variant.name,
            variant.sku,
            Money::from_centavos(variant.price_centavos)
        );
        variant_ids.push(variant.id);
    }

    // Opening stock at the main branch, through the engine so the ledger
    // starts intact.
    for variant_id in &variant_ids {
        db.inventory().create(&org.id, &main_branch.id, variant_id).await?;
        adjuster
            .adjust(AdjustStockRequest {
                organization_id: org.id.clone(),
                branch_id: main_branch.id.clone(),
                variant_id: variant_id.clone(),
                kind: AdjustmentKind::StockIn,
                quantity: 24,
                reason: "opening stock".to_string(),
                actor_id: Some(cashier.id.clone()),
            })
            .await?;
    }
    println!("  stocked 24 units of each variant at {}", main_branch.name);

    // One example sale.
    let outcome = sales
        .process_sale(ProcessSaleRequest {
            organization_id: org.id.clone(),
            branch_id: main_branch.id.clone(),
            actor_id: cashier.id.clone(),
            payment_method: PaymentMethod::Cash,
            customer_note: Some("suki discount applied".to_string()),
            items: vec![
                SaleLine {
                    variant_id: variant_ids[0].clone(),
                    quantity: 2,
                    unit_price_centavos: 1850,
                    unit_cost_centavos: 1200,
                },
                SaleLine {
                    variant_id: variant_ids[2].clone(),
                    quantity: 1,
                    unit_price_centavos: 1400,
                    unit_cost_centavos: 900,
                },
            ],
        })
        .await?;
    println!(
        "  sale:         {} for {} (profit {})",
        outcome.display_number,
        Money::from_centavos(outcome.subtotal_centavos),
        Money::from_centavos(outcome.gross_profit_centavos)
    );

    db.close().await;
    println!("Done.");
    Ok(())
}
