//! # Validation Module
//!
//! Input validation for the adjustment engine and sale processor.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (shape checks, before any lock is taken)         │
//! │  ├── quantities positive, prices non-negative                          │
//! │  ├── reason present and bounded                                        │
//! │  └── ids well-formed                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engines (tenant scope, stock sufficiency, under the lock)    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (NOT NULL, UNIQUE, FK, CHECK constraints)           │
//! │                                                                         │
//! │  Defense in depth: each layer catches a different class of error       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_CUSTOMER_NOTE_LEN, MAX_LINE_QUANTITY, MAX_REASON_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a stock-movement reason.
///
/// ## Rules
/// - Required, non-empty after trimming
/// - At most 500 characters
///
/// ## Example
/// ```rust
/// use tindahan_core::validation::validate_reason;
///
/// assert!(validate_reason("weekly delivery").is_ok());
/// assert!(validate_reason("").is_err());
/// assert!(validate_reason(&"x".repeat(501)).is_err());
/// ```
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required { field: "reason" });
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason",
            max: MAX_REASON_LEN,
        });
    }

    Ok(())
}

/// Validates an optional customer note on a sale.
pub fn validate_customer_note(note: Option<&str>) -> ValidationResult<()> {
    if let Some(note) = note {
        if note.chars().count() > MAX_CUSTOMER_NOTE_LEN {
            return Err(ValidationError::TooLong {
                field: "customer_note",
                max: MAX_CUSTOMER_NOTE_LEN,
            });
        }
    }
    Ok(())
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Alphanumeric characters, hyphens, underscores only
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required { field: "sku" });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku",
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku",
            reason: "must contain only letters, numbers, hyphens, and underscores",
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a positive quantity (sale line, stock-in/out magnitude).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an absolute target quantity for a correction.
///
/// Unlike [`validate_quantity`], zero is allowed: a count can legitimately
/// come back empty.
pub fn validate_target_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustBeNonNegative { field: "quantity" });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price or unit cost in centavos.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (freebies, promo items)
pub fn validate_price_centavos(field: &'static str, centavos: i64) -> ValidationResult<()> {
    if centavos < 0 {
        return Err(ValidationError::MustBeNonNegative { field });
    }

    Ok(())
}

/// Validates a selling price on a catalog variant.
///
/// Catalog prices must be strictly positive; zero-priced lines on a sale go
/// through [`validate_price_centavos`] instead.
pub fn validate_selling_price(centavos: i64) -> ValidationResult<()> {
    if centavos <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price_centavos",
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tindahan_core::validation::validate_uuid;
///
/// assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("id", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &'static str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be a valid UUID",
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("restock from supplier").is_ok());
        assert!(validate_reason(&"x".repeat(500)).is_ok());

        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_customer_note() {
        assert!(validate_customer_note(None).is_ok());
        assert!(validate_customer_note(Some("paid exact")).is_ok());
        assert!(validate_customer_note(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_target_quantity_allows_zero() {
        assert!(validate_target_quantity(0).is_ok());
        assert!(validate_target_quantity(10).is_ok());
        assert!(validate_target_quantity(-1).is_err());
    }

    #[test]
    fn test_validate_price_centavos() {
        assert!(validate_price_centavos("unit_price", 0).is_ok());
        assert!(validate_price_centavos("unit_price", 1099).is_ok());
        assert!(validate_price_centavos("unit_price", -100).is_err());
    }

    #[test]
    fn test_validate_selling_price_requires_positive() {
        assert!(validate_selling_price(1).is_ok());
        assert!(validate_selling_price(0).is_err());
        assert!(validate_selling_price(-5).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("SNG-40").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("id", "").is_err());
        assert!(validate_uuid("id", "not-a-uuid").is_err());
    }
}
