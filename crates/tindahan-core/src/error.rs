//! # Error Types
//!
//! Domain-specific error taxonomy for tindahan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tindahan-core errors (this file)                                       │
//! │  ├── CoreError        - The public taxonomy callers match on           │
//! │  └── ValidationError  - Input validation failures (shape checks)       │
//! │                                                                         │
//! │  tindahan-db errors (separate crate)                                    │
//! │  └── DbError          - Storage faults; folded into CoreError::Internal│
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← DbError                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (variant id, quantities)
//! 3. Errors are enum variants, never String
//! 4. `InsufficientStock` carries available vs requested so the caller can
//!    adjust the request; `Busy` and `Internal` are safe to retry whole

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// The error taxonomy surfaced by the adjustment engine, the sale processor,
/// and the tenant-scoped repositories.
///
/// Any error raised during the locked phase of a unit of work discards the
/// entire unit - there is never a partial commit to compensate for.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Cross-tenant access attempt: the target row exists but belongs to a
    /// different organization. Short-circuits before any lock is taken.
    #[error("organization {organization_id} does not own {entity} {id}")]
    Unauthorized {
        organization_id: String,
        entity: &'static str,
        id: String,
    },

    /// Referenced branch missing, deleted, or out of tenant scope.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// Referenced item variant missing, deleted, or never stocked at the
    /// target branch.
    #[error("item variant not found: {0}")]
    VariantNotFound(String),

    /// Referenced actor does not belong to the organization.
    #[error("actor not found: {0}")]
    ActorNotFound(String),

    /// The operation would drive a quantity negative.
    ///
    /// ## User Workflow
    /// ```text
    /// processSale (qty: 5)
    ///      │
    ///      ▼
    /// locked read: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { variant_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 left in stock" - nothing was deducted
    /// ```
    #[error("insufficient stock for variant {variant_id}: available {available}, requested {requested}")]
    InsufficientStock {
        variant_id: String,
        available: i64,
        requested: i64,
    },

    /// A needed row lock could not be acquired within the bounded wait.
    /// Retryable: nothing was written. Callers retry the whole operation,
    /// never a subset of its items.
    #[error("stock row for variant {variant_id} is busy, retry the operation")]
    Busy { variant_id: String },

    /// A store-level invariant re-check failed. This must never be reachable
    /// through the engines, which validate before writing.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Storage or infrastructure fault. Retryable: the enclosing unit of
    /// work was discarded, nothing partial was committed.
    #[error("internal failure: {0}")]
    Internal(String),

    /// Malformed input (wraps ValidationError).
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an Unauthorized error for a given entity type and id.
    pub fn unauthorized(
        organization_id: impl Into<String>,
        entity: &'static str,
        id: impl Into<String>,
    ) -> Self {
        CoreError::Unauthorized {
            organization_id: organization_id.into(),
            entity,
            id: id.into(),
        }
    }

    /// Whether retrying the whole operation from scratch can succeed without
    /// the caller changing anything.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Busy { .. } | CoreError::Internal(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Detected before any lock is taken; the unit of work never starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustBeNonNegative { field: &'static str },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// A sale must carry at least one line item.
    #[error("items must not be empty")]
    EmptyItems,

    /// The same variant appears more than once in a sale request.
    #[error("duplicate variant in items: {variant_id}")]
    DuplicateVariant { variant_id: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            variant_id: "v-123".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for variant v-123: available 3, requested 5"
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(CoreError::Busy {
            variant_id: "v".to_string()
        }
        .is_retryable());
        assert!(CoreError::Internal("disk".to_string()).is_retryable());
        assert!(!CoreError::BranchNotFound("b".to_string()).is_retryable());
        assert!(!CoreError::InsufficientStock {
            variant_id: "v".to_string(),
            available: 0,
            requested: 1
        }
        .is_retryable());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required { field: "reason" };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_unauthorized_message() {
        let err = CoreError::unauthorized("org-a", "branch", "b-1");
        assert_eq!(err.to_string(), "organization org-a does not own branch b-1");
    }
}
