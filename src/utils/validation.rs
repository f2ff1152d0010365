//! Centralized validation and helper functions.

/// Maximum number of contigs allowed in a single file (DOS protection)
pub const MAX_CONTIGS: usize = 100_000;

/// Check if adding another contig would exceed the maximum allowed.
///
/// Call this with the current count BEFORE adding a new contig.
/// Returns an error message if adding would exceed the limit, None if safe to add.
///
/// # Example
/// ```ignore
/// if check_contig_limit(contigs.len()).is_some() {
///     return Err(...);
/// }
/// contigs.push(new_contig); // Safe to add
/// ```
#[must_use]
pub fn check_contig_limit(count: usize) -> Option<String> {
    if count >= MAX_CONTIGS {
        Some(format!(
            "Too many contigs: adding another would exceed maximum of {MAX_CONTIGS}"
        ))
    } else {
        None
    }
}

/// Validation error types for user-supplied settings
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{name} must be in [0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be greater than zero")]
    NotPositive { name: &'static str },
}

/// Validate that `value` is a fraction in `[0, 1]`.
///
/// # Errors
///
/// Returns `ValidationError::FractionOutOfRange` for values outside `[0, 1]` or NaN.
pub fn validate_fraction(name: &'static str, value: f64) -> Result<f64, ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ValidationError::FractionOutOfRange { name, value })
    }
}

/// Validate that a size or count is non-zero.
///
/// # Errors
///
/// Returns `ValidationError::NotPositive` when `value` is zero.
pub fn validate_positive(name: &'static str, value: u64) -> Result<u64, ValidationError> {
    if value == 0 {
        Err(ValidationError::NotPositive { name })
    } else {
        Ok(value)
    }
}

/// A, C, G or T (upper case).
///
/// # Examples
///
/// ```
/// use candidate_regions::utils::validation::is_canonical_base;
///
/// assert!(is_canonical_base(b'A'));
/// assert!(!is_canonical_base(b'N'));
/// assert!(!is_canonical_base(b'a'));
/// ```
#[must_use]
pub fn is_canonical_base(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T')
}

/// Every base is canonical. False for an empty slice.
#[must_use]
pub fn are_canonical_bases(bases: &[u8]) -> bool {
    !bases.is_empty() && bases.iter().copied().all(is_canonical_base)
}

/// Convert a count to f64 with explicit precision loss allowance
#[inline]
#[must_use]
pub fn count_to_f64(count: u64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}
