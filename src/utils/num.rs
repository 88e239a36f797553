//! Numeric utilities: safe and centralized conversions.
//!
//! Guidelines
//! - Prefer fallible conversions (returning Option<T>) when a value out of range should stop the operation (e.g., a `$size` operand).
//! - Prefer saturating conversions when best-effort is acceptable and clamping is safer than panicking or truncating (e.g., a time span logged as u64).

/// `Some` only for finite, non-negative, integral values that fit in `usize`.
#[inline]
#[must_use]
pub fn f64_to_usize_exact(v: f64) -> Option<usize> {
    if !v.is_finite() || v < 0.0 || v.fract() != 0.0 || v > 9_007_199_254_740_992.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    usize::try_from(v as u64).ok()
}

#[inline]
#[must_use]
pub fn usize_to_u64(v: usize) -> u64 {
    v as u64
}

#[inline]
#[must_use]
pub fn u128_to_u64_saturating(v: u128) -> u64 {
    if v > u128::from(u64::MAX) { u64::MAX } else { v as u64 }
}
