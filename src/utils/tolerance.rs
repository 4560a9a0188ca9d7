//! Near-equality comparison for monetary amounts

use bigdecimal::BigDecimal;

/// Relative tolerance for amount comparisons, one part in 10^9.
fn relative_tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(1_000_000_000)
}

/// Whether two amounts are numerically close.
///
/// The difference is measured against the larger magnitude, so the check
/// behaves the same for cent-sized and million-sized amounts. Exact equality
/// (including two zeros) always passes; a zero compared against any non-zero
/// amount never does.
pub fn amounts_close(a: &BigDecimal, b: &BigDecimal) -> bool {
    if a == b {
        return true;
    }
    let difference = (a - b).abs();
    let magnitude = a.abs().max(b.abs());
    difference <= magnitude * relative_tolerance()
}
