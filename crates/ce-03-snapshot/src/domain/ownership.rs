//! Ownership percentages in basis points.
//!
//! `bp = floor(balance * 10_000 / total)`, so a percentage is truncated to
//! two decimals. Rendering pads to four decimals: 7000 bp → `70.0000`.

use primitive_types::U512;
use shared_types::U256;

/// One hundred percent.
pub const FULL_OWNERSHIP_BP: u32 = 10_000;

/// Share of `balance` in `total`, truncated to whole basis points.
///
/// Returns 0 when `total` is zero. `balance` is expected to be `<= total`;
/// larger values are clamped to 100%.
pub fn ownership_bp(balance: U256, total: U256) -> u32 {
    if total.is_zero() {
        return 0;
    }
    let scaled = balance.full_mul(U256::from(FULL_OWNERSHIP_BP)) / U512::from(total);
    if scaled >= U512::from(FULL_OWNERSHIP_BP) {
        FULL_OWNERSHIP_BP
    } else {
        scaled.low_u32()
    }
}

/// Render basis points as a percentage with four decimals.
pub fn format_pct(bp: u32) -> String {
    format!("{}.{:02}00", bp / 100, bp % 100)
}
