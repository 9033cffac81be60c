//! Q24.8 fixed-point helpers shared by every renderer computation.
//!
//! A [`Fixed`] holds `real * 256`. Reals enter and leave only at API
//! boundaries (angle setters, motion requests, public getters); inside the
//! renderer everything is integer `+ - * >>` with truncating division.
//! No rounding correction is applied anywhere in the hot path, so results
//! are bit-reproducible rather than mathematically exact.

/// Real value scaled by `2^FRAC_BITS`.
pub type Fixed = i32;

pub const FRAC_BITS: u32 = 8;

/// `1.0`
pub const ONE: Fixed = 1 << FRAC_BITS;

/// `1.0` in Q16, the numerator of every `1 / x` taken on Q8 values.
pub const ONE_SQ: Fixed = 1 << (2 * FRAC_BITS);

/// `real * 256`, truncated toward zero.
#[inline]
pub fn to_fixed(v: f32) -> Fixed {
    (v * ONE as f32) as Fixed
}

#[inline]
pub fn from_fixed(v: Fixed) -> f32 {
    v as f32 / ONE as f32
}

/// Q8 × Q8 → Q8 with a 64-bit intermediate.
#[inline]
pub fn mul(a: Fixed, b: Fixed) -> Fixed {
    ((a as i64 * b as i64) >> FRAC_BITS) as Fixed
}

/// Smallest whole number `>= v / 256`.
#[inline]
pub fn ceil_int(v: i64) -> i32 {
    ((v + (ONE as i64 - 1)) >> FRAC_BITS) as i32
}

/// Ceiling division for a positive divisor.
#[inline]
pub fn div_ceil(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0);
    -((-a).div_euclid(b))
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_fixed_truncates_toward_zero() {
        assert_eq!(to_fixed(1.0), 256);
        assert_eq!(to_fixed(-1.5), -384);
        assert_eq!(to_fixed(0.003), 0);
        assert_eq!(to_fixed(-0.003), 0);
        assert_eq!(to_fixed(320.0), 81_920);
    }

    #[test]
    fn ceil_handles_negative_values() {
        assert_eq!(ceil_int(0), 0);
        assert_eq!(ceil_int(1), 1);
        assert_eq!(ceil_int(256), 1);
        assert_eq!(ceil_int(257), 2);
        assert_eq!(ceil_int(-1), 0);
        assert_eq!(ceil_int(-256), -1);
        assert_eq!(ceil_int(-257), -1);
    }

    #[test]
    fn div_ceil_rounds_up() {
        assert_eq!(div_ceil(7, 2), 4);
        assert_eq!(div_ceil(-7, 2), -3);
        assert_eq!(div_ceil(8, 2), 4);
    }

    #[test]
    fn mul_keeps_scale() {
        assert_eq!(mul(to_fixed(1.5), to_fixed(2.0)), to_fixed(3.0));
        assert_eq!(from_fixed(mul(ONE, -ONE)), -1.0);
    }
}
