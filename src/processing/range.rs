/// Linearly map `value` from `[actual_lower, actual_upper]` onto
/// `[new_lower, new_upper]`. No clamping; out-of-range values extrapolate.
///
/// The caller guarantees `actual_upper != actual_lower`. Use [`rescale`]
/// when the domain may be degenerate.
pub fn convert_range(
    actual_lower: f64,
    actual_upper: f64,
    new_lower: f64,
    new_upper: f64,
    value: f64,
) -> f64 {
    new_lower + (value - actual_lower) * (new_upper - new_lower) / (actual_upper - actual_lower)
}

/// [`convert_range`] with a guard for a zero-width domain: every value of
/// a single-valued domain maps to the centre of the target range.
pub fn rescale(actual_lower: f64, actual_upper: f64, new_lower: f64, new_upper: f64, value: f64) -> f64 {
    if actual_upper == actual_lower {
        return (new_lower + new_upper) * 0.5;
    }
    convert_range(actual_lower, actual_upper, new_lower, new_upper, value)
}

/// Round half to even at `decimals` places, the rounding used for all
/// bucket boundaries and cell statistics.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_endpoints_and_midpoint() {
        assert_eq!(convert_range(0.0, 10.0, -50.0, 50.0, 0.0), -50.0);
        assert_eq!(convert_range(0.0, 10.0, -50.0, 50.0, 10.0), 50.0);
        assert_eq!(convert_range(0.0, 10.0, -50.0, 50.0, 5.0), 0.0);
    }

    #[test]
    fn extrapolates_outside_the_domain() {
        assert_eq!(convert_range(0.0, 10.0, 0.0, 100.0, 20.0), 200.0);
        assert_eq!(convert_range(0.0, 10.0, 0.0, 100.0, -1.0), -10.0);
    }

    #[test]
    fn inverse_mapping_returns_the_input() {
        for &x in &[-3.25, 0.0, 1.5, 812.0, 6543.21] {
            let there = convert_range(-10.0, 7000.0, -50.0, 50.0, x);
            let back = convert_range(-50.0, 50.0, -10.0, 7000.0, there);
            assert!((back - x).abs() < 1e-9, "{x} -> {there} -> {back}");
        }
    }

    #[test]
    fn degenerate_domain_maps_to_centre() {
        assert_eq!(rescale(4.0, 4.0, -50.0, 50.0, 4.0), 0.0);
        assert_eq!(rescale(4.0, 4.0, 0.0, 10.0, 4.0), 5.0);
        assert_eq!(rescale(0.0, 2.0, -50.0, 50.0, 2.0), 50.0);
    }

    #[test]
    fn rounding_is_half_even() {
        assert_eq!(round_to(2.5, 0), 2.0);
        assert_eq!(round_to(3.5, 0), 4.0);
        assert_eq!(round_to(1.25, 1), 1.2);
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(-1.018, 2), -1.02);
    }
}
