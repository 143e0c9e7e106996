//! Small numeric helpers

/// Round `x` to `ndigits` significant digits
pub fn round_sig(x: f64, ndigits: i32) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    let decimals = ndigits - 1 - x.abs().log10().floor() as i32;
    round_decimals(x, decimals)
}

/// Round `x` to `decimals` places after the point; negative values round to
/// tens, hundreds, ...
fn round_decimals(x: f64, decimals: i32) -> f64 {
    if decimals >= 0 {
        let scale = 10f64.powi(decimals);
        (x * scale).round() / scale
    } else {
        let scale = 10f64.powi(-decimals);
        (x / scale).round() * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_sig() {
        assert_eq!(round_sig(0.0, 3), 0.0);
        assert_eq!(round_sig(123_456.0, 2), 120_000.0);
        assert_eq!(round_sig(-123_456.0, 3), -123_000.0);
        assert_eq!(round_sig(0.012_345, 2), 0.012);
        assert_eq!(round_sig(9.87, 1), 10.0);
        assert_eq!(round_sig(1.0, 5), 1.0);
    }

    #[test]
    fn test_round_sig_non_finite() {
        assert!(round_sig(f64::NAN, 2).is_nan());
        assert_eq!(round_sig(f64::INFINITY, 2), f64::INFINITY);
    }
}
