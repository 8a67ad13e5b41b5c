//! Compensated summation (Kahan-Babuška form).
//!
//! The running state is a `(sum, comp)` pair. Every addition records its
//! exact rounding error (Knuth's TwoSum) in `comp`, so the corrected total
//! is `sum + comp`. Recording the error of the addition itself, rather than
//! folding `comp` into the next term as classic Kahan does, keeps the
//! correction when a term outweighs the running sum, e.g. when large terms
//! of opposite sign cancel.
//!
//! Both the per-lane block step and the cross-lane horizontal fold go
//! through [`KahanSum`], so there is one definition of the update. It uses
//! only additions and subtractions (plus one FMA for the product error),
//! which the arch kernels reproduce lane by lane.

/// Scalar compensated accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KahanSum {
    /// Running sum.
    pub sum: f64,
    /// Accumulated rounding error, added back by [`KahanSum::total`].
    pub comp: f64,
}

impl KahanSum {
    /// Zero state.
    pub const ZERO: KahanSum = KahanSum { sum: 0.0, comp: 0.0 };

    /// Accumulate `x`, returning the new state.
    ///
    /// `t = sum + x; z = t - sum; err = (sum - (t - z)) + (x - z)`, then
    /// `sum' = t` and `comp' = comp + err`. `err` is exact: `t + err == sum + x`.
    #[inline(always)]
    #[must_use]
    pub fn add(self, x: f64) -> KahanSum {
        let t = self.sum + x;
        let z = t - self.sum;
        let err = (self.sum - (t - z)) + (x - z);
        KahanSum {
            sum: t,
            comp: self.comp + err,
        }
    }

    /// Accumulate the product `a * b`.
    ///
    /// The product is rounded on its own and added with [`KahanSum::add`];
    /// its rounding error, recovered with one FMA, goes into `comp`.
    #[inline(always)]
    #[must_use]
    pub fn add_product(self, a: f64, b: f64) -> KahanSum {
        let p = a * b;
        let p_err = a.mul_add(b, -p);
        let next = self.add(p);
        KahanSum {
            sum: next.sum,
            comp: next.comp + p_err,
        }
    }

    /// Corrected total, `sum + comp`.
    ///
    /// A non-finite `sum` is returned as is: once the sum overflows or meets
    /// an infinity the error terms are NaN and carry no information.
    #[inline(always)]
    #[must_use]
    pub fn total(self) -> f64 {
        if self.sum.is_finite() {
            self.sum + self.comp
        } else {
            self.sum
        }
    }
}

/// Compensated sum of a sequence.
///
/// Returns the corrected total ([`KahanSum::total`]), not the raw running
/// sum, so terms below half an ulp of the sum still count.
#[must_use]
pub fn kahan_sum(values: &[f64]) -> f64 {
    values
        .iter()
        .fold(KahanSum::ZERO, |acc, &x| acc.add(x))
        .total()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_on_integers() {
        let v: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(kahan_sum(&v), 5050.0);
    }

    #[test]
    fn test_recovers_small_terms() {
        // 1.0 followed by many terms below half an ulp of 1.0.
        let mut v = vec![1.0];
        v.extend(std::iter::repeat(1e-16).take(10_000));

        let naive: f64 = v.iter().sum();
        let compensated = kahan_sum(&v);
        let exact = 1.0 + 1e-12;

        assert_eq!(naive, 1.0);
        assert!((compensated - exact).abs() < 1e-15);
    }

    #[test]
    fn test_comp_holds_the_lost_part() {
        // 1.0 + 2^-60 rounds back to 1.0; the lost part is kept with its sign.
        let tiny = 2f64.powi(-60);
        let s = KahanSum::ZERO.add(1.0).add(tiny);
        assert_eq!(s.sum, 1.0);
        assert_eq!(s.comp, tiny);

        // Once the big term is gone the correction is exact again.
        let s = s.add(-1.0);
        assert_eq!(s.total(), tiny);
    }

    #[test]
    fn test_survives_cancellation() {
        // Classic Kahan loses the 1e-8 terms here: each -1e8 outweighs the
        // running sum and swallows the pending correction.
        let v: Vec<f64> = (0..4000).map(|i| [1e8, 1e-8, -1e8, 1e-8][i % 4]).collect();
        let exact = 2000.0 * 1e-8;
        assert!((kahan_sum(&v) - exact).abs() <= exact * 1e-12);
    }

    #[test]
    fn test_add_product_keeps_product_error() {
        // (1 + 2^-30)^2 = 1 + 2^-29 + 2^-60; the last term is lost by the
        // rounded product and recovered by the FMA.
        let x = 1.0 + 2f64.powi(-30);
        let s = KahanSum::ZERO.add_product(x, x).add(-1.0).add(-(2f64.powi(-29)));
        assert_eq!(s.total(), 2f64.powi(-60));
    }

    #[test]
    fn test_nan_propagates() {
        assert!(kahan_sum(&[1.0, f64::NAN, 2.0]).is_nan());
    }

    #[test]
    fn test_infinity_propagates() {
        assert_eq!(kahan_sum(&[1.0, f64::INFINITY, 2.0]), f64::INFINITY);
        assert_eq!(kahan_sum(&[f64::MAX, f64::MAX]), f64::INFINITY);
        assert!(kahan_sum(&[f64::INFINITY, f64::NEG_INFINITY]).is_nan());
    }
}
