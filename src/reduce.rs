//! Lane-blocked reduction: full blocks, one masked tail step, then a
//! horizontal fold.
//!
//! The portable loop here emulates `width` vector lanes with a stack array.
//! The arch kernels in `crate::arch` run the same per-lane arithmetic on
//! real registers, so at a given width both produce identical bits.

use crate::kahan::KahanSum;
use crate::lanes::{LaneWidth, MAX_LANES};

/// One vector register's worth of lanes. Lanes `>= width` stay zero.
pub(crate) type Lanes = [f64; MAX_LANES];

/// Accumulator for the compensated step: per-lane running sum and
/// per-lane accumulated rounding error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct KahanLanes {
    pub sum: Lanes,
    pub comp: Lanes,
}

impl KahanLanes {
    pub(crate) const ZERO: KahanLanes = KahanLanes {
        sum: [0.0; MAX_LANES],
        comp: [0.0; MAX_LANES],
    };
}

/// Per-block combine step.
///
/// `step` receives lane `k` of the block as `a[k]`, `b[k]`. Full blocks have
/// exactly `width` elements; the tail block has fewer, and lanes past its end
/// are left untouched.
pub(crate) trait BlockStep {
    type Acc: Copy;

    fn zero(&self) -> Self::Acc;

    fn step(&self, a: &[f64], b: &[f64], acc: &mut Self::Acc);

    fn finish(&self, acc: &Self::Acc, lanes: LaneWidth) -> f64;
}

/// `acc' = a * b + acc`, fused (single rounding).
#[derive(Debug, Clone, Copy)]
pub(crate) struct FmaStep;

impl BlockStep for FmaStep {
    type Acc = Lanes;

    #[inline(always)]
    fn zero(&self) -> Lanes {
        [0.0; MAX_LANES]
    }

    #[inline(always)]
    fn step(&self, a: &[f64], b: &[f64], acc: &mut Lanes) {
        for ((lane, &x), &y) in acc.iter_mut().zip(a).zip(b) {
            *lane = x.mul_add(y, *lane);
        }
    }

    #[inline]
    fn finish(&self, acc: &Lanes, lanes: LaneWidth) -> f64 {
        horizontal_sum(acc, lanes)
    }
}

/// Compensated update of each lane with the product `a * b`.
///
/// The product is formed on its own ([`KahanSum::add_product`]); folding it
/// into the sum with an FMA would bypass the compensation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct KahanStep;

impl BlockStep for KahanStep {
    type Acc = KahanLanes;

    #[inline(always)]
    fn zero(&self) -> KahanLanes {
        KahanLanes::ZERO
    }

    #[inline(always)]
    fn step(&self, a: &[f64], b: &[f64], acc: &mut KahanLanes) {
        let n = a.len().min(b.len());
        for k in 0..n {
            let lane = KahanSum {
                sum: acc.sum[k],
                comp: acc.comp[k],
            }
            .add_product(a[k], b[k]);
            acc.sum[k] = lane.sum;
            acc.comp[k] = lane.comp;
        }
    }

    #[inline]
    fn finish(&self, acc: &KahanLanes, lanes: LaneWidth) -> f64 {
        horizontal_sum_compensated(acc, lanes)
    }
}

/// Fold the lane-aligned prefix of `a[..len]` and `b[..len]`.
///
/// Returns the first index not consumed (`len - len % width`) and the
/// updated accumulator.
#[inline]
pub(crate) fn reduce_blocks<S: BlockStep>(
    step: &S,
    lanes: LaneWidth,
    a: &[f64],
    b: &[f64],
    len: usize,
    mut acc: S::Acc,
) -> (usize, S::Acc) {
    let w = lanes.get();
    let limit = len - len % w;

    for (ca, cb) in a[..limit].chunks_exact(w).zip(b[..limit].chunks_exact(w)) {
        step.step(ca, cb, &mut acc);
    }

    (limit, acc)
}

/// One masked step over `[next, len)`, fewer than `width` elements.
///
/// Only in-range elements are read; the remaining lanes keep their value.
#[inline]
pub(crate) fn reduce_tail<S: BlockStep>(
    step: &S,
    a: &[f64],
    b: &[f64],
    next: usize,
    len: usize,
    mut acc: S::Acc,
) -> S::Acc {
    if next >= len {
        return acc;
    }
    step.step(&a[next..len], &b[next..len], &mut acc);
    acc
}

/// Sequential sum of lanes `0..width`.
#[inline]
pub(crate) fn horizontal_sum(acc: &Lanes, lanes: LaneWidth) -> f64 {
    let lanes = &acc[..lanes.get()];
    let mut s = lanes[0];
    for &x in &lanes[1..] {
        s += x;
    }
    s
}

/// Compensated fold across lanes.
///
/// Lane `k` stands for `sum[k] + comp[k]`. Both parts go through a scalar
/// [`KahanSum`], so rounding lost between lanes is compensated too.
#[inline]
pub(crate) fn horizontal_sum_compensated(acc: &KahanLanes, lanes: LaneWidth) -> f64 {
    let w = lanes.get();
    let mut total = KahanSum::ZERO;
    for k in 0..w {
        total = total.add(acc.sum[k]);
        // a lane that hit an infinity carries NaN corrections
        if acc.sum[k].is_finite() {
            total = total.add(acc.comp[k]);
        }
    }
    total.total()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn width(n: usize) -> LaneWidth {
        LaneWidth::new(n).unwrap()
    }

    fn reduce<S: BlockStep>(step: &S, lanes: LaneWidth, a: &[f64], b: &[f64], len: usize) -> f64 {
        let (next, acc) = reduce_blocks(step, lanes, a, b, len, step.zero());
        let acc = reduce_tail(step, a, b, next, len, acc);
        step.finish(&acc, lanes)
    }

    #[test]
    fn test_blocks_stop_at_aligned_prefix() {
        let a: Vec<f64> = (1..=10).map(f64::from).collect();
        let ones = vec![1.0; 10];

        let (next, acc) = reduce_blocks(&FmaStep, width(4), &a, &ones, 10, FmaStep.zero());
        assert_eq!(next, 8);
        // lane k holds a[k] + a[k + 4]
        assert_eq!(&acc[..4], &[6.0, 8.0, 10.0, 12.0]);
        assert!(acc[4..].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_tail_masks_unused_lanes() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN];
        let ones = [1.0; 6];

        // Only a[4] is in range; the NaN past `len` must never be read.
        let acc = reduce_tail(&FmaStep, &a, &ones, 4, 5, [0.5; MAX_LANES]);
        assert_eq!(acc[0], 5.5);
        assert!(acc[1..].iter().all(|&x| x == 0.5));
    }

    #[test]
    fn test_tail_noop_when_aligned() {
        let a = [1.0; 4];
        let acc = reduce_tail(&FmaStep, &a, &a, 4, 4, [7.0; MAX_LANES]);
        assert_eq!(acc, [7.0; MAX_LANES]);
    }

    #[test]
    fn test_horizontal_sum_ignores_lanes_past_width() {
        let mut acc = [0.0; MAX_LANES];
        acc[0] = 1.0;
        acc[1] = 2.0;
        acc[2] = 100.0;
        assert_eq!(horizontal_sum(&acc, width(2)), 3.0);
        assert_eq!(horizontal_sum(&acc, width(3)), 103.0);
    }

    #[test]
    fn test_horizontal_compensated_keeps_cross_lane_error() {
        // Lane 0 holds a large value, lanes 1..4 hold values each below
        // half an ulp of it. A plain fold drops them all.
        let mut acc = KahanLanes::ZERO;
        acc.sum[0] = 1.0;
        for k in 1..4 {
            acc.sum[k] = 1e-16;
        }
        let plain = horizontal_sum(&acc.sum, width(4));
        let compensated = horizontal_sum_compensated(&acc, width(4));

        assert_eq!(plain, 1.0);
        assert!(compensated > 1.0);
    }

    #[test]
    fn test_horizontal_compensated_adds_lane_corrections() {
        let mut acc = KahanLanes::ZERO;
        acc.sum[0] = 1.0;
        acc.comp[0] = 0.5;
        acc.sum[1] = 2.0;
        acc.comp[1] = -0.25;

        // (1 + 0.5) + (2 - 0.25); subtracting the corrections would give 2.75
        assert_eq!(horizontal_sum_compensated(&acc, width(2)), 3.25);
        // lane 1 ignored at width 1
        assert_eq!(horizontal_sum_compensated(&acc, width(1)), 1.5);
    }

    #[test]
    fn test_horizontal_compensated_infinite_lane() {
        let mut acc = KahanLanes::ZERO;
        acc.sum[0] = 1.0;
        acc.sum[1] = f64::INFINITY;
        acc.comp[1] = f64::NAN;
        assert_eq!(horizontal_sum_compensated(&acc, width(2)), f64::INFINITY);

        acc.sum[2] = f64::NEG_INFINITY;
        assert!(horizontal_sum_compensated(&acc, width(3)).is_nan());
    }

    #[test]
    fn test_lane_corrections_reach_the_result() {
        // Every 2^-53 term ties back to 1.0 in lane 0 and survives only in comp.
        let half_ulp = f64::EPSILON / 2.0;
        let a = [1.0, half_ulp, half_ulp, half_ulp];
        let ones = [1.0; 4];

        let (next, acc) = reduce_blocks(&KahanStep, width(1), &a, &ones, 4, KahanStep.zero());
        assert_eq!(next, 4);
        assert_eq!(acc.sum[0], 1.0);
        assert_eq!(acc.comp[0], 3.0 * half_ulp);
        // 1 + 1.5 ulp rounds to 1 + 2 ulp
        assert_eq!(KahanStep.finish(&acc, width(1)), 1.0 + 2.0 * f64::EPSILON);
        assert_eq!(reduce(&FmaStep, width(1), &a, &ones, 4), 1.0);
    }

    #[test]
    fn test_reduce_same_result_any_width_on_integers() {
        let a: Vec<f64> = (0..37).map(|i| f64::from(i % 7) - 3.0).collect();
        let b: Vec<f64> = (0..37).map(|i| f64::from(i % 5)).collect();
        let expected: f64 = a.iter().zip(&b).map(|(x, y)| x * y).sum();

        for w in 1..=MAX_LANES {
            assert_eq!(reduce(&FmaStep, width(w), &a, &b, 37), expected, "width {w}");
            assert_eq!(reduce(&KahanStep, width(w), &a, &b, 37), expected, "width {w}");
        }
    }
}
