//! aarch64 block kernels using NEON (2 x f64 per register).
//!
//! NEON is always available on aarch64, so no runtime detection needed.
//! We still use `target_feature` for consistency with x86_64.

use crate::reduce::{KahanLanes, Lanes};

/// NEON fused multiply-add over full 2-lane blocks.
///
/// # Safety
///
/// NEON is mandatory on aarch64; the annotation mirrors the x86_64 kernels.
#[target_feature(enable = "neon")]
pub unsafe fn fma_blocks_neon(a: &[f64], b: &[f64], acc: &mut Lanes) -> usize {
    use std::arch::aarch64::{vfmaq_f64, vld1q_f64, vst1q_f64};

    let n = a.len().min(b.len());
    let limit = n - n % 2;
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum = vld1q_f64(acc.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = vld1q_f64(a_ptr.add(i));
        let vb = vld1q_f64(b_ptr.add(i));
        sum = vfmaq_f64(sum, va, vb);
        i += 2;
    }
    vst1q_f64(acc.as_mut_ptr(), sum);

    limit
}

/// NEON sum of squares over full 2-lane blocks.
///
/// # Safety
///
/// See [`fma_blocks_neon`].
#[target_feature(enable = "neon")]
pub unsafe fn fma_square_blocks_neon(a: &[f64], acc: &mut Lanes) -> usize {
    use std::arch::aarch64::{vfmaq_f64, vld1q_f64, vst1q_f64};

    let n = a.len();
    let limit = n - n % 2;
    let a_ptr = a.as_ptr();

    let mut sum = vld1q_f64(acc.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = vld1q_f64(a_ptr.add(i));
        sum = vfmaq_f64(sum, va, va);
        i += 2;
    }
    vst1q_f64(acc.as_mut_ptr(), sum);

    limit
}

/// NEON compensated products over full 2-lane blocks.
///
/// # Safety
///
/// See [`fma_blocks_neon`].
#[target_feature(enable = "neon")]
pub unsafe fn kahan_blocks_neon(a: &[f64], b: &[f64], acc: &mut KahanLanes) -> usize {
    use std::arch::aarch64::{
        vaddq_f64, vfmaq_f64, vld1q_f64, vmulq_f64, vnegq_f64, vst1q_f64, vsubq_f64,
    };

    let n = a.len().min(b.len());
    let limit = n - n % 2;
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum = vld1q_f64(acc.sum.as_ptr());
    let mut comp = vld1q_f64(acc.comp.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = vld1q_f64(a_ptr.add(i));
        let vb = vld1q_f64(b_ptr.add(i));
        let prod = vmulq_f64(va, vb);
        // -prod + va * vb, one rounding
        let prod_err = vfmaq_f64(vnegq_f64(prod), va, vb);
        let t = vaddq_f64(sum, prod);
        let z = vsubq_f64(t, sum);
        let err = vaddq_f64(vsubq_f64(sum, vsubq_f64(t, z)), vsubq_f64(prod, z));
        comp = vaddq_f64(vaddq_f64(comp, err), prod_err);
        sum = t;
        i += 2;
    }
    vst1q_f64(acc.sum.as_mut_ptr(), sum);
    vst1q_f64(acc.comp.as_mut_ptr(), comp);

    limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lanes::LaneWidth;
    use crate::reduce::{reduce_blocks, BlockStep, FmaStep, KahanStep};

    #[test]
    fn test_neon_matches_portable_bits() {
        let lanes = LaneWidth::new(2).unwrap();

        for size in [0, 1, 2, 3, 4, 5, 15, 16, 17, 255] {
            let a: Vec<f64> = (0..size).map(|i| ((i * 7) as f64).sin() * 1e3).collect();
            let b: Vec<f64> = (0..size).map(|i| ((i * 11) as f64).cos() * 1e-3).collect();

            let mut acc = FmaStep.zero();
            let next = unsafe { fma_blocks_neon(&a, &b, &mut acc) };
            assert_eq!((next, acc), reduce_blocks(&FmaStep, lanes, &a, &b, size, FmaStep.zero()));

            let mut acc = FmaStep.zero();
            let next = unsafe { fma_square_blocks_neon(&a, &mut acc) };
            assert_eq!((next, acc), reduce_blocks(&FmaStep, lanes, &a, &a, size, FmaStep.zero()));

            let mut acc = KahanStep.zero();
            let next = unsafe { kahan_blocks_neon(&a, &b, &mut acc) };
            assert_eq!(
                (next, acc),
                reduce_blocks(&KahanStep, lanes, &a, &b, size, KahanStep.zero()),
                "size={}",
                size
            );
        }
    }
}
