//! x86_64 block kernels using AVX-512F and AVX2+FMA.
//!
//! Each kernel folds the lane-aligned prefix of its inputs into a caller
//! supplied accumulator and returns the first index it did not consume.
//! The tail and horizontal fold are left to `crate::reduce`.
//!
//! | ISA | f64 lanes |
//! |-----|-----------|
//! | AVX-512F | 8 |
//! | AVX2+FMA | 4 |
//!
//! One accumulator register per kernel: lane `k` sees exactly the elements
//! `k, k + width, k + 2 * width, ...`, which keeps results bit-identical to
//! the portable loop at the same width.

use crate::reduce::{KahanLanes, Lanes};

/// AVX-512 fused multiply-add over full 8-lane blocks.
///
/// # Safety
///
/// Caller must verify `is_x86_feature_detected!("avx512f")`.
#[target_feature(enable = "avx512f")]
pub unsafe fn fma_blocks_avx512(a: &[f64], b: &[f64], acc: &mut Lanes) -> usize {
    use std::arch::x86_64::{_mm512_fmadd_pd, _mm512_loadu_pd, _mm512_storeu_pd};

    let n = a.len().min(b.len());
    let limit = n - n % 8;
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum = _mm512_loadu_pd(acc.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = _mm512_loadu_pd(a_ptr.add(i));
        let vb = _mm512_loadu_pd(b_ptr.add(i));
        sum = _mm512_fmadd_pd(va, vb, sum);
        i += 8;
    }
    _mm512_storeu_pd(acc.as_mut_ptr(), sum);

    limit
}

/// AVX-512 sum of squares over full 8-lane blocks, one load per block.
///
/// # Safety
///
/// Caller must verify `is_x86_feature_detected!("avx512f")`.
#[target_feature(enable = "avx512f")]
pub unsafe fn fma_square_blocks_avx512(a: &[f64], acc: &mut Lanes) -> usize {
    use std::arch::x86_64::{_mm512_fmadd_pd, _mm512_loadu_pd, _mm512_storeu_pd};

    let n = a.len();
    let limit = n - n % 8;
    let a_ptr = a.as_ptr();

    let mut sum = _mm512_loadu_pd(acc.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = _mm512_loadu_pd(a_ptr.add(i));
        sum = _mm512_fmadd_pd(va, va, sum);
        i += 8;
    }
    _mm512_storeu_pd(acc.as_mut_ptr(), sum);

    limit
}

/// AVX-512 compensated products over full 8-lane blocks.
///
/// Same operation order as `KahanSum::add_product`: TwoSum of the rounded
/// product into `sum`, its error and the FMA product error into `comp`.
///
/// # Safety
///
/// Caller must verify `is_x86_feature_detected!("avx512f")`.
#[target_feature(enable = "avx512f")]
pub unsafe fn kahan_blocks_avx512(a: &[f64], b: &[f64], acc: &mut KahanLanes) -> usize {
    use std::arch::x86_64::{
        _mm512_add_pd, _mm512_fmsub_pd, _mm512_loadu_pd, _mm512_mul_pd, _mm512_storeu_pd,
        _mm512_sub_pd,
    };

    let n = a.len().min(b.len());
    let limit = n - n % 8;
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum = _mm512_loadu_pd(acc.sum.as_ptr());
    let mut comp = _mm512_loadu_pd(acc.comp.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = _mm512_loadu_pd(a_ptr.add(i));
        let vb = _mm512_loadu_pd(b_ptr.add(i));
        let prod = _mm512_mul_pd(va, vb);
        let prod_err = _mm512_fmsub_pd(va, vb, prod);
        let t = _mm512_add_pd(sum, prod);
        let z = _mm512_sub_pd(t, sum);
        let err = _mm512_add_pd(
            _mm512_sub_pd(sum, _mm512_sub_pd(t, z)),
            _mm512_sub_pd(prod, z),
        );
        comp = _mm512_add_pd(_mm512_add_pd(comp, err), prod_err);
        sum = t;
        i += 8;
    }
    _mm512_storeu_pd(acc.sum.as_mut_ptr(), sum);
    _mm512_storeu_pd(acc.comp.as_mut_ptr(), comp);

    limit
}

/// AVX2 fused multiply-add over full 4-lane blocks.
///
/// # Safety
///
/// Caller must verify `is_x86_feature_detected!("avx2")` and
/// `is_x86_feature_detected!("fma")`.
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn fma_blocks_avx2(a: &[f64], b: &[f64], acc: &mut Lanes) -> usize {
    use std::arch::x86_64::{_mm256_fmadd_pd, _mm256_loadu_pd, _mm256_storeu_pd};

    let n = a.len().min(b.len());
    let limit = n - n % 4;
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum = _mm256_loadu_pd(acc.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = _mm256_loadu_pd(a_ptr.add(i));
        let vb = _mm256_loadu_pd(b_ptr.add(i));
        sum = _mm256_fmadd_pd(va, vb, sum);
        i += 4;
    }
    _mm256_storeu_pd(acc.as_mut_ptr(), sum);

    limit
}

/// AVX2 sum of squares over full 4-lane blocks.
///
/// # Safety
///
/// Caller must verify `is_x86_feature_detected!("avx2")` and
/// `is_x86_feature_detected!("fma")`.
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn fma_square_blocks_avx2(a: &[f64], acc: &mut Lanes) -> usize {
    use std::arch::x86_64::{_mm256_fmadd_pd, _mm256_loadu_pd, _mm256_storeu_pd};

    let n = a.len();
    let limit = n - n % 4;
    let a_ptr = a.as_ptr();

    let mut sum = _mm256_loadu_pd(acc.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = _mm256_loadu_pd(a_ptr.add(i));
        sum = _mm256_fmadd_pd(va, va, sum);
        i += 4;
    }
    _mm256_storeu_pd(acc.as_mut_ptr(), sum);

    limit
}

/// AVX2 compensated products over full 4-lane blocks.
///
/// # Safety
///
/// Caller must verify `is_x86_feature_detected!("avx2")` and
/// `is_x86_feature_detected!("fma")`.
#[target_feature(enable = "avx2", enable = "fma")]
pub unsafe fn kahan_blocks_avx2(a: &[f64], b: &[f64], acc: &mut KahanLanes) -> usize {
    use std::arch::x86_64::{
        _mm256_add_pd, _mm256_fmsub_pd, _mm256_loadu_pd, _mm256_mul_pd, _mm256_storeu_pd,
        _mm256_sub_pd,
    };

    let n = a.len().min(b.len());
    let limit = n - n % 4;
    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut sum = _mm256_loadu_pd(acc.sum.as_ptr());
    let mut comp = _mm256_loadu_pd(acc.comp.as_ptr());
    let mut i = 0;
    while i < limit {
        let va = _mm256_loadu_pd(a_ptr.add(i));
        let vb = _mm256_loadu_pd(b_ptr.add(i));
        let prod = _mm256_mul_pd(va, vb);
        let prod_err = _mm256_fmsub_pd(va, vb, prod);
        let t = _mm256_add_pd(sum, prod);
        let z = _mm256_sub_pd(t, sum);
        let err = _mm256_add_pd(
            _mm256_sub_pd(sum, _mm256_sub_pd(t, z)),
            _mm256_sub_pd(prod, z),
        );
        comp = _mm256_add_pd(_mm256_add_pd(comp, err), prod_err);
        sum = t;
        i += 4;
    }
    _mm256_storeu_pd(acc.sum.as_mut_ptr(), sum);
    _mm256_storeu_pd(acc.comp.as_mut_ptr(), comp);

    limit
}
