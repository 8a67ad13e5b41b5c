//! Dense dot products and L2 norms, plain and Kahan-compensated.
//!
//! Every kernel runs the same three phases:
//!
//! 1. full `width`-element blocks (arch kernel or portable loop),
//! 2. one masked step over the remaining `< width` elements,
//! 3. a horizontal fold of the lane accumulators.
//!
//! # Dispatch
//!
//! | Backend | Lanes | Used when |
//! |---------|-------|-----------|
//! | AVX-512F | 8 | detected, n >= 16 |
//! | AVX2+FMA | 4 | detected, n >= 16 |
//! | NEON | 2 | aarch64, n >= 16 |
//! | Portable | any | otherwise |
//!
//! All backends produce the same bits at a given lane width, so the
//! threshold only affects speed.

#[cfg(feature = "simd")]
use crate::arch;
use crate::bounds::{require_bounds, SliceView};
use crate::lanes::{self, Backend, LaneWidth};
use crate::reduce::{
    reduce_blocks, reduce_tail, BlockStep, FmaStep, KahanLanes, KahanStep, Lanes,
};
use crate::MIN_DIM_SIMD;

/// A lane width paired with the backend that runs its full blocks.
///
/// The free functions ([`dot`], [`l2_norm`], ...) use [`Kernel::native`].
/// Pin a width with [`Kernel::with_lanes`] to get results that do not depend
/// on the host.
///
/// # Example
///
/// ```rust
/// use lanedot::{Kernel, LaneWidth};
///
/// let k = Kernel::with_lanes(LaneWidth::new(4).unwrap());
/// assert_eq!(k.dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Kernel {
    lanes: LaneWidth,
    backend: Backend,
}

impl Kernel {
    /// Kernel for the host's native lane width and backend.
    #[inline]
    #[must_use]
    pub fn native() -> Self {
        let (lanes, backend) = lanes::native();
        Kernel { lanes, backend }
    }

    /// Kernel fixed to `lanes`.
    ///
    /// Reuses the native backend when `lanes` equals the native width,
    /// otherwise runs the portable loop.
    #[must_use]
    pub fn with_lanes(lanes: LaneWidth) -> Self {
        let (native_lanes, native_backend) = lanes::native();
        let backend = if lanes == native_lanes {
            native_backend
        } else {
            Backend::Portable
        };
        tracing::trace!(%lanes, %backend, "pinned kernel lane width");
        Kernel { lanes, backend }
    }

    /// Kernel fixed to `lanes` that never uses arch-specific code.
    #[must_use]
    pub fn portable(lanes: LaneWidth) -> Self {
        Kernel {
            lanes,
            backend: Backend::Portable,
        }
    }

    /// Lane width this kernel reduces with.
    #[must_use]
    pub fn lanes(&self) -> LaneWidth {
        self.lanes
    }

    /// Backend running the full blocks.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// See [`dot`].
    #[inline]
    #[must_use]
    pub fn dot(&self, a: &[f64], b: &[f64]) -> f64 {
        let n = a.len().min(b.len());
        self.dot_slice(a, 0, b, 0, n)
    }

    /// See [`dot_slice`].
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn dot_slice(
        &self,
        a: &[f64],
        a_offset: usize,
        b: &[f64],
        b_offset: usize,
        len: usize,
    ) -> f64 {
        require_bounds(a.len(), a_offset, len);
        require_bounds(b.len(), b_offset, len);
        if len == 0 {
            return 0.0;
        }
        let a = &a[a_offset..a_offset + len];
        let b = &b[b_offset..b_offset + len];

        let mut acc = FmaStep.zero();
        let next = self.fma_prefix(a, b, &mut acc);
        let acc = reduce_tail(&FmaStep, a, b, next, len, acc);
        FmaStep.finish(&acc, self.lanes)
    }

    /// See [`dot_compensated`].
    #[inline]
    #[must_use]
    pub fn dot_compensated(&self, a: &[f64], b: &[f64]) -> f64 {
        let n = a.len().min(b.len());
        self.dot_slice_compensated(a, 0, b, 0, n)
    }

    /// See [`dot_slice_compensated`].
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn dot_slice_compensated(
        &self,
        a: &[f64],
        a_offset: usize,
        b: &[f64],
        b_offset: usize,
        len: usize,
    ) -> f64 {
        require_bounds(a.len(), a_offset, len);
        require_bounds(b.len(), b_offset, len);
        if len == 0 {
            return 0.0;
        }
        let a = &a[a_offset..a_offset + len];
        let b = &b[b_offset..b_offset + len];

        let mut acc = KahanStep.zero();
        let next = self.kahan_prefix(a, b, &mut acc);
        let acc = reduce_tail(&KahanStep, a, b, next, len, acc);
        KahanStep.finish(&acc, self.lanes)
    }

    /// See [`dot_view`].
    #[inline]
    #[must_use]
    pub fn dot_view(&self, a: SliceView<'_>, b: SliceView<'_>) -> f64 {
        self.dot(a.as_slice(), b.as_slice())
    }

    /// See [`dot_view_compensated`].
    #[inline]
    #[must_use]
    pub fn dot_view_compensated(&self, a: SliceView<'_>, b: SliceView<'_>) -> f64 {
        self.dot_compensated(a.as_slice(), b.as_slice())
    }

    /// See [`squared_l2_norm`].
    #[inline]
    #[must_use]
    pub fn squared_l2_norm(&self, a: &[f64]) -> f64 {
        let len = a.len();
        if len == 0 {
            return 0.0;
        }
        let mut acc = FmaStep.zero();
        let next = self.fma_square_prefix(a, &mut acc);
        let acc = reduce_tail(&FmaStep, a, a, next, len, acc);
        FmaStep.finish(&acc, self.lanes)
    }

    /// See [`l2_norm`].
    #[inline]
    #[must_use]
    pub fn l2_norm(&self, a: &[f64]) -> f64 {
        self.squared_l2_norm(a).sqrt()
    }

    /// See [`squared_l2_norm_compensated`].
    #[inline]
    #[must_use]
    pub fn squared_l2_norm_compensated(&self, a: &[f64]) -> f64 {
        self.dot_compensated(a, a)
    }

    /// See [`l2_norm_compensated`].
    #[inline]
    #[must_use]
    pub fn l2_norm_compensated(&self, a: &[f64]) -> f64 {
        self.squared_l2_norm_compensated(a).sqrt()
    }

    /// Backend to use for `len` elements: arch kernels only pay off past
    /// [`MIN_DIM_SIMD`].
    #[inline]
    fn backend_for(&self, len: usize) -> Backend {
        if len >= MIN_DIM_SIMD {
            self.backend
        } else {
            Backend::Portable
        }
    }

    #[inline]
    fn fma_prefix(&self, a: &[f64], b: &[f64], acc: &mut Lanes) -> usize {
        match self.backend_for(a.len()) {
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: Avx512 is only selected after runtime detection of avx512f.
            Backend::Avx512 => unsafe { arch::x86_64::fma_blocks_avx512(a, b, acc) },
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: Avx2Fma is only selected after runtime detection of avx2 and fma.
            Backend::Avx2Fma => unsafe { arch::x86_64::fma_blocks_avx2(a, b, acc) },
            #[cfg(all(feature = "simd", target_arch = "aarch64"))]
            // SAFETY: NEON is always available on aarch64.
            Backend::Neon => unsafe { arch::aarch64::fma_blocks_neon(a, b, acc) },
            _ => {
                let (next, out) = reduce_blocks(&FmaStep, self.lanes, a, b, a.len(), *acc);
                *acc = out;
                next
            }
        }
    }

    #[inline]
    fn fma_square_prefix(&self, a: &[f64], acc: &mut Lanes) -> usize {
        match self.backend_for(a.len()) {
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: Avx512 is only selected after runtime detection of avx512f.
            Backend::Avx512 => unsafe { arch::x86_64::fma_square_blocks_avx512(a, acc) },
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: Avx2Fma is only selected after runtime detection of avx2 and fma.
            Backend::Avx2Fma => unsafe { arch::x86_64::fma_square_blocks_avx2(a, acc) },
            #[cfg(all(feature = "simd", target_arch = "aarch64"))]
            // SAFETY: NEON is always available on aarch64.
            Backend::Neon => unsafe { arch::aarch64::fma_square_blocks_neon(a, acc) },
            _ => {
                let (next, out) = reduce_blocks(&FmaStep, self.lanes, a, a, a.len(), *acc);
                *acc = out;
                next
            }
        }
    }

    #[inline]
    fn kahan_prefix(&self, a: &[f64], b: &[f64], acc: &mut KahanLanes) -> usize {
        match self.backend_for(a.len()) {
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: Avx512 is only selected after runtime detection of avx512f.
            Backend::Avx512 => unsafe { arch::x86_64::kahan_blocks_avx512(a, b, acc) },
            #[cfg(all(feature = "simd", target_arch = "x86_64"))]
            // SAFETY: Avx2Fma is only selected after runtime detection of avx2 and fma.
            Backend::Avx2Fma => unsafe { arch::x86_64::kahan_blocks_avx2(a, b, acc) },
            #[cfg(all(feature = "simd", target_arch = "aarch64"))]
            // SAFETY: NEON is always available on aarch64.
            Backend::Neon => unsafe { arch::aarch64::kahan_blocks_neon(a, b, acc) },
            _ => {
                let (next, out) = reduce_blocks(&KahanStep, self.lanes, a, b, a.len(), *acc);
                *acc = out;
                next
            }
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::native()
    }
}

/// Dot product `Σ a[i] * b[i]` over the first `min(a.len(), b.len())`
/// elements.
///
/// Each lane accumulates with a fused multiply-add. Returns 0.0 for empty
/// input; NaN and infinities propagate.
///
/// # Example
///
/// ```rust
/// use lanedot::dot;
///
/// let a = [1.0, 2.0, 3.0];
/// let b = [4.0, 5.0, 6.0];
/// assert_eq!(dot(&a, &b), 32.0);
/// ```
#[inline]
#[must_use]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    Kernel::native().dot(a, b)
}

/// Dot product of `a[a_offset..a_offset + len]` and
/// `b[b_offset..b_offset + len]`.
///
/// # Panics
///
/// Panics if either range runs past its slice (or `offset + len`
/// overflows). The check happens before any arithmetic.
///
/// # Example
///
/// ```rust
/// use lanedot::dot_slice;
///
/// let a = [2.0, 4.0, 6.0, 8.0];
/// let b = [1.0, 3.0, 5.0, 7.0];
/// // 4*1 + 6*3 + 8*5
/// assert_eq!(dot_slice(&a, 1, &b, 0, 3), 62.0);
/// ```
#[inline]
#[must_use]
#[track_caller]
pub fn dot_slice(a: &[f64], a_offset: usize, b: &[f64], b_offset: usize, len: usize) -> f64 {
    Kernel::native().dot_slice(a, a_offset, b, b_offset, len)
}

/// Compensated dot product over `min(a.len(), b.len())` elements.
///
/// Each lane keeps a `(sum, comp)` pair: products are rounded on their own,
/// and both the product's rounding error and each addition's rounding
/// error go into `comp`. The lanes are then folded with the same
/// compensation. The result is never less accurate than [`dot`] on
/// inputs whose terms differ widely in magnitude, including large terms
/// of alternating sign that cancel.
///
/// Accuracy is that of about twice working precision, then rounded once:
/// when the exact result itself is tiny next to the terms
/// (`|Σ a·b| << Σ |a·b|`) the relative error can still be large.
///
/// # Example
///
/// ```rust
/// use lanedot::{dot, dot_compensated};
///
/// let mut a = vec![1.0];
/// a.extend(std::iter::repeat(1e-16).take(1000));
/// let ones = vec![1.0; a.len()];
///
/// let exact = 1.0 + 1e-13;
/// let plain = dot(&a, &ones);
/// let compensated = dot_compensated(&a, &ones);
/// assert!((compensated - exact).abs() <= (plain - exact).abs());
/// ```
#[inline]
#[must_use]
pub fn dot_compensated(a: &[f64], b: &[f64]) -> f64 {
    Kernel::native().dot_compensated(a, b)
}

/// Compensated form of [`dot_slice`].
///
/// # Panics
///
/// Same conditions as [`dot_slice`].
#[inline]
#[must_use]
#[track_caller]
pub fn dot_slice_compensated(
    a: &[f64],
    a_offset: usize,
    b: &[f64],
    b_offset: usize,
    len: usize,
) -> f64 {
    Kernel::native().dot_slice_compensated(a, a_offset, b, b_offset, len)
}

/// Dot product of two views, over the shorter of the two.
#[inline]
#[must_use]
pub fn dot_view(a: SliceView<'_>, b: SliceView<'_>) -> f64 {
    Kernel::native().dot_view(a, b)
}

/// Compensated dot product of two views.
#[inline]
#[must_use]
pub fn dot_view_compensated(a: SliceView<'_>, b: SliceView<'_>) -> f64 {
    Kernel::native().dot_view_compensated(a, b)
}

/// Left-to-right scalar dot product, one fused multiply-add per element.
///
/// The reference the lane-blocked kernels are measured against; identical
/// to a width-1 [`Kernel`].
#[inline]
#[must_use]
pub fn dot_sequential(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&x, &y)| x.mul_add(y, acc))
}

/// Squared Euclidean norm `Σ a[i]²`.
///
/// Loads each element once. Bit-identical to `dot(a, a)`.
///
/// # Example
///
/// ```rust
/// use lanedot::squared_l2_norm;
///
/// assert_eq!(squared_l2_norm(&[3.0, 4.0]), 25.0);
/// assert_eq!(squared_l2_norm(&[]), 0.0);
/// ```
#[inline]
#[must_use]
pub fn squared_l2_norm(a: &[f64]) -> f64 {
    Kernel::native().squared_l2_norm(a)
}

/// Euclidean norm, `sqrt(squared_l2_norm(a))`.
///
/// # Example
///
/// ```rust
/// use lanedot::l2_norm;
///
/// assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
/// ```
#[inline]
#[must_use]
pub fn l2_norm(a: &[f64]) -> f64 {
    Kernel::native().l2_norm(a)
}

/// Compensated squared Euclidean norm, `dot_compensated(a, a)`.
#[inline]
#[must_use]
pub fn squared_l2_norm_compensated(a: &[f64]) -> f64 {
    Kernel::native().squared_l2_norm_compensated(a)
}

/// Compensated Euclidean norm.
#[inline]
#[must_use]
pub fn l2_norm_compensated(a: &[f64]) -> f64 {
    Kernel::native().l2_norm_compensated(a)
}
