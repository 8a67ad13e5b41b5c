//! Lane-width-aware inner products and Euclidean norms over `f64`.
//!
//! `lanedot` trades off two things: throughput from hardware vector lanes and
//! rounding error from long accumulations. Every kernel comes in two forms:
//!
//! - **Plain**: [`dot`], [`dot_slice`], [`squared_l2_norm`], [`l2_norm`].
//!   Each lane accumulates with a fused multiply-add.
//! - **Compensated**: [`dot_compensated`], [`dot_slice_compensated`],
//!   [`squared_l2_norm_compensated`], [`l2_norm_compensated`]. Each lane
//!   carries a correction term holding the exact rounding error of every
//!   product and addition, and the lanes are folded with a second
//!   compensated pass.
//!
//! Callers choose explicitly; nothing switches to compensation automatically.
//!
//! # Lane Width
//!
//! The native lane width is detected once at first use ([`lane_width`]):
//!
//! | Architecture | Instructions | f64 lanes | Detection |
//! |--------------|--------------|-----------|-----------|
//! | x86_64 | AVX-512F | 8 | Runtime |
//! | x86_64 | AVX2 + FMA | 4 | Runtime |
//! | x86_64 | SSE2 baseline | 2 | Portable loop |
//! | aarch64 | NEON | 2 | Always available |
//! | Other | - | 1 | Scalar |
//!
//! Every width runs the same algorithm: full blocks, one masked tail step,
//! one horizontal fold. A [`Kernel`] pins the width explicitly when results
//! must not depend on the host.
//!
//! # Preconditions
//!
//! Slice bounds are checked before any arithmetic. A range past the end of
//! its slice is caller misuse and panics, like indexing out of range.
//! NaN and infinities are not rejected; they propagate.
//!
//! # Example
//!
//! ```rust
//! use lanedot::{dot, dot_slice, l2_norm, squared_l2_norm};
//!
//! let a = [2.0, 4.0, 6.0, 8.0];
//! let b = [1.0, 3.0, 5.0, 7.0];
//!
//! assert_eq!(dot(&a, &b), 100.0);
//! assert_eq!(dot_slice(&a, 1, &b, 0, 3), 62.0);
//!
//! assert_eq!(squared_l2_norm(&[3.0, 4.0]), 25.0);
//! assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
//! ```
//!
//! # References
//!
//! - Kahan, W. (1965). "Further remarks on reducing truncation errors"
//! - Neumaier, A. (1974). "Rundungsfehleranalyse einiger Verfahren zur Summation endlicher Summen"
//! - Ogita, T., Rump, S.M., Oishi, S. (2005). "Accurate Sum and Dot Product"
//! - Higham, N.J. (2002). "Accuracy and Stability of Numerical Algorithms", ch. 4

#![warn(missing_docs)]
#![warn(clippy::all)]

#[cfg(feature = "simd")]
mod arch;
mod bounds;
mod dense;
mod error;
mod kahan;
mod lanes;
mod reduce;

pub use bounds::{check_bounds, SliceView};
pub use dense::{
    dot, dot_compensated, dot_sequential, dot_slice, dot_slice_compensated, dot_view,
    dot_view_compensated, l2_norm, l2_norm_compensated, squared_l2_norm,
    squared_l2_norm_compensated, Kernel,
};
pub use error::Error;
pub use kahan::{kahan_sum, KahanSum};
pub use lanes::{backend, lane_width, warmup, Backend, LaneWidth, MAX_LANES};

/// Minimum slice length for the arch-specific block kernels.
///
/// Shorter inputs run the portable loop at the same lane width, which gives
/// the same bits without the call into `target_feature` code.
pub const MIN_DIM_SIMD: usize = 16;
