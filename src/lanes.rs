//! Lane configuration: how many `f64` lanes one vector step processes.
//!
//! The native width is detected once, on first use, and cached for the
//! lifetime of the process:
//!
//! | Target | Requirement | Lanes | Backend |
//! |--------|-------------|-------|---------|
//! | x86_64 | AVX-512F | 8 | [`Backend::Avx512`] |
//! | x86_64 | AVX2 + FMA | 4 | [`Backend::Avx2Fma`] |
//! | x86_64 | SSE2 baseline | 2 | [`Backend::Portable`] |
//! | aarch64 | NEON | 2 | [`Backend::Neon`] |
//! | other | - | 1 | [`Backend::Portable`] |
//!
//! With the `simd` feature disabled the native width is always 1.

use std::fmt;
use std::sync::OnceLock;

use crate::Error;

/// Widest lane count any backend uses (AVX-512: 8 x f64).
///
/// Accumulator state is a fixed `[f64; MAX_LANES]` array so that no
/// reduction allocates.
pub const MAX_LANES: usize = 8;

/// Number of scalar lanes processed per vector step, in `1..=MAX_LANES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneWidth(usize);

impl LaneWidth {
    /// Pure scalar execution.
    pub const SCALAR: LaneWidth = LaneWidth(1);

    /// Validated constructor.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidLaneWidth`] if `lanes` is zero or exceeds [`MAX_LANES`].
    pub fn new(lanes: usize) -> Result<Self, Error> {
        if lanes == 0 || lanes > MAX_LANES {
            return Err(Error::InvalidLaneWidth(lanes));
        }
        Ok(LaneWidth(lanes))
    }

    /// The lane count as a plain integer.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for LaneWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Instruction set a kernel runs its full-width blocks on.
///
/// Every backend performs the same per-lane arithmetic in the same order,
/// so results are bit-identical across backends at a given [`LaneWidth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// AVX-512F, 8 lanes (x86_64 only).
    Avx512,
    /// AVX2 + FMA, 4 lanes (x86_64 only).
    Avx2Fma,
    /// NEON, 2 lanes (aarch64 only).
    Neon,
    /// Plain Rust loop over emulated lanes. Works at any width.
    Portable,
}

impl Backend {
    /// Lane count the backend's registers hold, or `None` for the portable
    /// backend, which runs at whatever width it is given.
    #[must_use]
    pub const fn register_lanes(self) -> Option<usize> {
        match self {
            Backend::Avx512 => Some(8),
            Backend::Avx2Fma => Some(4),
            Backend::Neon => Some(2),
            Backend::Portable => None,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Avx512 => "avx512f",
            Backend::Avx2Fma => "avx2+fma",
            Backend::Neon => "neon",
            Backend::Portable => "portable",
        };
        f.write_str(name)
    }
}

static NATIVE: OnceLock<(LaneWidth, Backend)> = OnceLock::new();

#[allow(unreachable_code)]
fn detect() -> (LaneWidth, Backend) {
    #[cfg(all(feature = "simd", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx512f") {
            return (LaneWidth(8), Backend::Avx512);
        }
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return (LaneWidth(4), Backend::Avx2Fma);
        }
        // SSE2 is part of the x86_64 baseline but has no FMA; the portable
        // loop emulates its two lanes.
        return (LaneWidth(2), Backend::Portable);
    }

    #[cfg(all(feature = "simd", target_arch = "aarch64"))]
    {
        return (LaneWidth(2), Backend::Neon);
    }

    (LaneWidth::SCALAR, Backend::Portable)
}

/// Native lane width and backend, detected on first call.
#[inline]
pub(crate) fn native() -> (LaneWidth, Backend) {
    *NATIVE.get_or_init(|| {
        let (lanes, backend) = detect();
        tracing::debug!(%lanes, %backend, "resolved native lane configuration");
        (lanes, backend)
    })
}

/// Native lane width for this host. Always at least 1.
///
/// # Example
///
/// ```rust
/// let lanes = lanedot::lane_width();
/// assert!(lanes.get() >= 1);
/// ```
#[inline]
#[must_use]
pub fn lane_width() -> LaneWidth {
    native().0
}

/// Backend the native kernels dispatch to.
#[inline]
#[must_use]
pub fn backend() -> Backend {
    native().1
}

/// Resolve the native lane configuration now rather than on the first
/// kernel call.
pub fn warmup() {
    let _ = native();
}
