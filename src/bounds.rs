//! Slice bounds validation and borrowed slice views.

use crate::Error;

/// Check that `[offset, offset + len)` lies inside a sequence of `size`
/// elements.
///
/// # Errors
///
/// [`Error::OffsetOverflow`] if `offset + len` overflows, otherwise
/// [`Error::OutOfBounds`] if the range ends past `size`.
#[inline]
pub fn check_bounds(size: usize, offset: usize, len: usize) -> Result<(), Error> {
    let end = offset
        .checked_add(len)
        .ok_or(Error::OffsetOverflow { offset, len })?;
    if end > size {
        return Err(Error::OutOfBounds { offset, len, size });
    }
    Ok(())
}

/// Panicking form of [`check_bounds`] used by the kernels.
#[inline]
#[track_caller]
pub(crate) fn require_bounds(size: usize, offset: usize, len: usize) {
    if let Err(e) = check_bounds(size, offset, len) {
        panic!("{e}");
    }
}

/// A contiguous `[offset, offset + len)` window onto an `f64` sequence.
///
/// Borrowing, never copying. A `SliceView` always satisfies
/// `offset + len <= data.len()`.
#[derive(Debug, Clone, Copy)]
pub struct SliceView<'a> {
    data: &'a [f64],
    offset: usize,
    len: usize,
}

impl<'a> SliceView<'a> {
    /// View `len` elements of `data` starting at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the range does not fit inside `data`.
    #[track_caller]
    #[must_use]
    pub fn new(data: &'a [f64], offset: usize, len: usize) -> Self {
        require_bounds(data.len(), offset, len);
        SliceView { data, offset, len }
    }

    /// Checked form of [`SliceView::new`].
    ///
    /// # Errors
    ///
    /// Same conditions as [`check_bounds`].
    pub fn try_new(data: &'a [f64], offset: usize, len: usize) -> Result<Self, Error> {
        check_bounds(data.len(), offset, len)?;
        Ok(SliceView { data, offset, len })
    }

    /// View over the whole sequence.
    #[must_use]
    pub fn full(data: &'a [f64]) -> Self {
        SliceView {
            data,
            offset: 0,
            len: data.len(),
        }
    }

    /// Start of the window in the underlying sequence.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of elements in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The viewed elements.
    #[must_use]
    pub fn as_slice(&self) -> &'a [f64] {
        &self.data[self.offset..self.offset + self.len]
    }
}

impl<'a> From<&'a [f64]> for SliceView<'a> {
    fn from(data: &'a [f64]) -> Self {
        SliceView::full(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_bounds_accepts_edges() {
        assert!(check_bounds(0, 0, 0).is_ok());
        assert!(check_bounds(4, 4, 0).is_ok());
        assert!(check_bounds(4, 0, 4).is_ok());
        assert!(check_bounds(4, 1, 3).is_ok());
    }

    #[test]
    fn test_check_bounds_rejects() {
        assert_eq!(
            check_bounds(4, 2, 3),
            Err(Error::OutOfBounds {
                offset: 2,
                len: 3,
                size: 4
            })
        );
        assert_eq!(
            check_bounds(4, 5, 0),
            Err(Error::OutOfBounds {
                offset: 5,
                len: 0,
                size: 4
            })
        );
        assert_eq!(
            check_bounds(4, usize::MAX, 2),
            Err(Error::OffsetOverflow {
                offset: usize::MAX,
                len: 2
            })
        );
    }

    #[test]
    fn test_view_window() {
        let data = [2.0, 4.0, 6.0, 8.0];
        let v = SliceView::new(&data, 1, 2);
        assert_eq!(v.as_slice(), &[4.0, 6.0]);
        assert_eq!(v.offset(), 1);
        assert_eq!(v.len(), 2);
        assert!(!v.is_empty());
        assert_eq!(SliceView::from(&data[..]).len(), 4);
    }

    #[test]
    fn test_try_new_reports() {
        let data = [1.0; 3];
        let err = SliceView::try_new(&data, 2, 2).unwrap_err();
        assert_eq!(err.to_string(), "slice out of bounds: offset 2 + len 2 > size 3");
    }

    #[test]
    #[should_panic(expected = "slice out of bounds")]
    fn test_new_panics_out_of_range() {
        let data = [1.0; 3];
        let _ = SliceView::new(&data, 1, 3);
    }
}
