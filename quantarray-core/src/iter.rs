//! Indexing, slice assignment and iteration.

use crate::dimension::Dimensionality;
use crate::error::{QuantityError, Result};
use crate::quantity::Quantity;
use ndarray::iter::AxisIter;
use ndarray::{IxDyn, SliceInfoElem};

/// Validates `index` against `shape` and pads it with full slices for missing axes.
///
/// Negative positions count from the end, as in NumPy.
fn normalize_index(shape: &[usize], index: &[SliceInfoElem]) -> Result<Vec<SliceInfoElem>> {
    let consumed = index
        .iter()
        .filter(|elem| !matches!(elem, SliceInfoElem::NewAxis))
        .count();
    if consumed > shape.len() {
        return Err(QuantityError::TooManyIndices { ndim: shape.len() });
    }

    let mut out = Vec::with_capacity(index.len() + shape.len() - consumed);
    let mut axis = 0;
    for elem in index {
        match *elem {
            SliceInfoElem::Index(i) => {
                let len = shape[axis];
                if i >= len as isize || i < -(len as isize) {
                    return Err(QuantityError::IndexOutOfBounds { index: i, axis, len });
                }
                axis += 1;
            }
            SliceInfoElem::Slice { start, end, step } => {
                let len = shape[axis];
                if step == 0 {
                    return Err(QuantityError::ZeroStep { axis });
                }
                for bound in std::iter::once(start).chain(end) {
                    if bound > len as isize || bound < -(len as isize) {
                        return Err(QuantityError::IndexOutOfBounds {
                            index: bound,
                            axis,
                            len,
                        });
                    }
                }
                axis += 1;
            }
            SliceInfoElem::NewAxis => {}
        }
        out.push(*elem);
    }
    out.extend((axis..shape.len()).map(|_| SliceInfoElem::Slice {
        start: 0,
        end: None,
        step: 1,
    }));
    Ok(out)
}

impl Quantity {
    /// A new, independent quantity over `magnitude[index]`, in the same units.
    ///
    /// Missing trailing axes are taken whole. Out-of-range positions are errors.
    ///
    /// ```rust
    /// use quantarray_core::Quantity;
    /// use ndarray::SliceInfoElem;
    ///
    /// let q = Quantity::new([1.0, 2.0, 3.0], "meter").unwrap();
    /// let second = q.get_item(&[SliceInfoElem::Index(1)]).unwrap();
    /// assert_eq!(second.magnitude().sum(), 2.0);
    /// assert_eq!(second.units(), "m");
    ///
    /// assert!(q.get_item(&[SliceInfoElem::Index(3)]).is_err());
    /// ```
    ///
    /// ndarray's `s![]` macro builds indices too:
    ///
    /// ```rust
    /// use quantarray_core::Quantity;
    /// use ndarray::{array, s};
    ///
    /// let q = Quantity::new(array![[1.0, 2.0], [3.0, 4.0]], "s").unwrap();
    /// let col = q.get_item(s![.., 1]).unwrap();
    /// assert_eq!(col.magnitude().as_slice().unwrap(), &[2.0, 4.0]);
    /// ```
    pub fn get_item(&self, index: impl AsRef<[SliceInfoElem]>) -> Result<Quantity> {
        let index = normalize_index(self.shape(), index.as_ref())?;
        let view = self.magnitude.slice(index.as_slice());
        Ok(Quantity::from_parts(
            view.to_owned(),
            self.dimensionality().clone(),
        ))
    }

    /// Converts `value` into this quantity's units and writes it over `magnitude[index]`.
    ///
    /// `value` is broadcast to the shape of the selection.
    ///
    /// ```rust
    /// use quantarray_core::Quantity;
    /// use ndarray::SliceInfoElem;
    ///
    /// let mut q = Quantity::new([0.0, 0.0], "m").unwrap();
    /// let cm = Quantity::new(100.0, "cm").unwrap();
    /// q.set_item(&[SliceInfoElem::Index(0)], &cm).unwrap();
    /// assert!((q.magnitude()[[0]] - 1.0).abs() < 1e-12);
    /// ```
    pub fn set_item(
        &mut self,
        index: impl AsRef<[SliceInfoElem]>,
        value: &Quantity,
    ) -> Result<()> {
        if !self.is_mutable() {
            return Err(QuantityError::ReadOnly);
        }
        let index = normalize_index(self.shape(), index.as_ref())?;
        let value = value.rescale(self.dimensionality().clone())?;

        let mut target = self.magnitude.slice_mut(index.as_slice());
        let source = value
            .magnitude
            .broadcast(target.raw_dim())
            .ok_or_else(|| QuantityError::ShapeMismatch {
                lhs: target.shape().to_vec(),
                rhs: value.shape().to_vec(),
            })?;
        target.assign(&source);
        Ok(())
    }

    /// Iterates over the leading axis, yielding one quantity per row.
    ///
    /// A 0-d quantity yields nothing.
    pub fn iter(&self) -> QuantityIter<'_> {
        QuantityIter {
            rows: (self.ndim() > 0).then(|| self.magnitude.outer_iter()),
            dims: self.dimensionality(),
        }
    }
}

/// Iterator over the leading axis of a [`Quantity`].
#[derive(Clone)]
pub struct QuantityIter<'a> {
    rows: Option<AxisIter<'a, f64, IxDyn>>,
    dims: &'a Dimensionality,
}

impl Iterator for QuantityIter<'_> {
    type Item = Quantity;

    fn next(&mut self) -> Option<Quantity> {
        let row = self.rows.as_mut()?.next()?;
        Some(Quantity::from_parts(row.to_owned(), self.dims.clone()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.rows.as_ref().map_or(0, ExactSizeIterator::len);
        (len, Some(len))
    }
}

impl ExactSizeIterator for QuantityIter<'_> {}

impl<'a> IntoIterator for &'a Quantity {
    type Item = Quantity;
    type IntoIter = QuantityIter<'a>;

    fn into_iter(self) -> QuantityIter<'a> {
        self.iter()
    }
}
