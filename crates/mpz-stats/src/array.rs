//! Multi-dimensional arrays.

use std::iter::FusedIterator;

/// Errors that can occur when constructing or indexing a
/// [`MultiDimensionalArray`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArrayError {
    /// An array must have at least one axis.
    #[error("array must have at least one axis")]
    NoAxes,
    /// Every axis must have a non-zero width.
    #[error("axis {axis} has zero width")]
    ZeroWidth {
        /// Axis with zero width.
        axis: usize,
    },
    /// The index has the wrong number of components.
    #[error("index has {actual} components, array has dimension {expected}")]
    DimensionMismatch {
        /// Dimension of the array.
        expected: usize,
        /// Number of index components.
        actual: usize,
    },
    /// An index component is out of range.
    #[error("index {index} is out of range for axis {axis} of width {width}")]
    IndexOutOfRange {
        /// Axis.
        axis: usize,
        /// Index component.
        index: usize,
        /// Width of the axis.
        width: usize,
    },
    /// Two arrays which must have the same shape did not.
    #[error("shape mismatch: {expected:?} != {actual:?}")]
    ShapeMismatch {
        /// Expected widths.
        expected: Vec<usize>,
        /// Actual widths.
        actual: Vec<usize>,
    },
    /// A one-dimensional array can not be projected.
    #[error("can not project a one-dimensional array")]
    Projection,
}

/// A dense array with an arbitrary number of axes.
///
/// Entries are stored in a flat buffer in row-major order, ie. the last axis
/// varies fastest. The widths of the axes are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiDimensionalArray<T> {
    widths: Vec<usize>,
    strides: Vec<usize>,
    entries: Vec<T>,
}

impl<T> MultiDimensionalArray<T> {
    /// Builds a one-dimensional array, calling `populate` once per index.
    pub fn build_1d<F>(width: usize, populate: F) -> Result<Self, ArrayError>
    where
        F: FnMut(usize) -> T,
    {
        Self::from_vec((0..width).map(populate).collect())
    }

    /// Builds an array with the given widths, calling `populate` once per
    /// index in lexicographic order.
    pub fn build<F>(widths: Vec<usize>, mut populate: F) -> Result<Self, ArrayError>
    where
        F: FnMut(&[usize]) -> T,
    {
        Self::try_build(widths, |index| Ok(populate(index)))
    }

    /// Fallible version of [`build`](Self::build).
    pub fn try_build<F, E>(widths: Vec<usize>, mut populate: F) -> Result<Self, E>
    where
        F: FnMut(&[usize]) -> Result<T, E>,
        E: From<ArrayError>,
    {
        check_widths(&widths)?;

        let entries = Indices::new(widths.clone())
            .map(|index| populate(&index))
            .collect::<Result<Vec<_>, E>>()?;

        Ok(Self::from_parts(widths, entries))
    }

    /// Creates a one-dimensional array from its entries.
    pub fn from_vec(entries: Vec<T>) -> Result<Self, ArrayError> {
        let widths = vec![entries.len()];
        check_widths(&widths)?;

        Ok(Self::from_parts(widths, entries))
    }

    fn from_parts(widths: Vec<usize>, entries: Vec<T>) -> Self {
        let mut strides = vec![1; widths.len()];
        for axis in (0..widths.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * widths[axis + 1];
        }

        debug_assert_eq!(entries.len(), widths.iter().product::<usize>());

        Self {
            widths,
            strides,
            entries,
        }
    }

    /// Returns the widths of the axes.
    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    /// Returns the number of axes.
    pub fn dimension(&self) -> usize {
        self.widths.len()
    }

    /// Returns the number of entries, which is the product of the widths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the array has no entries, which is never the case for
    /// a constructed array.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the entries in lexicographic order of their
    /// indices.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Returns the entries in lexicographic order of their indices.
    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }

    /// Returns an iterator over all indices of the array in lexicographic
    /// order.
    pub fn indices(&self) -> Indices {
        Indices::new(self.widths.clone())
    }

    fn offset(&self, index: &[usize]) -> Result<usize, ArrayError> {
        if index.len() != self.dimension() {
            return Err(ArrayError::DimensionMismatch {
                expected: self.dimension(),
                actual: index.len(),
            });
        }

        index
            .iter()
            .zip(&self.widths)
            .zip(&self.strides)
            .enumerate()
            .try_fold(0, |offset, (axis, ((&index, &width), &stride))| {
                if index >= width {
                    return Err(ArrayError::IndexOutOfRange { axis, index, width });
                }
                Ok(offset + index * stride)
            })
    }

    /// Returns a reference to the entry at `index`.
    pub fn get(&self, index: &[usize]) -> Result<&T, ArrayError> {
        let offset = self.offset(index)?;
        Ok(&self.entries[offset])
    }

    /// Returns a mutable reference to the entry at `index`.
    pub fn get_mut(&mut self, index: &[usize]) -> Result<&mut T, ArrayError> {
        let offset = self.offset(index)?;
        Ok(&mut self.entries[offset])
    }

    /// Replaces the entry at `index`.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<(), ArrayError> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Applies `f` to every entry.
    pub fn map<U, F>(&self, f: F) -> MultiDimensionalArray<U>
    where
        F: FnMut(&T) -> U,
    {
        MultiDimensionalArray {
            widths: self.widths.clone(),
            strides: self.strides.clone(),
            entries: self.entries.iter().map(f).collect(),
        }
    }

    /// Fallible version of [`map`](Self::map).
    pub fn try_map<U, F, E>(&self, f: F) -> Result<MultiDimensionalArray<U>, E>
    where
        F: FnMut(&T) -> Result<U, E>,
    {
        Ok(MultiDimensionalArray {
            widths: self.widths.clone(),
            strides: self.strides.clone(),
            entries: self.entries.iter().map(f).collect::<Result<_, E>>()?,
        })
    }

    /// Reduces the last axis, folding the cells along it through `f`.
    ///
    /// The result has one axis less than `self`.
    pub fn project<U, F>(&self, mut f: F) -> Result<MultiDimensionalArray<U>, ArrayError>
    where
        F: FnMut(&[T]) -> U,
    {
        self.try_project(|cells| Ok(f(cells)))
    }

    /// Fallible version of [`project`](Self::project).
    pub fn try_project<U, F, E>(&self, f: F) -> Result<MultiDimensionalArray<U>, E>
    where
        F: FnMut(&[T]) -> Result<U, E>,
        E: From<ArrayError>,
    {
        let Some((&last, widths)) = self.widths.split_last() else {
            return Err(ArrayError::NoAxes.into());
        };

        if widths.is_empty() {
            return Err(ArrayError::Projection.into());
        }

        let entries = self
            .entries
            .chunks(last)
            .map(f)
            .collect::<Result<Vec<_>, E>>()?;

        Ok(MultiDimensionalArray::from_parts(widths.to_vec(), entries))
    }

    /// Computes the tensor product of `self` and `other`.
    ///
    /// The result has dimension `self.dimension() + other.dimension()`, the
    /// entry at the concatenated index `(i, j)` is `op(self[i], other[j])`.
    pub fn tensor_product<U, V, F>(
        &self,
        other: &MultiDimensionalArray<U>,
        mut op: F,
    ) -> MultiDimensionalArray<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        let widths = self.widths.iter().chain(&other.widths).copied().collect();
        let entries = self
            .entries
            .iter()
            .flat_map(|a| other.entries.iter().map(move |b| (a, b)))
            .map(|(a, b)| op(a, b))
            .collect();

        MultiDimensionalArray::from_parts(widths, entries)
    }

    /// Fallible version of [`tensor_product`](Self::tensor_product).
    pub fn try_tensor_product<U, V, F, E>(
        &self,
        other: &MultiDimensionalArray<U>,
        mut op: F,
    ) -> Result<MultiDimensionalArray<V>, E>
    where
        F: FnMut(&T, &U) -> Result<V, E>,
    {
        let widths = self.widths.iter().chain(&other.widths).copied().collect();
        let entries = self
            .entries
            .iter()
            .flat_map(|a| other.entries.iter().map(move |b| (a, b)))
            .map(|(a, b)| op(a, b))
            .collect::<Result<Vec<_>, E>>()?;

        Ok(MultiDimensionalArray::from_parts(widths, entries))
    }

    /// Combines two arrays of the same shape entry by entry.
    pub fn zip_with<U, V, F>(
        &self,
        other: &MultiDimensionalArray<U>,
        mut f: F,
    ) -> Result<MultiDimensionalArray<V>, ArrayError>
    where
        F: FnMut(&T, &U) -> V,
    {
        self.try_zip_with(other, |a, b| Ok(f(a, b)))
    }

    /// Fallible version of [`zip_with`](Self::zip_with).
    pub fn try_zip_with<U, V, F, E>(
        &self,
        other: &MultiDimensionalArray<U>,
        mut f: F,
    ) -> Result<MultiDimensionalArray<V>, E>
    where
        F: FnMut(&T, &U) -> Result<V, E>,
        E: From<ArrayError>,
    {
        if self.widths != other.widths {
            return Err(ArrayError::ShapeMismatch {
                expected: self.widths.clone(),
                actual: other.widths.clone(),
            }
            .into());
        }

        let entries = self
            .entries
            .iter()
            .zip(&other.entries)
            .map(|(a, b)| f(a, b))
            .collect::<Result<Vec<_>, E>>()?;

        Ok(MultiDimensionalArray::from_parts(
            self.widths.clone(),
            entries,
        ))
    }

    /// Calls `f` with every index and its entry, in lexicographic order.
    pub fn for_each_with_indices<F>(&self, mut f: F)
    where
        F: FnMut(&[usize], &T),
    {
        for (index, entry) in self.indices().zip(&self.entries) {
            f(&index, entry);
        }
    }
}

impl<T> IntoIterator for MultiDimensionalArray<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a MultiDimensionalArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn check_widths(widths: &[usize]) -> Result<(), ArrayError> {
    if widths.is_empty() {
        return Err(ArrayError::NoAxes);
    }

    if let Some(axis) = widths.iter().position(|&width| width == 0) {
        return Err(ArrayError::ZeroWidth { axis });
    }

    Ok(())
}

/// Iterator over the indices of an array in lexicographic order, the first
/// axis varying slowest.
///
/// Returned by [`MultiDimensionalArray::indices`].
#[derive(Debug, Clone)]
pub struct Indices {
    widths: Vec<usize>,
    next: Option<Vec<usize>>,
    remaining: usize,
}

impl Indices {
    fn new(widths: Vec<usize>) -> Self {
        let remaining = if widths.is_empty() {
            0
        } else {
            widths.iter().product()
        };
        let next = (remaining > 0).then(|| vec![0; widths.len()]);

        Self {
            widths,
            next,
            remaining,
        }
    }
}

impl Iterator for Indices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.remaining -= 1;

        let mut next = current.clone();
        for axis in (0..next.len()).rev() {
            next[axis] += 1;
            if next[axis] < self.widths[axis] {
                self.next = Some(next);
                break;
            }
            next[axis] = 0;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Indices {}

impl FusedIterator for Indices {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;

    #[rstest]
    #[case(vec![4])]
    #[case(vec![2, 3])]
    #[case(vec![3, 1, 5])]
    #[case(vec![2, 2, 2, 2])]
    fn test_array_size(#[case] widths: Vec<usize>) {
        let array = MultiDimensionalArray::build(widths.clone(), |_| 0u8).unwrap();

        assert_eq!(array.len(), widths.iter().product::<usize>());
        assert_eq!(array.dimension(), widths.len());
        assert_eq!(array.widths(), widths.as_slice());
        assert_eq!(array.indices().len(), array.len());
    }

    #[test]
    fn test_array_invalid_widths() {
        assert_eq!(
            MultiDimensionalArray::build(Vec::new(), |_| 0u8).unwrap_err(),
            ArrayError::NoAxes
        );
        assert_eq!(
            MultiDimensionalArray::build(vec![2, 0], |_| 0u8).unwrap_err(),
            ArrayError::ZeroWidth { axis: 1 }
        );
        assert_eq!(
            MultiDimensionalArray::<u8>::from_vec(vec![]).unwrap_err(),
            ArrayError::ZeroWidth { axis: 0 }
        );
    }

    #[test]
    fn test_array_build_order() {
        let mut calls = Vec::new();
        let array = MultiDimensionalArray::build(vec![2, 3], |index| {
            calls.push(index.to_vec());
            index[0] * 10 + index[1]
        })
        .unwrap();

        assert_eq!(
            calls,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
        assert_eq!(array.into_entries(), vec![0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn test_array_get_set() {
        let mut array = MultiDimensionalArray::build(vec![2, 3, 4], |_| 0usize).unwrap();

        array.set(&[1, 2, 3], 7).unwrap();
        *array.get_mut(&[0, 1, 0]).unwrap() = 5;

        assert_eq!(*array.get(&[1, 2, 3]).unwrap(), 7);
        assert_eq!(*array.get(&[0, 1, 0]).unwrap(), 5);
        assert_eq!(*array.get(&[0, 0, 0]).unwrap(), 0);
        assert_eq!(array.iter().sum::<usize>(), 12);

        assert_eq!(
            array.get(&[1, 2]).unwrap_err(),
            ArrayError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(
            array.set(&[0, 3, 0], 1).unwrap_err(),
            ArrayError::IndexOutOfRange {
                axis: 1,
                index: 3,
                width: 3
            }
        );
    }

    #[test]
    fn test_array_build_1d() {
        let array = MultiDimensionalArray::build_1d(4, |i| i * i).unwrap();

        assert_eq!(array.widths(), &[4]);
        assert_eq!(*array.get(&[3]).unwrap(), 9);
    }

    #[test]
    fn test_array_map() {
        let array = MultiDimensionalArray::build(vec![2, 2], |index| index[0] + index[1]).unwrap();
        let mapped = array.map(|x| x * 2);

        assert_eq!(mapped.widths(), array.widths());
        assert_eq!(mapped.into_entries(), vec![0, 2, 2, 4]);

        let err = array
            .try_map(|&x| if x > 1 { Err("too large") } else { Ok(x) })
            .unwrap_err();
        assert_eq!(err, "too large");
    }

    #[test]
    fn test_array_project() {
        let array =
            MultiDimensionalArray::build(vec![2, 3, 4], |index| index[0] * 100 + index[1] * 10 + index[2])
                .unwrap();

        let projected = array.project(|cells| cells.iter().sum::<usize>()).unwrap();

        assert_eq!(projected.widths(), &[2, 3]);
        for index in projected.indices() {
            let expected: usize = (0..4)
                .map(|k| *array.get(&[index[0], index[1], k]).unwrap())
                .sum();
            assert_eq!(*projected.get(&index).unwrap(), expected);
        }

        let flat = MultiDimensionalArray::from_vec(vec![1, 2, 3]).unwrap();
        assert_eq!(
            flat.project(|cells| cells.len()).unwrap_err(),
            ArrayError::Projection
        );
    }

    #[test]
    fn test_array_tensor_product() {
        let a = MultiDimensionalArray::from_vec(vec![1, 2]).unwrap();
        let b = MultiDimensionalArray::build(vec![2, 3], |index| index[0] * 3 + index[1]).unwrap();

        let product = a.tensor_product(&b, |x, y| x * y);

        assert_eq!(product.widths(), &[2, 2, 3]);
        for index in product.indices() {
            let expected = a.get(&index[..1]).unwrap() * b.get(&index[1..]).unwrap();
            assert_eq!(*product.get(&index).unwrap(), expected);
        }
    }

    #[test]
    fn test_array_zip_with() {
        let a = MultiDimensionalArray::build(vec![2, 2], |index| index[0]).unwrap();
        let b = MultiDimensionalArray::build(vec![2, 2], |index| index[1]).unwrap();

        let sum = a.zip_with(&b, |x, y| x + y).unwrap();
        assert_eq!(sum.into_entries(), vec![0, 1, 1, 2]);

        let c = MultiDimensionalArray::from_vec(vec![0, 0, 0, 0]).unwrap();
        assert!(matches!(
            a.zip_with(&c, |x, y| x + y),
            Err(ArrayError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_indices_lexicographic_and_restartable() {
        let array = MultiDimensionalArray::build(vec![2, 1, 3], |_| ()).unwrap();

        let indices: Vec<_> = array.indices().collect();
        assert_eq!(
            indices,
            vec![
                vec![0, 0, 0],
                vec![0, 0, 1],
                vec![0, 0, 2],
                vec![1, 0, 0],
                vec![1, 0, 1],
                vec![1, 0, 2]
            ]
        );
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));

        let mut iter = array.indices();
        assert_eq!(iter.by_ref().count(), 6);
        assert_eq!(iter.next(), None);
        assert_eq!(array.indices().count(), 6);
    }

    #[test]
    fn test_for_each_with_indices() {
        let array = MultiDimensionalArray::build(vec![3, 2], |index| index.to_vec()).unwrap();

        let mut visited = 0;
        array.for_each_with_indices(|index, entry| {
            assert_eq!(index, entry.as_slice());
            visited += 1;
        });

        assert_eq!(visited, array.len());
    }
}
