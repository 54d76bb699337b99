use std::fmt;
use std::slice;
use std::str;

use crate::debug;

/// An owned row of decoded CSV fields.
///
/// Fields are stored contiguously in a single byte buffer, alongside their
/// bounds, so that decoding a row amortizes allocations.
#[derive(Default, Clone, Eq)]
pub struct Row {
    data: Vec<u8>,
    bounds: Vec<(usize, usize)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fields of the row.
    #[inline]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
        self.bounds.clear();
    }

    /// Returns the underlying bytes of all fields, concatenated.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn iter(&self) -> RowIter<'_> {
        RowIter {
            data: &self.data,
            bounds: self.bounds.iter(),
        }
    }

    #[inline(always)]
    pub fn push_field(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);

        let start = self.bounds.last().map(|(_, end)| *end).unwrap_or(0);

        self.bounds.push((start, self.data.len()));
    }

    /// Returns the nth field of the row, if it is not out-of-bounds.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.bounds
            .get(index)
            .copied()
            .map(|(start, end)| &self.data[start..end])
    }

    /// Returns the nth field of the row as a string slice, if it is not
    /// out-of-bounds and is valid UTF-8.
    #[inline]
    pub fn get_str(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|cell| str::from_utf8(cell).ok())
    }

    /// Returns the fields of the row as owned strings, replacing invalid UTF-8
    /// sequences.
    pub fn to_string_lossy(&self) -> Vec<String> {
        self.iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect()
    }

    #[inline(always)]
    pub(crate) fn extend_from_slice(&mut self, slice: &[u8]) {
        self.data.extend_from_slice(slice);
    }

    #[inline(always)]
    pub(crate) fn push_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    // Closes the field made of the bytes written since the last closed field.
    #[inline]
    pub(crate) fn finalize_field(&mut self) {
        let start = self.bounds.last().map(|(_, end)| *end).unwrap_or(0);

        self.bounds.push((start, self.data.len()));
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: AsRef<[u8]>> Extend<T> for Row {
    #[inline]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        iter.into_iter()
            .for_each(|field| self.push_field(field.as_ref()));
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for Row {
    #[inline]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut row = Self::new();
        row.extend(iter);
        row
    }
}

impl<'r> IntoIterator for &'r Row {
    type IntoIter = RowIter<'r>;
    type Item = &'r [u8];

    #[inline]
    fn into_iter(self) -> RowIter<'r> {
        self.iter()
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Row")
            .field(&debug::Fields(self.iter()))
            .finish()
    }
}

/// Iterator over the fields of a [`Row`].
#[derive(Clone)]
pub struct RowIter<'a> {
    data: &'a [u8],
    bounds: slice::Iter<'a, (usize, usize)>,
}

impl<'a> Iterator for RowIter<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;

        self.bounds.next().map(|&(start, end)| &data[start..end])
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bounds.size_hint()
    }
}

impl ExactSizeIterator for RowIter<'_> {}

impl DoubleEndedIterator for RowIter<'_> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        let data = self.data;

        self.bounds.next_back().map(|&(start, end)| &data[start..end])
    }
}
