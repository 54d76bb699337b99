use tracing::debug;

use crate::row::Row;
use crate::schema::ColumnSpec;

/// Resolved position, in decoded rows, of every declared column.
///
/// There is exactly one entry per column spec, in declaration order. A column
/// that could not be found in the header is explicitly absent and will never
/// be populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPositions {
    positions: Vec<Option<usize>>,
}

impl ColumnPositions {
    /// Map the column declared at position `i` to row index `i`.
    pub fn positional(specs: &[ColumnSpec]) -> Self {
        Self {
            positions: (0..specs.len()).map(Some).collect(),
        }
    }

    /// Map named columns to the index of the first header field having the
    /// same name. Unnamed columns are mapped positionally.
    pub fn from_header(specs: &[ColumnSpec], header: &Row) -> Self {
        let positions = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| match spec.column {
                None => Some(i),
                Some(ref name) => {
                    let position = header.iter().position(|cell| cell == name.as_bytes());

                    if position.is_none() {
                        debug!(
                            field = %spec.field,
                            column = %name,
                            "unresolved column: not found in header, field will not be populated"
                        );
                    }

                    position
                }
            })
            .collect();

        Self { positions }
    }

    /// Row index of the column declared at position `i`, if resolved.
    #[inline]
    pub fn get(&self, i: usize) -> Option<usize> {
        self.positions.get(i).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of columns that are absent from the header.
    pub fn unresolved(&self) -> usize {
        self.positions.iter().filter(|p| p.is_none()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.positions.iter().copied()
    }
}
