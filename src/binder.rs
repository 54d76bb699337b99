use crate::error::{Error, ErrorKind, Result};
use crate::resolver::ColumnPositions;
use crate::row::Row;
use crate::schema::{Bindings, ColumnSpec, ColumnarRecord, Destination};

/// Appends the cells of decoded rows to the destination buffers of a record
/// shape.
///
/// Rows can be ragged: a column whose position lies out of a row's bounds, or
/// that was not found in the header, is skipped for that row.
///
/// A failed conversion leaves the buffers in whatever state they were in, i.e.
/// possibly holding values from earlier cells of the faulty row.
pub struct Binder<'a> {
    specs: Vec<ColumnSpec>,
    destinations: Vec<&'a mut dyn Destination>,
    positions: ColumnPositions,
    rows: u64,
}

impl<'a> Binder<'a> {
    /// Collect and validate the columns declared by `record`.
    ///
    /// Columns are bound positionally until [`Self::resolve_header`] is
    /// called.
    pub fn new<T: ColumnarRecord + ?Sized>(record: &'a mut T) -> Result<Self> {
        let mut bindings = Bindings::new();
        record.bind(&mut bindings);

        let (specs, destinations) = bindings.into_parts()?;
        let positions = ColumnPositions::positional(&specs);

        Ok(Self {
            specs,
            destinations,
            positions,
            rows: 0,
        })
    }

    pub fn specs(&self) -> &[ColumnSpec] {
        &self.specs
    }

    pub fn positions(&self) -> &ColumnPositions {
        &self.positions
    }

    /// Number of rows bound so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Resolve column positions by name against given header row.
    pub fn resolve_header(&mut self, header: &Row) {
        self.positions = ColumnPositions::from_header(&self.specs, header);
    }

    pub(crate) fn into_positions(self) -> ColumnPositions {
        self.positions
    }

    /// Convert the cells of a data row and append them to their destination
    /// buffers.
    pub fn bind_row(&mut self, row: &Row) -> Result<()> {
        for (i, destination) in self.destinations.iter_mut().enumerate() {
            let Some(column) = self.positions.get(i) else {
                continue;
            };

            let Some(cell) = row.get(column) else {
                continue;
            };

            if !destination.append(cell) {
                let spec = &self.specs[i];

                return Err(Error::new(ErrorKind::Conversion {
                    row: self.rows,
                    column,
                    field: spec.field.clone(),
                    expected: spec.element_type,
                    value: String::from_utf8_lossy(cell).into_owned(),
                }));
            }
        }

        self.rows += 1;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{ElementType, Table};

    use super::*;

    #[derive(Default)]
    struct Person {
        name: Vec<String>,
        age: Vec<i64>,
        height: Vec<f32>,
    }

    impl ColumnarRecord for Person {
        fn bind<'a>(&'a mut self, bindings: &mut Bindings<'a>) {
            bindings
                .positional("name", &mut self.name)
                .positional("age", &mut self.age)
                .positional("height", &mut self.height);
        }
    }

    #[test]
    fn test_positional_binding() -> Result<()> {
        let mut person = Person::default();
        let mut binder = Binder::new(&mut person)?;

        binder.bind_row(&row!["x", "42", "1.75"])?;
        binder.bind_row(&row!["y", "-3", "2e0"])?;
        assert_eq!(binder.rows(), 2);

        assert_eq!(person.name, vec!["x", "y"]);
        assert_eq!(person.age, vec![42, -3]);
        assert_eq!(person.height, vec![1.75, 2.0]);

        Ok(())
    }

    #[test]
    fn test_ragged_rows() -> Result<()> {
        let mut person = Person::default();
        let mut binder = Binder::new(&mut person)?;

        binder.bind_row(&row!["x", "42"])?;
        binder.bind_row(&row![])?;
        binder.bind_row(&row!["y", "7", "1.5", "extra"])?;

        assert_eq!(person.name, vec!["x", "y"]);
        assert_eq!(person.age, vec![42, 7]);
        assert_eq!(person.height, vec![1.5]);

        Ok(())
    }

    #[test]
    fn test_conversion_error() -> Result<()> {
        let mut person = Person::default();
        let mut binder = Binder::new(&mut person)?;

        binder.bind_row(&row!["x", "42"])?;

        let err = binder.bind_row(&row!["x", "notanumber"]).unwrap_err();

        match err.kind() {
            ErrorKind::Conversion {
                row,
                column,
                field,
                expected,
                value,
            } => {
                assert_eq!(*row, 1);
                assert_eq!(*column, 1);
                assert_eq!(field, "age");
                assert_eq!(*expected, ElementType::Int);
                assert_eq!(value, "notanumber");
            }
            kind => panic!("unexpected error kind: {:?}", kind),
        }

        // No rollback of cells appended before the faulty one
        assert_eq!(person.name, vec!["x", "x"]);
        assert_eq!(person.age, vec![42]);

        Ok(())
    }

    #[test]
    fn test_header_resolution() -> Result<()> {
        let mut table = Table::parse(["name:string:name", "id:int:id", "mail:string:email"])?;
        let mut binder = Binder::new(&mut table)?;

        binder.resolve_header(&row!["id", "name"]);
        assert_eq!(binder.positions().unresolved(), 1);

        binder.bind_row(&row!["1", "alice"])?;

        assert_eq!(table.get("id").and_then(|c| c.as_ints()), Some(&[1][..]));
        assert_eq!(
            table.get("name").and_then(|c| c.as_strings()),
            Some(&["alice".to_string()][..])
        );
        assert!(table.get("mail").unwrap().is_empty());

        Ok(())
    }
}
