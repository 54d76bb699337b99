use std::collections::HashSet;
use std::fmt;
use std::str;

use crate::error::{Error, ErrorKind, Result};

/// Element type of a destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    String,
    Int,
    Float32,
    Float64,
}

impl ElementType {
    /// Parse a textual type tag such as `int` or `f64`.
    ///
    /// Returns `None` for tags naming a type that cannot be bound.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "string" | "str" | "text" => Self::String,
            "int" | "integer" | "i64" => Self::Int,
            "float32" | "f32" => Self::Float32,
            "float64" | "f64" | "float" | "double" => Self::Float64,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type that destination buffers can hold.
///
/// Only [`String`], [`i64`], [`f32`] and [`f64`] implement it, so that a
/// record shape declaring any other element type does not compile.
pub trait Element: Sized {
    const TYPE: ElementType;

    /// Convert a cell, returning `None` if it is malformed.
    fn parse_cell(cell: &[u8]) -> Option<Self>;
}

impl Element for String {
    const TYPE: ElementType = ElementType::String;

    #[inline]
    fn parse_cell(cell: &[u8]) -> Option<Self> {
        str::from_utf8(cell).ok().map(str::to_owned)
    }
}

macro_rules! impl_parsed_element {
    ($ty:ty, $element_type:expr) => {
        impl Element for $ty {
            const TYPE: ElementType = $element_type;

            #[inline]
            fn parse_cell(cell: &[u8]) -> Option<Self> {
                str::from_utf8(cell).ok()?.parse().ok()
            }
        }
    };
}

impl_parsed_element!(i64, ElementType::Int);
impl_parsed_element!(f32, ElementType::Float32);
impl_parsed_element!(f64, ElementType::Float64);

/// A type-erased, append-only destination buffer.
pub(crate) trait Destination {
    fn element_type(&self) -> ElementType;

    /// Convert and append a cell, returning whether it succeeded.
    fn append(&mut self, cell: &[u8]) -> bool;
}

impl<T: Element> Destination for Vec<T> {
    #[inline]
    fn element_type(&self) -> ElementType {
        T::TYPE
    }

    #[inline]
    fn append(&mut self, cell: &[u8]) -> bool {
        match T::parse_cell(cell) {
            Some(value) => {
                self.push(value);
                true
            }
            None => false,
        }
    }
}

/// Declaration of one destination column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Destination field identifier
    pub field: String,
    /// Header column name, if the field is to be bound by name
    pub column: Option<String>,
    pub element_type: ElementType,
}

impl ColumnSpec {
    pub fn new(field: &str, element_type: ElementType) -> Self {
        Self {
            field: field.to_string(),
            column: None,
            element_type,
        }
    }

    /// Bind the field to the header column with given name.
    pub fn with_column(mut self, column: &str) -> Self {
        self.column = Some(column.to_string());
        self
    }

    /// Parse a specification of the form `field:type[:column]`.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.splitn(3, ':');

        let (field, tag) = match (parts.next(), parts.next()) {
            (Some(field), Some(tag)) if !field.is_empty() => (field, tag),
            _ => {
                return Err(Error::new(ErrorKind::InvalidSpec {
                    spec: spec.to_string(),
                }))
            }
        };

        let element_type = ElementType::from_tag(tag).ok_or_else(|| {
            Error::new(ErrorKind::UnsupportedType {
                field: field.to_string(),
                tag: tag.to_string(),
            })
        })?;

        let spec = Self::new(field, element_type);

        Ok(match parts.next() {
            Some(column) if !column.is_empty() => spec.with_column(column),
            _ => spec,
        })
    }
}

/// The set of columns declared by a record shape, along with their
/// destination buffers.
///
/// Columns are kept in declaration order, which is also the order used for
/// positional binding.
pub struct Bindings<'a> {
    specs: Vec<ColumnSpec>,
    destinations: Vec<&'a mut dyn Destination>,
    seen: HashSet<String>,
    error: Option<Error>,
}

impl Default for Bindings<'_> {
    fn default() -> Self {
        Self {
            specs: Vec::new(),
            destinations: Vec::new(),
            seen: HashSet::new(),
            error: None,
        }
    }
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a column appending to `buffer`, bound to the header column
    /// named `column` if any, else to its declaration position.
    pub fn column<T: Element>(
        &mut self,
        field: &str,
        column: Option<&str>,
        buffer: &'a mut Vec<T>,
    ) -> &mut Self {
        let mut spec = ColumnSpec::new(field, T::TYPE);
        spec.column = column.map(str::to_string);

        self.push(spec, buffer);
        self
    }

    /// Declare a column bound by header name.
    pub fn named<T: Element>(
        &mut self,
        field: &str,
        column: &str,
        buffer: &'a mut Vec<T>,
    ) -> &mut Self {
        self.column(field, Some(column), buffer)
    }

    /// Declare a column bound by declaration position.
    pub fn positional<T: Element>(
        &mut self,
        field: &str,
        buffer: &'a mut Vec<T>,
    ) -> &mut Self {
        self.column(field, None, buffer)
    }

    pub(crate) fn push(&mut self, spec: ColumnSpec, destination: &'a mut dyn Destination) {
        debug_assert_eq!(spec.element_type, destination.element_type());

        if self.error.is_none() && !self.seen.insert(spec.field.clone()) {
            self.error = Some(Error::new(ErrorKind::DuplicateField {
                field: spec.field.clone(),
            }));
        }

        self.specs.push(spec);
        self.destinations.push(destination);
    }

    /// Declared column specs, in declaration order.
    pub fn specs(&self) -> &[ColumnSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub(crate) fn into_parts(self) -> Result<(Vec<ColumnSpec>, Vec<&'a mut dyn Destination>)> {
        match self.error {
            Some(err) => Err(err),
            None => Ok((self.specs, self.destinations)),
        }
    }
}

/// A caller-supplied record shape: a set of destination buffers that decoded
/// rows are bound to.
///
/// Implement it by hand or through the [`columnar!`](crate::columnar) macro.
pub trait ColumnarRecord {
    fn bind<'a>(&'a mut self, bindings: &mut Bindings<'a>);
}

/// A typed destination buffer whose element type is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    String(Vec<String>),
    Int(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl Column {
    pub fn new(element_type: ElementType) -> Self {
        match element_type {
            ElementType::String => Self::String(Vec::new()),
            ElementType::Int => Self::Int(Vec::new()),
            ElementType::Float32 => Self::Float32(Vec::new()),
            ElementType::Float64 => Self::Float64(Vec::new()),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::String(_) => ElementType::String,
            Self::Int(_) => ElementType::Int,
            Self::Float32(_) => ElementType::Float32,
            Self::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::String(values) => values.len(),
            Self::Int(values) => values.len(),
            Self::Float32(values) => values.len(),
            Self::Float64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::String(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Self::Int(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_float32s(&self) -> Option<&[f32]> {
        match self {
            Self::Float32(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_float64s(&self) -> Option<&[f64]> {
        match self {
            Self::Float64(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    fn destination(&mut self) -> &mut dyn Destination {
        match self {
            Self::String(values) => values,
            Self::Int(values) => values,
            Self::Float32(values) => values,
            Self::Float64(values) => values,
        }
    }
}

/// A record shape declared at runtime, e.g. from command line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    specs: Vec<ColumnSpec>,
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table from column specs.
    ///
    /// Fails if a destination field is declared twice.
    pub fn new(specs: Vec<ColumnSpec>) -> Result<Self> {
        let mut seen = HashSet::new();

        for spec in specs.iter() {
            if !seen.insert(spec.field.as_str()) {
                return Err(Error::new(ErrorKind::DuplicateField {
                    field: spec.field.clone(),
                }));
            }
        }

        let columns = specs.iter().map(|spec| Column::new(spec.element_type)).collect();

        Ok(Self { specs, columns })
    }

    /// Create an empty table from textual specs, as parsed by
    /// [`ColumnSpec::parse`].
    pub fn parse<I, S>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = specs
            .into_iter()
            .map(|spec| ColumnSpec::parse(spec.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Self::new(specs)
    }

    pub fn specs(&self) -> &[ColumnSpec] {
        &self.specs
    }

    /// Return the column bound to given destination field.
    pub fn get(&self, field: &str) -> Option<&Column> {
        self.specs
            .iter()
            .position(|spec| spec.field == field)
            .map(|i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnSpec, &Column)> {
        self.specs.iter().zip(self.columns.iter())
    }

    pub fn into_columns(self) -> Vec<(ColumnSpec, Column)> {
        self.specs.into_iter().zip(self.columns).collect()
    }
}

impl ColumnarRecord for Table {
    fn bind<'a>(&'a mut self, bindings: &mut Bindings<'a>) {
        for (spec, column) in self.specs.iter().zip(self.columns.iter_mut()) {
            bindings.push(spec.clone(), column.destination());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_parsing() {
        assert_eq!(i64::parse_cell(b"-42"), Some(-42));
        assert_eq!(i64::parse_cell(b"+7"), Some(7));
        assert_eq!(i64::parse_cell(b"4.2"), None);
        assert_eq!(i64::parse_cell(b" 1"), None);
        assert_eq!(i64::parse_cell(b""), None);
        assert_eq!(f64::parse_cell(b"1.5e3"), Some(1500.0));
        assert_eq!(f32::parse_cell(b"-0.25"), Some(-0.25));
        assert_eq!(f64::parse_cell(b"one"), None);
        assert_eq!(String::parse_cell(b"caf\xc3\xa9"), Some("café".to_string()));
        assert_eq!(String::parse_cell(b"caf\xe9"), None);
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            ColumnSpec::parse("id:int").unwrap(),
            ColumnSpec::new("id", ElementType::Int)
        );
        assert_eq!(
            ColumnSpec::parse("name:string:firstname").unwrap(),
            ColumnSpec::new("name", ElementType::String).with_column("firstname")
        );

        let err = ColumnSpec::parse("flag:bool").unwrap_err();
        assert!(err.is_structural_error());
        assert!(matches!(err.kind(), ErrorKind::UnsupportedType { tag, .. } if tag == "bool"));

        assert!(matches!(
            ColumnSpec::parse("nocolon").unwrap_err().kind(),
            ErrorKind::InvalidSpec { .. }
        ));
    }

    #[test]
    fn test_table() {
        let table = Table::parse(["id:int:id", "score:f32"]).unwrap();

        assert_eq!(table.specs().len(), 2);
        assert_eq!(table.get("id"), Some(&Column::Int(vec![])));
        assert_eq!(table.get("score").map(Column::element_type), Some(ElementType::Float32));
        assert_eq!(table.get("missing"), None);

        let err = Table::parse(["id:int", "id:string"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::DuplicateField { field } if field == "id"));
    }

    #[test]
    fn test_bindings() {
        let mut ids: Vec<i64> = Vec::new();
        let mut names: Vec<String> = Vec::new();

        let mut bindings = Bindings::new();
        bindings
            .named("id", "identifier", &mut ids)
            .positional("name", &mut names);

        assert_eq!(
            bindings.specs(),
            &[
                ColumnSpec::new("id", ElementType::Int).with_column("identifier"),
                ColumnSpec::new("name", ElementType::String),
            ]
        );

        let (_, mut destinations) = bindings.into_parts().unwrap();

        assert!(destinations[0].append(b"12"));
        assert!(!destinations[0].append(b"twelve"));
        assert!(destinations[1].append(b"john"));

        drop(destinations);

        assert_eq!(ids, vec![12]);
        assert_eq!(names, vec!["john".to_string()]);
    }

    #[test]
    fn test_duplicate_bindings() {
        let mut first: Vec<i64> = Vec::new();
        let mut second: Vec<f64> = Vec::new();

        let mut bindings = Bindings::new();
        bindings.positional("x", &mut first).positional("x", &mut second);

        let err = bindings.into_parts().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::DuplicateField { field } if field == "x"));
    }
}
