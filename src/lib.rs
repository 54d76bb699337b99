/*!
The `columnar-csv` crate decodes streams of CSV data and binds their rows to
typed, column-oriented buffers.

Instead of materializing one struct per row, the caller declares a record
shape: a set of destination buffers (one `Vec` per column) that every decoded
row appends to. This makes the crate a good fit when CSV data is to be
analyzed column by column, or handed to some columnar storage afterwards.

# Examples

*Declaring a record shape and decoding a file*

```
use columnar_csv::{columnar, SessionBuilder};

columnar! {
    #[derive(Debug, Default)]
    struct People {
        id: i64 => "id",
        name: String => "name",
        height: f32 => "height",
    }
}

let mut people = People::default();

let summary = SessionBuilder::new()
    .has_header(true)
    .decode_path("people.csv", &mut people)?;

let mean = people.height.iter().sum::<f32>() / summary.rows as f32;

println!("{} rows, mean height {}", summary.rows, mean);
```

*Declaring a record shape at runtime*

```
use columnar_csv::{SessionBuilder, Table};

let mut table = Table::parse(["id:int:id", "score:f64:score"])?;

SessionBuilder::new()
    .has_header(true)
    .chunk_size(64 * (1 << 10))
    .decode_reader(std::io::stdin(), &mut table)?;

for (spec, column) in table.iter() {
    println!("{}: {} values", spec.field, column.len());
}
```

*Reading raw rows*

```
use std::fs::File;
use columnar_csv::{Row, RowReader};

let mut reader = RowReader::from_reader(File::open("data.csv")?);
let mut row = Row::new();

while reader.read_row(&mut row)? {
    dbg!(row.to_string_lossy());
}
```

# Decoding

Rows are produced by a [`Decoder`], an incremental state machine that can be
fed chunks of arbitrary size, down to a single byte. The rows it emits never
depend on how the input was chunked. Fields and quoted newlines may span as
many chunks as needed.

The decoder is deliberately lenient and never fails on malformed data:

- a quote only opens a quoted field at the very beginning of a field,
  elsewhere it is a literal byte.
- inside a quoted field, `""` stands for a literal quote.
- text found after a closing quote is appended to the same field, so that
  `"ab"cd` yields `abcd`.
- an unterminated quoted field runs until the end of the stream.
- an empty line yields an empty row, and a row ending with a delimiter has a
  trailing empty field.
- line terminators are single `\n` bytes. A `\r` is kept as field content.
- a leading UTF-8 BOM is skipped.

# Binding

Every record shape implements [`ColumnarRecord`], either through the
[`columnar!`] macro, by hand, or dynamically through a [`Table`].

Each column declares a destination field, an element type (one of
[`String`], [`i64`], [`f32`] or [`f64`]) and optionally the name of the header
column it must be bound to. When the session has a header, named columns are
resolved against it, whatever their order in the file. Otherwise, or for
unnamed columns, the nth declared column is bound to the nth field of every
row.

Rows can be ragged: a cell lying out of a row's bounds is skipped, and so is a
column whose name could not be found in the header. On the other hand, a cell
that cannot be converted to its column's element type aborts the session with
an error reporting its row and column.
*/
#[allow(unused_macros)]
macro_rules! row {
    () => {{
        $crate::row::Row::new()
    }};

    ($($x: expr),*) => {{
        let mut r = $crate::row::Row::new();

        $(
            r.push_field($x.as_bytes());
        )*

        r
    }};
}

/// Declare a record shape made of one `Vec` per column, and implement
/// [`ColumnarRecord`] for it.
///
/// Columns followed by `=> "name"` are bound to the header column with given
/// name. The others are bound by declaration position.
///
/// ```
/// columnar_csv::columnar! {
///     #[derive(Debug, Default)]
///     pub struct Measures {
///         pub station: String => "station_id",
///         pub value: f64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! columnar {
    (@column) => {
        None
    };

    (@column $column:literal) => {
        Some($column)
    };

    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field_vis:vis $field:ident : $ty:ty $(=> $column:literal)?),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($field_vis $field: Vec<$ty>,)*
        }

        impl $crate::ColumnarRecord for $name {
            fn bind<'a>(&'a mut self, bindings: &mut $crate::Bindings<'a>) {
                $(
                    bindings.column(
                        stringify!($field),
                        $crate::columnar!(@column $($column)?),
                        &mut self.$field,
                    );
                )*
            }
        }
    };
}

mod binder;
mod debug;
mod decoder;
mod error;
mod reader;
mod resolver;
mod row;
mod schema;
mod session;
mod utils;

pub use binder::Binder;
pub use decoder::{DecodeState, Decoder, DecoderBuilder, ReadResult, RowSink};
pub use error::{Error, ErrorKind, Result, Stage};
pub use reader::{RowReader, RowsIntoIter, RowsIter};
pub use resolver::ColumnPositions;
pub use row::{Row, RowIter};
pub use schema::{Bindings, Column, ColumnSpec, ColumnarRecord, Element, ElementType, Table};
pub use session::{DecodeSummary, SessionBuilder};
