use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::{debug, trace};

use crate::binder::Binder;
use crate::decoder::{Decoder, DecoderBuilder, RowSink};
use crate::error::{Error, Result};
use crate::reader::RowReader;
use crate::resolver::ColumnPositions;
use crate::row::Row;
use crate::schema::ColumnarRecord;
use crate::utils::BomStripper;

/// Outcome of a successful decode session.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeSummary {
    /// Number of data rows bound, header excluded
    pub rows: u64,
    /// Number of bytes read from the source
    pub bytes: u64,
    /// The header row, when the session was configured to have one and the
    /// input was not empty
    pub header: Option<Row>,
    /// Resolved position of every declared column
    pub positions: ColumnPositions,
}

/// Builds and runs decode sessions with given configuration.
///
/// Every call to one of the `decode_*` methods runs a new, independent
/// session: nothing is shared between them but this configuration.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    has_header: bool,
    chunk_size: usize,
    delimiter: u8,
    quote: u8,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            has_header: false,
            chunk_size: 8192,
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl SessionBuilder {
    /// Create a new [`SessionBuilder`] with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`SessionBuilder`] reading the source in chunks of
    /// `chunk_size` bytes.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        let mut builder = Self::default();
        builder.chunk_size(chunk_size);
        builder
    }

    /// Indicate whether the first row must be understood as a header, used to
    /// resolve named columns.
    ///
    /// Will default to `false`.
    pub fn has_header(&mut self, yes: bool) -> &mut Self {
        self.has_header = yes;
        self
    }

    /// Set the size of the chunks read from the source.
    ///
    /// Only impacts throughput, never the decoded rows. Will default to 8KiB.
    pub fn chunk_size(&mut self, chunk_size: usize) -> &mut Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the delimiter. Will default to a comma.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote char. Will default to a double quote.
    pub fn quote(&mut self, quote: u8) -> &mut Self {
        self.quote = quote;
        self
    }

    fn decoder(&self) -> Decoder {
        DecoderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .build()
    }

    /// Create a [`RowReader`] yielding raw rows from given reader.
    ///
    /// The header setting is ignored: every row is yielded.
    pub fn row_reader<R: Read>(&self, reader: R) -> RowReader<R> {
        RowReader::new(
            BufReader::with_capacity(self.chunk_size, reader),
            self.decoder(),
        )
    }

    /// Decode every row from `reader` into `sink`, header included, returning
    /// the number of bytes read.
    pub fn decode_rows<R, S>(&self, reader: R, sink: &mut S) -> Result<u64>
    where
        R: Read,
        S: RowSink + ?Sized,
    {
        let mut buffer = BufReader::with_capacity(self.chunk_size, reader);
        let mut decoder = self.decoder();
        let mut bom = BomStripper::default();
        let mut bytes: u64 = 0;

        loop {
            let input = buffer
                .fill_buf()
                .map_err(|err| Error::from(err).at_byte(bytes))?;

            let len = input.len();

            if len == 0 {
                break;
            }

            trace!(len, offset = bytes, "decoding chunk");

            let (replay, skip) = bom.strip(input);

            decoder.feed(replay, sink)?;
            decoder.feed(&input[skip..], sink)?;

            buffer.consume(len);
            bytes += len as u64;
        }

        decoder.feed(bom.finish(), sink)?;
        decoder.finish(sink)?;

        Ok(bytes)
    }

    /// Decode rows from `reader` and bind them to the buffers of `record`.
    ///
    /// If an error is returned, the buffers of `record` may have been
    /// partially filled and should not be relied upon.
    pub fn decode_reader<R, T>(&self, reader: R, record: &mut T) -> Result<DecodeSummary>
    where
        R: Read,
        T: ColumnarRecord + ?Sized,
    {
        let binder = Binder::new(record)?;

        debug!(
            has_header = self.has_header,
            chunk_size = self.chunk_size,
            columns = binder.specs().len(),
            "starting decode session"
        );

        let mut session = Session {
            has_header: self.has_header,
            header: None,
            binder,
        };

        let bytes = self.decode_rows(reader, &mut session)?;

        let summary = DecodeSummary {
            rows: session.binder.rows(),
            bytes,
            header: session.header,
            positions: session.binder.into_positions(),
        };

        debug!(rows = summary.rows, bytes = summary.bytes, "decode session done");

        Ok(summary)
    }

    /// Decode the file at `path`. See [`Self::decode_reader`].
    pub fn decode_path<P, T>(&self, path: P, record: &mut T) -> Result<DecodeSummary>
    where
        P: AsRef<Path>,
        T: ColumnarRecord + ?Sized,
    {
        let path = path.as_ref();

        debug!(path = %path.display(), "opening file");

        self.decode_reader(File::open(path)?, record)
    }

    /// Decode data already loaded in memory, or memory mapped. See
    /// [`Self::decode_reader`].
    pub fn decode_bytes<T>(&self, bytes: &[u8], record: &mut T) -> Result<DecodeSummary>
    where
        T: ColumnarRecord + ?Sized,
    {
        self.decode_reader(bytes, record)
    }
}

// Routes the first row to the header when required, then every other row to
// the binder.
struct Session<'a> {
    has_header: bool,
    header: Option<Row>,
    binder: Binder<'a>,
}

impl RowSink for Session<'_> {
    fn accept(&mut self, row: Row) -> Result<()> {
        if self.has_header && self.header.is_none() {
            self.binder.resolve_header(&row);
            self.header = Some(row);
            return Ok(());
        }

        self.binder.bind_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Write};

    use crate::error::{ErrorKind, Stage};
    use crate::schema::{Bindings, ColumnSpec, ElementType, Table};

    use super::*;

    columnar! {
        #[derive(Debug, Default)]
        struct Person {
            id: i64 => "id",
            name: String => "name",
        }
    }

    #[test]
    fn test_header_order_independence() -> Result<()> {
        let mut person = Person::default();

        let summary = SessionBuilder::new()
            .has_header(true)
            .decode_bytes(b"id,name\n1,alice\n2,bob\n", &mut person)?;

        assert_eq!(person.id, vec![1, 2]);
        assert_eq!(person.name, vec!["alice", "bob"]);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.bytes, 22);
        assert_eq!(summary.header, Some(row!["id", "name"]));

        let mut person = Person::default();

        SessionBuilder::new()
            .has_header(true)
            .decode_bytes(b"name,id\nalice,1\n", &mut person)?;

        assert_eq!(person.id, vec![1]);
        assert_eq!(person.name, vec!["alice"]);

        Ok(())
    }

    #[test]
    fn test_chunk_size_independence() -> Result<()> {
        let data = "\u{feff}id,\"full name\",score\n1,\"landy, the \"\"everlasting\"\"\",4.5\n2,\"multi\nline\",1e2\n3,rose,-0.5";

        let specs = ["id:int:id", "name:string:full name", "score:f64:score"];
        let mut expected = Table::parse(specs)?;

        SessionBuilder::new()
            .has_header(true)
            .decode_bytes(data.as_bytes(), &mut expected)?;

        assert_eq!(
            expected.get("name").and_then(|c| c.as_strings()).unwrap(),
            &["landy, the \"everlasting\"", "multi\nline", "rose"]
        );
        assert_eq!(
            expected.get("score").and_then(|c| c.as_float64s()).unwrap(),
            &[4.5, 100.0, -0.5]
        );

        for capacity in [32usize, 4, 3, 2, 1] {
            let mut table = Table::parse(specs)?;

            SessionBuilder::with_chunk_size(capacity)
                .has_header(true)
                .decode_reader(Cursor::new(data), &mut table)?;

            assert_eq!(table, expected, "capacity={}", capacity);
        }

        Ok(())
    }

    #[test]
    fn test_single_bom_is_skipped() -> Result<()> {
        let data = b"\xef\xbb\xbf\xef\xbb\xbfa\n";

        let mut from_bytes = Table::parse(["a:string"])?;
        let summary = SessionBuilder::new().decode_bytes(data, &mut from_bytes)?;

        assert_eq!(summary.bytes, 7);
        assert_eq!(
            from_bytes.get("a").and_then(|c| c.as_strings()).unwrap(),
            &["\u{feff}a"]
        );

        for capacity in [1024usize, 4, 3, 2, 1] {
            let mut from_reader = Table::parse(["a:string"])?;

            SessionBuilder::with_chunk_size(capacity)
                .decode_reader(Cursor::new(&data[..]), &mut from_reader)?;

            assert_eq!(from_reader, from_bytes, "capacity={}", capacity);
        }

        Ok(())
    }

    #[test]
    fn test_positional_mode() -> Result<()> {
        let mut table = Table::new(vec![
            ColumnSpec::new("label", ElementType::String),
            ColumnSpec::new("value", ElementType::Int),
        ])?;

        let summary = SessionBuilder::new().decode_bytes(b"x,42\ny,43", &mut table)?;

        assert_eq!(summary.rows, 2);
        assert_eq!(summary.header, None);
        assert_eq!(table.get("value").and_then(|c| c.as_ints()), Some(&[42, 43][..]));

        let mut table = Table::new(vec![
            ColumnSpec::new("label", ElementType::String),
            ColumnSpec::new("value", ElementType::Int),
        ])?;

        let err = SessionBuilder::new()
            .decode_bytes(b"x,42\nx,notanumber\nz,1\n", &mut table)
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Bind);
        assert!(matches!(err.kind(), ErrorKind::Conversion { row: 1, column: 1, .. }));

        // Decoding stopped at the faulty row
        assert_eq!(
            table.get("label").and_then(|c| c.as_strings()).unwrap(),
            &["x", "x"]
        );

        Ok(())
    }

    #[test]
    fn test_ragged_rows() -> Result<()> {
        let mut table = Table::parse(["a:string", "b:string", "c:string"])?;

        SessionBuilder::new().decode_bytes(b"1,2,3\n4,5\n6,7,8\n", &mut table)?;

        assert_eq!(table.get("a").map(|c| c.len()), Some(3));
        assert_eq!(table.get("b").map(|c| c.len()), Some(3));
        assert_eq!(table.get("c").and_then(|c| c.as_strings()).unwrap(), &["3", "8"]);

        Ok(())
    }

    #[test]
    fn test_unresolved_columns() -> Result<()> {
        columnar! {
            #[derive(Default)]
            struct Contact {
                id: i64 => "id",
                email: String => "email",
                phone: String => "phone",
            }
        }

        let mut contact = Contact::default();

        let summary = SessionBuilder::new()
            .has_header(true)
            .decode_bytes(b"email,id\njohn@example.com,1\n", &mut contact)?;

        assert_eq!(contact.id, vec![1]);
        assert_eq!(contact.email, vec!["john@example.com"]);
        assert!(contact.phone.is_empty());
        assert_eq!(
            summary.positions.iter().collect::<Vec<_>>(),
            vec![Some(1), Some(0), None]
        );

        Ok(())
    }

    #[test]
    fn test_empty_input() -> Result<()> {
        let mut person = Person::default();

        let summary = SessionBuilder::new()
            .has_header(true)
            .decode_bytes(b"", &mut person)?;

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.header, None);

        let summary = SessionBuilder::new()
            .has_header(true)
            .decode_bytes(b"id,name", &mut person)?;

        assert_eq!(summary.rows, 0);
        assert_eq!(summary.header, Some(row!["id", "name"]));
        assert!(person.id.is_empty());

        Ok(())
    }

    #[test]
    fn test_structural_error_before_reading() {
        struct Broken {
            a: Vec<i64>,
            b: Vec<String>,
        }

        impl ColumnarRecord for Broken {
            fn bind<'a>(&'a mut self, bindings: &mut Bindings<'a>) {
                bindings
                    .positional("same", &mut self.a)
                    .positional("same", &mut self.b);
            }
        }

        struct Unreadable;

        impl Read for Unreadable {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                panic!("source must not be read");
            }
        }

        let mut broken = Broken {
            a: Vec::new(),
            b: Vec::new(),
        };

        let err = SessionBuilder::new()
            .decode_reader(Unreadable, &mut broken)
            .unwrap_err();

        assert!(err.is_structural_error());
        assert_eq!(err.stage(), Stage::Resolve);
    }

    #[test]
    fn test_io_error() {
        struct Failing(usize);

        impl Read for Failing {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0 == 0 {
                    return Err(io::Error::new(io::ErrorKind::ConnectionReset, "closed"));
                }

                let n = self.0.min(buf.len());
                buf[..n].fill(b'a');
                self.0 -= n;

                Ok(n)
            }
        }

        let mut table = Table::parse(["a:string"]).unwrap();

        let err = SessionBuilder::with_chunk_size(4)
            .decode_reader(Failing(10), &mut table)
            .unwrap_err();

        assert!(err.is_io_error());
        assert!(matches!(err.kind(), ErrorKind::Io { byte: Some(10), .. }));
    }

    #[test]
    fn test_decode_path() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "id,name\n1,alice\n2,bob")?;
        file.flush()?;

        let mut person = Person::default();

        let summary = SessionBuilder::new()
            .has_header(true)
            .decode_path(file.path(), &mut person)?;

        assert_eq!(summary.rows, 2);
        assert_eq!(person.name, vec!["alice", "bob"]);

        let err = SessionBuilder::new()
            .decode_path(file.path().with_extension("missing"), &mut person)
            .unwrap_err();

        assert!(err.is_io_error());

        Ok(())
    }

    #[test]
    fn test_concurrent_sessions() {
        let builder = SessionBuilder::with_chunk_size(3);

        let handles = (0..4)
            .map(|i| {
                let builder = builder.clone();

                std::thread::spawn(move || {
                    let data = format!("{},x\n{},y\n", i, i + 1);
                    let mut table = Table::parse(["n:int", "s:string"]).unwrap();

                    builder.decode_bytes(data.as_bytes(), &mut table).unwrap();

                    table.get("n").and_then(|c| c.as_ints()).unwrap().to_vec()
                })
            })
            .collect::<Vec<_>>();

        for (i, handle) in handles.into_iter().enumerate() {
            let i = i as i64;
            assert_eq!(handle.join().unwrap(), vec![i, i + 1]);
        }
    }

    #[test]
    fn test_decode_rows() -> Result<()> {
        let mut rows: Vec<Row> = Vec::new();

        let bytes = SessionBuilder::with_chunk_size(2)
            .has_header(true)
            .decode_rows(Cursor::new("h\n1\n2"), &mut rows)?;

        assert_eq!(bytes, 5);
        assert_eq!(rows, vec![row!["h"], row!["1"], row!["2"]]);

        Ok(())
    }
}
