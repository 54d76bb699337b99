use std::io::{BufRead, BufReader, Read};

use crate::decoder::{Decoder, ReadResult};
use crate::error::{Error, Result};
use crate::row::Row;
use crate::session::SessionBuilder;
use crate::utils::BomStripper;

/// A streaming reader pulling raw rows from a byte source, one at a time.
///
/// A leading UTF-8 BOM is skipped. Rows are not bound to anything, which makes
/// this reader useful to inspect data before declaring a record shape.
pub struct RowReader<R> {
    buffer: BufReader<R>,
    decoder: Decoder,
    bom: BomStripper,
    replay: &'static [u8],
    offset: u64,
    done: bool,
}

impl<R: Read> RowReader<R> {
    pub(crate) fn new(buffer: BufReader<R>, decoder: Decoder) -> Self {
        Self {
            buffer,
            decoder,
            bom: BomStripper::default(),
            replay: b"",
            offset: 0,
            done: false,
        }
    }

    /// Create a new [`RowReader`] with default configuration.
    pub fn from_reader(reader: R) -> Self {
        SessionBuilder::new().row_reader(reader)
    }

    /// Number of bytes consumed from the source so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Number of rows read so far.
    #[inline]
    pub fn rows(&self) -> u64 {
        self.decoder.rows()
    }

    /// Read the next row into `row`, returning `false` when the stream is
    /// exhausted.
    pub fn read_row(&mut self, row: &mut Row) -> Result<bool> {
        loop {
            if !self.replay.is_empty() {
                let (result, pos) = self.decoder.read_row(self.replay, row);

                self.replay = &self.replay[pos..];

                if let ReadResult::Row = result {
                    return Ok(true);
                }

                continue;
            }

            if self.done {
                return Ok(false);
            }

            let input = self
                .buffer
                .fill_buf()
                .map_err(|err| Error::from(err).at_byte(self.offset))?;

            if input.is_empty() {
                let tail = self.bom.finish();

                if !tail.is_empty() {
                    self.replay = tail;
                    continue;
                }

                self.done = true;

                return Ok(self.decoder.flush(row));
            }

            let (replay, skip) = self.bom.strip(input);

            if skip > 0 || !replay.is_empty() {
                self.buffer.consume(skip);
                self.offset += skip as u64;
                self.replay = replay;
                continue;
            }

            let (result, pos) = self.decoder.read_row(input, row);

            self.buffer.consume(pos);
            self.offset += pos as u64;

            if let ReadResult::Row = result {
                return Ok(true);
            }
        }
    }

    pub fn rows_iter(&mut self) -> RowsIter<'_, R> {
        RowsIter {
            reader: self,
            row: Row::new(),
        }
    }

    pub fn into_rows(self) -> RowsIntoIter<R> {
        RowsIntoIter {
            reader: self,
            row: Row::new(),
        }
    }
}

pub struct RowsIter<'r, R> {
    reader: &'r mut RowReader<R>,
    row: Row,
}

impl<R: Read> Iterator for RowsIter<'_, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_row(&mut self.row) {
            Err(err) => Some(Err(err)),
            Ok(true) => Some(Ok(self.row.clone())),
            Ok(false) => None,
        }
    }
}

pub struct RowsIntoIter<R> {
    reader: RowReader<R>,
    row: Row,
}

impl<R: Read> Iterator for RowsIntoIter<R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_row(&mut self.row) {
            Err(err) => Some(Err(err)),
            Ok(true) => Some(Ok(self.row.clone())),
            Ok(false) => None,
        }
    }
}
