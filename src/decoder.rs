use std::mem;

use memchr::{memchr, memchr2};

use crate::error::Result;
use crate::row::Row;

/// Destination of the rows emitted by a [`Decoder`].
///
/// A sink is called exactly once per completed row, before the next byte is
/// processed. Returning an error aborts decoding.
pub trait RowSink {
    fn accept(&mut self, row: Row) -> Result<()>;
}

impl<F> RowSink for F
where
    F: FnMut(Row) -> Result<()>,
{
    #[inline]
    fn accept(&mut self, row: Row) -> Result<()> {
        self(row)
    }
}

impl RowSink for Vec<Row> {
    #[inline]
    fn accept(&mut self, row: Row) -> Result<()> {
        self.push(row);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ReadResult {
    InputEmpty,
    Row,
}

/// State of the [`Decoder`] between two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// At the beginning of a field, nothing buffered yet.
    Start,
    /// Inside an unquoted field, or in the trailing text of a quoted one.
    InField,
    /// Inside a field that started with a quote.
    InQuotedField,
}

/// Builds a [`Decoder`] with given configuration.
#[derive(Debug, Clone)]
pub struct DecoderBuilder {
    delimiter: u8,
    quote: u8,
}

impl Default for DecoderBuilder {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
        }
    }
}

impl DecoderBuilder {
    /// Create a new [`DecoderBuilder`] with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delimiter to be used by the created [`Decoder`].
    ///
    /// Will default to a comma.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote char to be used by the created [`Decoder`].
    ///
    /// Will default to a double quote.
    pub fn quote(&mut self, quote: u8) -> &mut Self {
        self.quote = quote;
        self
    }

    pub fn build(&self) -> Decoder {
        Decoder {
            delimiter: self.delimiter,
            quote: self.quote,
            state: DecodeState::Start,
            within_quotes: false,
            row: Row::new(),
            position: 0,
            rows: 0,
        }
    }
}

/// An incremental CSV decoder, fed one byte or one chunk at a time.
///
/// The decoder keeps no knowledge of chunk boundaries: a field, or even a
/// quoted newline, may span as many chunks as needed.
///
/// A quote only opens a quoted field at the very beginning of a field. Inside
/// a quoted field, doubled quotes stand for a single literal quote, and any
/// text found between a closing quote and the next delimiter is appended to
/// the same field, e.g. `"ab"cd,` yields `abcd`.
///
/// Line terminators are single `\n` bytes. A `\r` is just another byte.
pub struct Decoder {
    delimiter: u8,
    quote: u8,
    state: DecodeState,
    within_quotes: bool,
    row: Row,
    position: u64,
    rows: u64,
}

impl Default for Decoder {
    fn default() -> Self {
        DecoderBuilder::new().build()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the machine.
    #[inline]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Number of bytes processed so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of rows emitted so far.
    #[inline]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    // Returns whether a row was completed by this byte.
    #[inline]
    fn step(&mut self, byte: u8) -> bool {
        use DecodeState::*;

        match self.state {
            Start => {
                if byte == self.delimiter {
                    self.row.finalize_field();
                } else if byte == self.quote {
                    self.state = InQuotedField;
                    self.within_quotes = true;
                } else if byte == b'\n' {
                    // NOTE: a row ending with a delimiter has a trailing empty field
                    if !self.row.is_empty() {
                        self.row.finalize_field();
                    }

                    return true;
                } else {
                    self.row.push_byte(byte);
                    self.state = InField;
                }
            }
            InField => {
                if byte == self.delimiter {
                    self.row.finalize_field();
                    self.state = Start;
                } else if byte == b'\n' {
                    self.row.finalize_field();
                    self.state = Start;
                    return true;
                } else {
                    self.row.push_byte(byte);
                }
            }
            InQuotedField => {
                if self.within_quotes {
                    if byte == self.quote {
                        self.within_quotes = false;
                    } else {
                        self.row.push_byte(byte);
                    }
                } else if byte == self.quote {
                    // Doubled quote
                    self.within_quotes = true;
                    self.row.push_byte(byte);
                } else if byte == self.delimiter {
                    self.row.finalize_field();
                    self.state = Start;
                } else if byte == b'\n' {
                    self.row.finalize_field();
                    self.state = Start;
                    return true;
                } else {
                    self.row.push_byte(byte);
                    self.state = InField;
                }
            }
        }

        false
    }

    #[inline]
    fn emit_into(&mut self, row: &mut Row) {
        mem::swap(&mut self.row, row);
        self.row.clear();
        self.rows += 1;
    }

    /// Process a single byte, returning the row it completed, if any.
    pub fn push_byte(&mut self, byte: u8) -> Option<Row> {
        self.position += 1;

        if self.step(byte) {
            let mut row = Row::new();
            self.emit_into(&mut row);
            return Some(row);
        }

        None
    }

    /// Process bytes from `input` until a row is completed or the input is
    /// exhausted.
    ///
    /// When [`ReadResult::Row`] is returned, the completed row has been swapped
    /// into `row`, whose former content is discarded. The returned `usize` is
    /// the number of bytes consumed from `input`.
    pub fn read_row(&mut self, input: &[u8], row: &mut Row) -> (ReadResult, usize) {
        use DecodeState::*;

        let input_len = input.len();
        let mut pos: usize = 0;

        while pos < input_len {
            // Here we are copying runs of literal bytes at once
            match self.state {
                InField => {
                    if let Some(offset) = memchr2(self.delimiter, b'\n', &input[pos..]) {
                        self.row.extend_from_slice(&input[pos..pos + offset]);
                        pos += offset;
                    } else {
                        self.row.extend_from_slice(&input[pos..]);
                        pos = input_len;
                        break;
                    }
                }
                InQuotedField if self.within_quotes => {
                    if let Some(offset) = memchr(self.quote, &input[pos..]) {
                        self.row.extend_from_slice(&input[pos..pos + offset]);
                        pos += offset;
                    } else {
                        self.row.extend_from_slice(&input[pos..]);
                        pos = input_len;
                        break;
                    }
                }
                _ => (),
            }

            let byte = input[pos];
            pos += 1;

            if self.step(byte) {
                self.position += pos as u64;
                self.emit_into(row);
                return (ReadResult::Row, pos);
            }
        }

        self.position += pos as u64;

        (ReadResult::InputEmpty, pos)
    }

    /// Flush the pending row at the end of the stream.
    ///
    /// Returns whether a row was swapped into `row`. The decoder is reset to
    /// its initial state afterwards.
    pub fn flush(&mut self, row: &mut Row) -> bool {
        if self.state == DecodeState::Start && self.row.is_empty() {
            return false;
        }

        self.row.finalize_field();
        self.state = DecodeState::Start;
        self.within_quotes = false;
        self.emit_into(row);

        true
    }

    /// Process a whole chunk, handing every completed row to `sink`.
    ///
    /// Stops at the first error returned by the sink.
    pub fn feed<S: RowSink + ?Sized>(&mut self, input: &[u8], sink: &mut S) -> Result<()> {
        let mut pos: usize = 0;
        let mut row = Row::new();

        while pos < input.len() {
            let (result, consumed) = self.read_row(&input[pos..], &mut row);

            pos += consumed;

            if let ReadResult::Row = result {
                sink.accept(mem::take(&mut row))?;
            }
        }

        Ok(())
    }

    /// Signal the end of the stream, handing the pending row to `sink`, if
    /// any.
    pub fn finish<S: RowSink + ?Sized>(&mut self, sink: &mut S) -> Result<()> {
        let mut row = Row::new();

        if self.flush(&mut row) {
            sink.accept(row)?;
        }

        Ok(())
    }
}
