const BOM: &[u8] = b"\xef\xbb\xbf";

/// Skips a leading BOM from a stream read in chunks of any size.
#[derive(Debug, Default)]
pub(crate) struct BomStripper {
    matched: usize,
    done: bool,
}

impl BomStripper {
    /// Returns the bytes that must be decoded before `input`, i.e. the start
    /// of what looked like a BOM in previous chunks, and the number of bytes of
    /// `input` to skip.
    pub(crate) fn strip(&mut self, input: &[u8]) -> (&'static [u8], usize) {
        if self.done {
            return (b"", 0);
        }

        let n = input
            .iter()
            .zip(&BOM[self.matched..])
            .take_while(|(a, b)| a == b)
            .count();

        if self.matched + n == BOM.len() {
            self.done = true;
            return (b"", n);
        }

        if n == input.len() {
            self.matched += n;
            return (b"", n);
        }

        self.done = true;

        (&BOM[..self.matched], 0)
    }

    /// Returns the bytes of an incomplete BOM at the end of the stream.
    pub(crate) fn finish(&mut self) -> &'static [u8] {
        if self.done {
            return b"";
        }

        self.done = true;

        &BOM[..self.matched]
    }
}
