use std::fmt;

/// Debug wrapper printing a byte slice as a string when possible.
pub(crate) struct Bytes<'a>(pub(crate) &'a [u8]);

impl fmt::Debug for Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match std::str::from_utf8(self.0) {
            Ok(string) => write!(f, "{:?}", string),
            Err(_) => write!(f, "{:?}", self.0),
        }
    }
}

/// Debug wrapper listing fields as [`Bytes`].
pub(crate) struct Fields<I>(pub(crate) I);

impl<'a, I> fmt::Debug for Fields<I>
where
    I: Iterator<Item = &'a [u8]> + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.0.clone().map(Bytes)).finish()
    }
}
