//! The length-prefixed text primitive.
//!
//! The stream is UTF-8 text. A *length unit* is a single character whose code
//! point is the length, so lengths up to 127 cost one byte.
//!
//! ```text
//! short form:  [len as char] [len chars]
//! long form:   [short form of decimal(len)] [len chars]
//! ```
//!
//! Lengths count characters, not bytes.

use std::io::{self, BufRead, BufReader, Read, Write};

use crate::CodecError;

/// Largest length the short form can carry: the last scalar value below the
/// surrogate range.
pub const MAX_SHORT_LEN: usize = 0xD7FF;

/// Writes short- and long-form text to an underlying sink.
pub struct TextWriter<W: Write> {
    inner: W,
}

impl<W: Write> TextWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Length unit followed by the characters of `text`.
    ///
    /// # Errors
    ///
    /// [`CodecError::TextTooLong`] if `text` has more than
    /// [`MAX_SHORT_LEN`] characters.
    pub fn write_short(&mut self, text: &str) -> Result<(), CodecError> {
        let len = text.chars().count();
        self.write_len(len)?;
        self.inner.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Decimal length as short-form text, then the raw characters.
    pub fn write_long(&mut self, text: &str) -> Result<(), CodecError> {
        let len = text.chars().count();
        self.write_short(&len.to_string())?;
        self.inner.write_all(text.as_bytes())?;
        Ok(())
    }

    fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let unit = u32::try_from(len)
            .ok()
            .filter(|_| len <= MAX_SHORT_LEN)
            .and_then(char::from_u32)
            .ok_or(CodecError::TextTooLong { len })?;
        let mut buf = [0u8; 4];
        self.inner.write_all(unit.encode_utf8(&mut buf).as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), CodecError> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads short- and long-form text from a buffered source.
pub struct TextReader<R: Read> {
    rdr: BufReader<R>,
}

impl<R: Read> TextReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            rdr: BufReader::new(reader),
        }
    }

    /// Reads a length unit and then exactly that many characters.
    ///
    /// # Errors
    ///
    /// [`CodecError::TruncatedStream`] if the stream ends before the length
    /// unit or before the last announced character.
    pub fn read_short(&mut self) -> Result<String, CodecError> {
        let len = self.read_char()?.ok_or(CodecError::TruncatedStream)? as usize;
        self.read_chars(len)
    }

    /// Reads a short-form decimal length, then that many characters.
    pub fn read_long(&mut self) -> Result<String, CodecError> {
        let digits = self.read_short()?;
        let len = digits
            .parse::<usize>()
            .map_err(|_| CodecError::MalformedLength(digits.clone()))?;
        self.read_chars(len)
    }

    /// Short-form text holding a decimal count.
    pub fn read_count(&mut self) -> Result<usize, CodecError> {
        let text = self.read_short()?;
        text.parse().map_err(|_| CodecError::MalformedCount(text))
    }

    /// `true` once no bytes remain.
    pub fn at_end(&mut self) -> Result<bool, CodecError> {
        Ok(self.rdr.fill_buf()?.is_empty())
    }

    pub fn into_inner(self) -> R {
        self.rdr.into_inner()
    }

    fn read_chars(&mut self, len: usize) -> Result<String, CodecError> {
        // `len` comes from the stream; grow with the data actually read.
        let mut out = String::with_capacity(len.min(PREALLOC_LIMIT));
        for _ in 0..len {
            let c = self.read_char()?.ok_or(CodecError::TruncatedStream)?;
            out.push(c);
        }
        Ok(out)
    }

    /// Decodes one UTF-8 character. `Ok(None)` only at a clean end of stream.
    fn read_char(&mut self) -> Result<Option<char>, CodecError> {
        let mut buf = [0u8; 4];
        if let Err(e) = self.rdr.read_exact(&mut buf[..1]) {
            return if e.kind() == io::ErrorKind::UnexpectedEof {
                Ok(None)
            } else {
                Err(CodecError::Io(e))
            };
        }
        let width = match buf[0] {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Err(CodecError::InvalidUtf8),
        };
        if width > 1 {
            self.rdr.read_exact(&mut buf[1..width]).map_err(eof_is_truncation)?;
        }
        let s = std::str::from_utf8(&buf[..width]).map_err(|_| CodecError::InvalidUtf8)?;
        Ok(s.chars().next())
    }
}

const PREALLOC_LIMIT: usize = 4096;

fn eof_is_truncation(e: io::Error) -> CodecError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::TruncatedStream
    } else {
        CodecError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn encode(f: impl FnOnce(&mut TextWriter<Vec<u8>>) -> Result<(), CodecError>) -> Vec<u8> {
        let mut w = TextWriter::new(Vec::new());
        f(&mut w).unwrap();
        w.into_inner()
    }

    // -------------------- Byte layout --------------------

    #[test]
    fn short_form_layout() {
        let bytes = encode(|w| w.write_short("abc"));
        assert_eq!(bytes, vec![3, b'a', b'b', b'c']);
    }

    #[test]
    fn empty_text_writes_explicit_zero() {
        assert_eq!(encode(|w| w.write_short("")), vec![0]);
        // long form: "0" as short text, no payload
        assert_eq!(encode(|w| w.write_long("")), vec![1, b'0']);
    }

    #[test]
    fn long_form_layout() {
        let text = "x".repeat(300);
        let bytes = encode(|w| w.write_long(&text));
        assert_eq!(&bytes[..4], &[3, b'3', b'0', b'0']);
        assert_eq!(bytes.len(), 4 + 300);
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        let bytes = encode(|w| w.write_short("äö"));
        assert_eq!(bytes[0], 2);
        assert_eq!(bytes.len(), 1 + 4);
    }

    #[test]
    fn short_form_above_127_uses_multibyte_unit() {
        let text = "y".repeat(200);
        let bytes = encode(|w| w.write_short(&text));
        // U+00C8 in UTF-8
        assert_eq!(&bytes[..2], &[0xC3, 0x88]);

        let mut r = TextReader::new(&bytes[..]);
        assert_eq!(r.read_short().unwrap(), text);
    }

    #[test]
    fn short_form_rejects_oversized_text() {
        let text = "z".repeat(MAX_SHORT_LEN + 1);
        let mut w = TextWriter::new(Vec::new());
        assert!(matches!(
            w.write_short(&text),
            Err(CodecError::TextTooLong { .. })
        ));
    }

    // -------------------- Reading --------------------

    #[test]
    fn reads_back_in_order() -> Result<()> {
        let long = "L".repeat(1000);
        let bytes = encode(|w| {
            w.write_short("key")?;
            w.write_long(&long)?;
            w.write_short("")?;
            w.write_short("12")
        });
        let mut r = TextReader::new(&bytes[..]);
        assert_eq!(r.read_short()?, "key");
        assert_eq!(r.read_long()?, long);
        assert_eq!(r.read_short()?, "");
        assert_eq!(r.read_count()?, 12);
        assert!(r.at_end()?);
        Ok(())
    }

    #[test]
    fn eof_mid_text_is_truncation() {
        let bytes = [5u8, b'a', b'b'];
        let mut r = TextReader::new(&bytes[..]);
        assert!(matches!(r.read_short(), Err(CodecError::TruncatedStream)));
    }

    #[test]
    fn eof_at_length_unit_is_truncation() {
        let empty: &[u8] = &[];
        let mut r = TextReader::new(empty);
        assert!(matches!(r.read_short(), Err(CodecError::TruncatedStream)));
    }

    #[test]
    fn eof_mid_character_is_truncation() {
        let bytes = [1u8, 0xC3];
        let mut r = TextReader::new(&bytes[..]);
        assert!(matches!(r.read_short(), Err(CodecError::TruncatedStream)));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let bytes = [1u8, 0xFF];
        let mut r = TextReader::new(&bytes[..]);
        assert!(matches!(r.read_short(), Err(CodecError::InvalidUtf8)));
    }

    #[test]
    fn non_numeric_count_is_malformed() {
        let bytes = encode(|w| w.write_short("two"));
        let mut r = TextReader::new(&bytes[..]);
        assert!(matches!(r.read_count(), Err(CodecError::MalformedCount(s)) if s == "two"));
    }

    #[test]
    fn non_numeric_long_length_is_malformed() {
        let bytes = encode(|w| w.write_short("1x"));
        let mut r = TextReader::new(&bytes[..]);
        assert!(matches!(r.read_long(), Err(CodecError::MalformedLength(_))));
    }

    #[test]
    fn huge_long_length_is_truncation_not_allocation() {
        let bytes = encode(|w| {
            w.write_short("4000000000000000000")?;
            w.write_short("abc")
        });
        let mut r = TextReader::new(&bytes[..]);
        assert!(matches!(r.read_long(), Err(CodecError::TruncatedStream)));
    }
}
