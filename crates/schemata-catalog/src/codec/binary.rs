//! Compact binary stream codec.
//!
//! Field order is significant and no field names are written. Primitives:
//!
//! | Value | Encoding |
//! |-------|----------|
//! | vint | 7-bit groups, least significant first, high bit = continuation |
//! | bool | one byte, `0` or `1` |
//! | long / int | big-endian `i64` / `i32` |
//! | string | vint byte length, then UTF-8 bytes |
//! | string list | vint count, then strings |
//! | optional | bool presence, then the value if present |
//! | instant | long epoch seconds, then int nanoseconds |
//! | enum | vint ordinal |
//!
//! Unlike the structured form, the binary form has no tolerance for unknown
//! or missing data: any deviation is a [`CatalogError::MalformedPayload`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::error::{CatalogError, Result};

/// Types that can write themselves to a [`StreamOutput`].
pub trait Writeable {
    /// Appends the binary form of `self`.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented on the wire.
    fn write_to(&self, out: &mut StreamOutput) -> Result<()>;

    /// Encodes `self` into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented on the wire.
    fn to_bytes(&self) -> Result<Bytes> {
        let mut out = StreamOutput::new();
        self.write_to(&mut out)?;
        Ok(out.freeze())
    }
}

/// Types that can read themselves from a [`StreamInput`].
pub trait Readable: Sized {
    /// Reads the binary form of `Self`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncated or invalid input.
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self>;

    /// Decodes a complete buffer, rejecting trailing bytes.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncated, invalid, or oversized input.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = StreamInput::new(bytes);
        let value = Self::read_from(&mut input)?;
        input.finish()?;
        Ok(value)
    }
}

/// Growable output stream.
#[derive(Debug, Default)]
pub struct StreamOutput {
    buf: BytesMut,
}

impl StreamOutput {
    /// Creates an empty stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes written so far.
    #[must_use]
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Writes a variable-length unsigned int.
    pub fn write_vint(&mut self, mut value: u32) {
        while value >= 0x80 {
            // Truncation keeps the low seven bits.
            #[allow(clippy::cast_possible_truncation)]
            self.buf.put_u8((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        #[allow(clippy::cast_possible_truncation)]
        self.buf.put_u8(value as u8);
    }

    /// Writes a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    /// Writes a big-endian `i64`.
    pub fn write_long(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    /// Writes a big-endian `i32`.
    pub fn write_int(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Writes a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the string exceeds `u32::MAX` bytes.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_len(value.len())?;
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Writes an optional string.
    ///
    /// # Errors
    ///
    /// See [`StreamOutput::write_string`].
    pub fn write_optional_string(&mut self, value: Option<&str>) -> Result<()> {
        self.write_bool(value.is_some());
        match value {
            Some(value) => self.write_string(value),
            None => Ok(()),
        }
    }

    /// Writes a counted list of strings.
    ///
    /// # Errors
    ///
    /// See [`StreamOutput::write_string`].
    pub fn write_string_list(&mut self, values: &[String]) -> Result<()> {
        self.write_len(values.len())?;
        values.iter().try_for_each(|v| self.write_string(v))
    }

    /// Writes an optional list of strings.
    ///
    /// # Errors
    ///
    /// See [`StreamOutput::write_string`].
    pub fn write_optional_string_list(&mut self, values: Option<&[String]>) -> Result<()> {
        self.write_bool(values.is_some());
        match values {
            Some(values) => self.write_string_list(values),
            None => Ok(()),
        }
    }

    /// Writes an instant as epoch seconds plus nanoseconds.
    pub fn write_instant(&mut self, value: &DateTime<Utc>) {
        self.write_long(value.timestamp());
        // subsec nanos are always < 2^31
        #[allow(clippy::cast_possible_wrap)]
        self.write_int(value.timestamp_subsec_nanos() as i32);
    }

    /// Writes an enum ordinal.
    pub fn write_enum(&mut self, ordinal: u32) {
        self.write_vint(ordinal);
    }

    /// Writes an optional value.
    ///
    /// # Errors
    ///
    /// Propagates errors from the value's own encoding.
    pub fn write_optional<W: Writeable>(&mut self, value: Option<&W>) -> Result<()> {
        self.write_bool(value.is_some());
        match value {
            Some(value) => value.write_to(self),
            None => Ok(()),
        }
    }

    /// Writes a counted list of values.
    ///
    /// # Errors
    ///
    /// Propagates errors from the values' own encoding.
    pub fn write_list<W: Writeable>(&mut self, values: &[W]) -> Result<()> {
        self.write_len(values.len())?;
        values.iter().try_for_each(|v| v.write_to(self))
    }

    fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| CatalogError::invalid_request(format!("length {len} exceeds wire limit")))?;
        self.write_vint(len);
        Ok(())
    }
}

/// Cursor over an input buffer.
#[derive(Debug)]
pub struct StreamInput<'a> {
    buf: &'a [u8],
}

impl<'a> StreamInput<'a> {
    /// Creates a stream over `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Fails if any bytes remain unread.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` when trailing bytes are present.
    pub fn finish(&self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(CatalogError::malformed(format!(
                "{} trailing bytes after value",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    /// Reads a variable-length unsigned int.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncation or overflow.
    pub fn read_vint(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for shift in (0..35).step_by(7) {
            let byte = self.read_u8()?;
            let bits = u32::from(byte & 0x7f);
            if shift == 28 && bits > 0x0f {
                return Err(CatalogError::malformed("vint overflows 32 bits"));
            }
            value |= bits << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CatalogError::malformed("vint longer than 5 bytes"))
    }

    /// Reads a boolean.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` for bytes other than `0` or `1`.
    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CatalogError::malformed(format!(
                "unexpected byte {other:#04x} for boolean"
            ))),
        }
    }

    /// Reads a big-endian `i64`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncation.
    pub fn read_long(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    /// Reads a big-endian `i32`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncation.
    pub fn read_int(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncation or invalid UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        let value = std::str::from_utf8(head)
            .map_err(|e| CatalogError::malformed(format!("invalid UTF-8 in string: {e}")))?
            .to_string();
        self.buf = tail;
        Ok(value)
    }

    /// Reads an optional string.
    ///
    /// # Errors
    ///
    /// See [`StreamInput::read_string`].
    pub fn read_optional_string(&mut self) -> Result<Option<String>> {
        if self.read_bool()? {
            self.read_string().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads a counted list of strings.
    ///
    /// # Errors
    ///
    /// See [`StreamInput::read_string`].
    pub fn read_string_list(&mut self) -> Result<Vec<String>> {
        let len = self.read_len()?;
        (0..len).map(|_| self.read_string()).collect()
    }

    /// Reads an optional list of strings.
    ///
    /// # Errors
    ///
    /// See [`StreamInput::read_string`].
    pub fn read_optional_string_list(&mut self) -> Result<Option<Vec<String>>> {
        if self.read_bool()? {
            self.read_string_list().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads an instant written as epoch seconds plus nanoseconds.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncation or an out-of-range instant.
    pub fn read_instant(&mut self) -> Result<DateTime<Utc>> {
        let secs = self.read_long()?;
        let nanos = u32::try_from(self.read_int()?)
            .map_err(|_| CatalogError::malformed("negative nanoseconds in instant"))?;
        DateTime::from_timestamp(secs, nanos)
            .ok_or_else(|| CatalogError::malformed(format!("instant {secs}.{nanos} out of range")))
    }

    /// Reads an enum ordinal.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` on truncation.
    pub fn read_enum(&mut self) -> Result<u32> {
        self.read_vint()
    }

    /// Reads an optional value.
    ///
    /// # Errors
    ///
    /// Propagates errors from the value's own decoding.
    pub fn read_optional<R: Readable>(&mut self) -> Result<Option<R>> {
        if self.read_bool()? {
            R::read_from(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reads a counted list of values.
    ///
    /// # Errors
    ///
    /// Propagates errors from the values' own decoding.
    pub fn read_list<R: Readable>(&mut self) -> Result<Vec<R>> {
        let len = self.read_len()?;
        (0..len).map(|_| R::read_from(self)).collect()
    }

    fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = usize::try_from(self.read_vint()?)
            .map_err(|_| CatalogError::malformed("length does not fit in memory"))?;
        if len > self.buf.remaining() {
            // every element takes at least one byte
            return Err(CatalogError::malformed(format!(
                "declared length {len} exceeds {} remaining bytes",
                self.buf.remaining()
            )));
        }
        Ok(len)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(CatalogError::malformed(format!(
                "unexpected end of stream: needed {needed} bytes, {} remaining",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vint_uses_seven_bit_groups() {
        let mut out = StreamOutput::new();
        out.write_vint(0);
        out.write_vint(127);
        out.write_vint(128);
        out.write_vint(300);
        let bytes = out.freeze();
        assert_eq!(&bytes[..], &[0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);

        let mut input = StreamInput::new(&bytes);
        assert_eq!(input.read_vint().unwrap(), 0);
        assert_eq!(input.read_vint().unwrap(), 127);
        assert_eq!(input.read_vint().unwrap(), 128);
        assert_eq!(input.read_vint().unwrap(), 300);
        assert!(input.finish().is_ok());
    }

    #[test]
    fn vint_max_value() {
        let mut out = StreamOutput::new();
        out.write_vint(u32::MAX);
        let bytes = out.freeze();
        assert_eq!(bytes.len(), 5);
        assert_eq!(StreamInput::new(&bytes).read_vint().unwrap(), u32::MAX);
    }

    #[test]
    fn optional_string_writes_presence_byte() {
        let mut out = StreamOutput::new();
        out.write_optional_string(None).unwrap();
        out.write_optional_string(Some("ab")).unwrap();
        let bytes = out.freeze();
        assert_eq!(&bytes[..], &[0, 1, 2, b'a', b'b']);
    }

    #[test]
    fn truncated_string_is_malformed() {
        let bytes = [5u8, b'a', b'b'];
        let err = StreamInput::new(&bytes).read_string().unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));
    }

    #[test]
    fn invalid_bool_is_malformed() {
        let err = StreamInput::new(&[2]).read_bool().unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));
    }

    #[test]
    fn instant_keeps_nanoseconds() {
        let instant = DateTime::from_timestamp(1_638_482_208, 790_123_456).unwrap();
        let mut out = StreamOutput::new();
        out.write_instant(&instant);
        let bytes = out.freeze();
        assert_eq!(bytes.len(), 12);
        assert_eq!(StreamInput::new(&bytes).read_instant().unwrap(), instant);
    }

    #[test]
    fn string_list_roundtrip() {
        let values = vec!["one".to_string(), String::new(), "três".to_string()];
        let mut out = StreamOutput::new();
        out.write_string_list(&values).unwrap();
        let bytes = out.freeze();
        let mut input = StreamInput::new(&bytes);
        assert_eq!(input.read_string_list().unwrap(), values);
        assert_eq!(input.remaining(), 0);
    }
}
