//! Fixed-size little-endian record layouts.
//!
//! Every on-disk structure of both formats has a size that is known up
//! front and never changes.  A type describes itself by implementing
//! [`FixedLayout`]: `write` emits every field in offset order (reserved
//! spans as zeros), `read` consumes them in the same order (reserved spans
//! are skipped without inspection).
//!
//! [`encode`] and [`decode`] wrap those two methods with the size contract:
//! an encoded record is exactly `SIZE` bytes, and decoding anything of a
//! different length fails instead of truncating or padding.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// A record with a fixed byte size and deterministic field offsets.
pub trait FixedLayout: Sized {
    /// Encoded size in bytes.
    const SIZE: usize;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()>;
    fn read<R: Read>(reader: &mut R) -> io::Result<Self>;
}

/// Encode `value` into a fresh buffer of exactly `T::SIZE` bytes.
pub fn encode<T: FixedLayout>(value: &T) -> Result<Vec<u8>, LayoutError> {
    let mut buf = Vec::with_capacity(T::SIZE);
    value.write(&mut buf)?;
    if buf.len() != T::SIZE {
        return Err(LayoutError::SizeMismatch { expected: T::SIZE, actual: buf.len() });
    }
    Ok(buf)
}

/// Decode a `T` from `bytes`, which must be exactly `T::SIZE` long.
pub fn decode<T: FixedLayout>(bytes: &[u8]) -> Result<T, LayoutError> {
    if bytes.len() != T::SIZE {
        return Err(LayoutError::SizeMismatch { expected: T::SIZE, actual: bytes.len() });
    }
    let mut cursor = Cursor::new(bytes);
    let value = T::read(&mut cursor)?;
    let consumed = cursor.position() as usize;
    if consumed != T::SIZE {
        return Err(LayoutError::SizeMismatch { expected: T::SIZE, actual: consumed });
    }
    Ok(value)
}

// ── Padding ───────────────────────────────────────────────────────────────────

/// Write `len` zero bytes.
pub fn pad<W: Write>(writer: &mut W, len: usize) -> io::Result<()> {
    const ZEROS: [u8; 64] = [0u8; 64];
    let mut left = len;
    while left > 0 {
        let n = left.min(ZEROS.len());
        writer.write_all(&ZEROS[..n])?;
        left -= n;
    }
    Ok(())
}

/// Consume and discard `len` bytes.
pub fn skip<R: Read>(reader: &mut R, len: usize) -> io::Result<()> {
    let copied = io::copy(&mut reader.by_ref().take(len as u64), &mut io::sink())?;
    if copied != len as u64 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "reserved span truncated"));
    }
    Ok(())
}

// ── Inline arrays ─────────────────────────────────────────────────────────────

pub fn read_bytes<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut out = [0u8; N];
    reader.read_exact(&mut out)?;
    Ok(out)
}

pub fn read_u32_array<R: Read, const N: usize>(reader: &mut R) -> io::Result<[u32; N]> {
    let mut out = [0u32; N];
    reader.read_u32_into::<LittleEndian>(&mut out)?;
    Ok(out)
}

pub fn write_u32_array<W: Write>(writer: &mut W, values: &[u32]) -> io::Result<()> {
    for v in values {
        writer.write_u32::<LittleEndian>(*v)?;
    }
    Ok(())
}

/// Read `N` consecutive nested records.
pub fn read_array<R, T, const N: usize>(reader: &mut R) -> io::Result<[T; N]>
where
    R: Read,
    T: FixedLayout + Default + Copy,
{
    let mut out = [T::default(); N];
    for slot in out.iter_mut() {
        *slot = T::read(reader)?;
    }
    Ok(out)
}

pub fn write_array<W: Write, T: FixedLayout>(writer: &mut W, values: &[T]) -> io::Result<()> {
    for v in values {
        v.write(writer)?;
    }
    Ok(())
}

// ── FixedStr ──────────────────────────────────────────────────────────────────

/// Fixed-width text field without a terminator.
///
/// The raw bytes are kept as-is: decoding never stops at a NUL and never
/// rejects non-ASCII bytes.  Conversions to and from `str` map each byte to
/// the char with the same code point, so any byte survives a round trip.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize>(pub [u8; N]);

impl<const N: usize> FixedStr<N> {
    /// Build from text, truncating to `N` bytes and zero-filling the rest.
    /// Chars above U+00FF become `?`.
    pub fn new(text: &str) -> Self {
        let mut raw = [0u8; N];
        for (dst, ch) in raw.iter_mut().zip(text.chars()) {
            *dst = u8::try_from(u32::from(ch)).unwrap_or(b'?');
        }
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// All `N` bytes as chars, trailing NULs included.
    pub fn to_raw_string(&self) -> String {
        self.0.iter().map(|&b| char::from(b)).collect()
    }

    /// Text with trailing NUL padding removed.
    pub fn trimmed(&self) -> String {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
        self.0[..end].iter().map(|&b| char::from(b)).collect()
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.trimmed())
    }
}

impl<const N: usize> fmt::Display for FixedStr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.trimmed())
    }
}

impl<const N: usize> From<&str> for FixedStr<N> {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl<const N: usize> FixedLayout for FixedStr<N> {
    const SIZE: usize = N;

    fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self(read_bytes(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Probe {
        a: u32,
        b: u8,
        name: FixedStr<3>,
    }

    impl FixedLayout for Probe {
        const SIZE: usize = 12;

        fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
            w.write_u32::<LittleEndian>(self.a)?;
            w.write_u8(self.b)?;
            pad(w, 4)?;
            self.name.write(w)
        }

        fn read<R: Read>(r: &mut R) -> io::Result<Self> {
            let a = r.read_u32::<LittleEndian>()?;
            let b = r.read_u8()?;
            skip(r, 4)?;
            Ok(Self { a, b, name: FixedStr::read(r)? })
        }
    }

    #[test]
    fn encode_places_fields_at_offsets() {
        let p = Probe { a: 0x0403_0201, b: 9, name: FixedStr::new("XYZ") };
        let bytes = encode(&p).unwrap();
        assert_eq!(bytes, [1, 2, 3, 4, 9, 0, 0, 0, 0, b'X', b'Y', b'Z']);
    }

    #[test]
    fn decode_ignores_reserved_bytes() {
        let bytes = [1, 0, 0, 0, 2, 0xFF, 0xFF, 0xFF, 0xFF, b'a', b'b', b'c'];
        let p: Probe = decode(&bytes).unwrap();
        assert_eq!(p.a, 1);
        assert_eq!(p.b, 2);
        assert_eq!(p.name.trimmed(), "abc");
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let err = decode::<Probe>(&[0u8; 11]).unwrap_err();
        assert!(matches!(err, LayoutError::SizeMismatch { expected: 12, actual: 11 }));
        let err = decode::<Probe>(&[0u8; 13]).unwrap_err();
        assert!(matches!(err, LayoutError::SizeMismatch { expected: 12, actual: 13 }));
    }

    #[test]
    fn fixed_str_truncates_and_keeps_raw_bytes() {
        let s = FixedStr::<4>::new("ABCDEFG");
        assert_eq!(s.as_bytes(), b"ABCD");

        let raw = FixedStr::<4>([b'S', 0xE9, 0, 0]);
        assert_eq!(raw.to_raw_string(), "S\u{e9}\0\0");
        assert_eq!(raw.trimmed(), "S\u{e9}");
        assert_eq!(FixedStr::<4>::new(&raw.to_raw_string()), raw);
    }
}
