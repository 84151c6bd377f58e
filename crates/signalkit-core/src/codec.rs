//! Versioned binary codec.
//!
//! Values are written field by field in little-endian order behind a one-byte
//! format version, so the byte layout is an explicit contract rather than a
//! copy of in-memory representation. Strings and sequences carry a `u32`
//! length prefix.
//!
//! ## Usage
//!
//! ```rust,ignore
//! impl BinaryCodec for Sample {
//!     const VERSION: u8 = 1;
//!
//!     fn encode_fields(&self, enc: &mut Encoder) {
//!         enc.put_u32(self.id);
//!         enc.put_f64(self.value);
//!     }
//!
//!     fn decode_fields(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
//!         Ok(Self { id: dec.take_u32()?, value: dec.take_f64()? })
//!     }
//! }
//! ```

use crate::error::CodecError;

/// Field writer
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the encoder, returning the written bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a sequence length prefix, rejecting lengths above `u32::MAX`
    ///
    /// Nothing is written when the length is rejected.
    pub fn try_put_len(&mut self, len: usize) -> Result<(), CodecError> {
        let prefix = u32::try_from(len).map_err(|_| CodecError::LengthOverflow { len })?;
        self.put_u32(prefix);
        Ok(())
    }

    /// Write a sequence length prefix
    ///
    /// Sequences are limited to `u32::MAX` elements by the layout. Use
    /// [`Encoder::try_put_len`] when the length comes from untrusted input.
    ///
    /// # Panics
    /// Panics if `len` does not fit in a `u32`.
    pub fn put_len(&mut self, len: usize) {
        if let Err(err) = self.try_put_len(len) {
            panic!("{}", err);
        }
    }

    /// Write a length-prefixed string, rejecting strings above `u32::MAX` bytes
    pub fn try_put_str(&mut self, value: &str) -> Result<(), CodecError> {
        self.try_put_len(value.len())?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    /// Write a length-prefixed string
    ///
    /// # Panics
    /// Panics if the string is longer than `u32::MAX` bytes.
    pub fn put_str(&mut self, value: &str) {
        self.put_len(value.len());
        self.buf.extend_from_slice(value.as_bytes());
    }
}

/// Field reader over a borrowed buffer
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    /// Start reading at the beginning of `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(CodecError::UnexpectedEof { needed, remaining });
        }
        let slice = &self.bytes[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn take_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn take_bool(&mut self) -> Result<bool, CodecError> {
        match self.take_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(CodecError::InvalidTag {
                tag,
                type_name: "bool",
            }),
        }
    }

    pub fn take_u32(&mut self) -> Result<u32, CodecError> {
        self.take_array().map(u32::from_le_bytes)
    }

    pub fn take_u64(&mut self) -> Result<u64, CodecError> {
        self.take_array().map(u64::from_le_bytes)
    }

    pub fn take_i64(&mut self) -> Result<i64, CodecError> {
        self.take_array().map(i64::from_le_bytes)
    }

    pub fn take_f32(&mut self) -> Result<f32, CodecError> {
        self.take_array().map(f32::from_le_bytes)
    }

    pub fn take_f64(&mut self) -> Result<f64, CodecError> {
        self.take_array().map(f64::from_le_bytes)
    }

    /// Read a sequence length prefix
    pub fn take_len(&mut self) -> Result<usize, CodecError> {
        Ok(self.take_u32()? as usize)
    }

    pub fn take_str(&mut self) -> Result<String, CodecError> {
        let len = self.take_len()?;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }
}

/// A type with an explicit, versioned binary layout
pub trait BinaryCodec: Sized {
    /// Format version written ahead of the fields
    const VERSION: u8;

    /// Write every field, in layout order
    fn encode_fields(&self, enc: &mut Encoder);

    /// Read every field, in layout order
    fn decode_fields(dec: &mut Decoder<'_>) -> Result<Self, CodecError>;

    /// Encode with the version header
    fn to_bytes(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.put_u8(Self::VERSION);
        self.encode_fields(&mut enc);
        enc.into_bytes()
    }

    /// Decode a buffer produced by [`BinaryCodec::to_bytes`]
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut dec = Decoder::new(bytes);
        let found = dec.take_u8()?;
        if found != Self::VERSION {
            return Err(CodecError::UnsupportedVersion {
                expected: Self::VERSION,
                found,
            });
        }
        let value = Self::decode_fields(&mut dec)?;
        match dec.remaining() {
            0 => Ok(value),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Sample {
        id: u32,
        label: String,
        weight: f64,
        enabled: bool,
    }

    impl BinaryCodec for Sample {
        const VERSION: u8 = 2;

        fn encode_fields(&self, enc: &mut Encoder) {
            enc.put_u32(self.id);
            enc.put_str(&self.label);
            enc.put_f64(self.weight);
            enc.put_bool(self.enabled);
        }

        fn decode_fields(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
            Ok(Self {
                id: dec.take_u32()?,
                label: dec.take_str()?,
                weight: dec.take_f64()?,
                enabled: dec.take_bool()?,
            })
        }
    }

    fn sample() -> Sample {
        Sample {
            id: 0x0102_0304,
            label: "spindle".to_string(),
            weight: 1.5,
            enabled: true,
        }
    }

    #[test]
    fn test_layout_is_explicit() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes[0], 2);
        assert_eq!(&bytes[1..5], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[5..9], &7u32.to_le_bytes());
        assert_eq!(&bytes[9..16], b"spindle");
        assert_eq!(bytes.len(), 1 + 4 + 4 + 7 + 8 + 1);
        assert_eq!(Sample::from_bytes(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 1;
        assert_eq!(
            Sample::from_bytes(&bytes),
            Err(CodecError::UnsupportedVersion {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_truncated_input() {
        let bytes = sample().to_bytes();
        let err = Sample::from_bytes(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { needed: 8, .. }));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = sample().to_bytes();
        bytes.extend_from_slice(&[0, 0]);
        assert_eq!(Sample::from_bytes(&bytes), Err(CodecError::TrailingBytes(2)));
    }

    #[test]
    fn test_length_prefix_within_limit() {
        let mut enc = Encoder::new();
        enc.try_put_len(u32::MAX as usize).unwrap();
        enc.try_put_str("ok").unwrap();
        let bytes = enc.into_bytes();
        assert_eq!(&bytes[..4], &[0xff; 4]);
        assert_eq!(&bytes[4..], &[2, 0, 0, 0, b'o', b'k']);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_length_prefix_overflow_is_rejected() {
        let len = u32::MAX as usize + 1;
        let mut enc = Encoder::new();
        enc.put_u8(7);
        assert_eq!(enc.try_put_len(len), Err(CodecError::LengthOverflow { len }));
        assert_eq!(enc.into_bytes(), vec![7]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    #[should_panic(expected = "does not fit a u32 length prefix")]
    fn test_put_len_panics_past_limit() {
        Encoder::new().put_len(u32::MAX as usize + 1);
    }

    #[test]
    fn test_invalid_bool() {
        let mut bytes = sample().to_bytes();
        let last = bytes.len() - 1;
        bytes[last] = 9;
        assert_eq!(
            Sample::from_bytes(&bytes),
            Err(CodecError::InvalidTag {
                tag: 9,
                type_name: "bool"
            })
        );
    }
}
