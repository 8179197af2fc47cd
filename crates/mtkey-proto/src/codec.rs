//! Primitive encoders and decoders.
//!
//! Integers are little-endian regardless of host byte order. Byte strings
//! carry a 1- or 4-byte length header and are zero-padded so the encoded
//! form is always a multiple of 4 bytes long.

use crate::error::WireError;

/// 128-bit nonce, serialized as 16 raw bytes.
pub type Int128 = [u8; 16];

/// 256-bit nonce, serialized as 32 raw bytes.
pub type Int256 = [u8; 32];

/// Constructor tag preceding every boxed vector.
pub const VECTOR_TAG: u32 = 0x1cb5_c415;

/// Lengths at or above this use the long (4-byte) header.
const SHORT_LENGTH_LIMIT: usize = 254;

/// First header byte of a long byte string.
const LONG_LENGTH_MARKER: u8 = 254;

/// Exclusive upper bound for a byte string length (24-bit header).
pub const MAX_BYTES_LEN: usize = 1 << 24;

/// Number of zero bytes needed after `len` bytes to reach 4-byte alignment.
const fn padding_for(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Growable output buffer.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_int128(&mut self, value: &Int128) {
        self.buf.extend_from_slice(value);
    }

    pub fn write_int256(&mut self, value: &Int256) {
        self.buf.extend_from_slice(value);
    }

    /// Append raw bytes with no header or padding.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a length-prefixed, 4-byte aligned byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        let len = bytes.len();
        let header_len = if len < SHORT_LENGTH_LIMIT {
            #[allow(clippy::cast_possible_truncation)] // len < 254
            self.buf.push(len as u8);
            1
        } else if len < MAX_BYTES_LEN {
            let le = len.to_le_bytes();
            self.buf.push(LONG_LENGTH_MARKER);
            self.buf.extend_from_slice(&le[..3]);
            4
        } else {
            return Err(WireError::BytesTooLong { len });
        };

        self.buf.extend_from_slice(bytes);
        let padding = padding_for(header_len + len);
        self.buf.resize(self.buf.len() + padding, 0);
        Ok(())
    }

    /// Append a boxed vector of 64-bit values.
    pub fn write_vector_u64(&mut self, values: &[u64]) -> Result<(), WireError> {
        let count = u32::try_from(values.len()).map_err(|_| WireError::TooManyElements {
            count: values.len(),
        })?;
        self.write_u32(VECTOR_TAG);
        self.write_u32(count);
        for value in values {
            self.write_u64(*value);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over an input buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Consume exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if n > self.remaining() {
            return Err(WireError::TruncatedInput {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_int128(&mut self) -> Result<Int128, WireError> {
        self.read_array()
    }

    pub fn read_int256(&mut self) -> Result<Int256, WireError> {
        self.read_array()
    }

    /// Read a length-prefixed byte string and skip its alignment padding.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, WireError> {
        let first = self.read_array::<1>()?[0];
        let (header_len, len) = match first {
            LONG_LENGTH_MARKER => {
                let b = self.read_array::<3>()?;
                (4, usize::from(b[0]) | usize::from(b[1]) << 8 | usize::from(b[2]) << 16)
            }
            255 => {
                return Err(WireError::MalformedLength {
                    declared: 255,
                    remaining: self.remaining(),
                });
            }
            short => (1, usize::from(short)),
        };

        if len > self.remaining() {
            return Err(WireError::MalformedLength {
                declared: len,
                remaining: self.remaining(),
            });
        }
        let bytes = self.read_exact(len)?.to_vec();
        self.read_exact(padding_for(header_len + len))?;
        Ok(bytes)
    }

    /// Read a boxed vector of 64-bit values.
    pub fn read_vector_u64(&mut self) -> Result<Vec<u64>, WireError> {
        let tag = self.read_u32()?;
        if tag != VECTOR_TAG {
            return Err(WireError::UnexpectedTag {
                expected: VECTOR_TAG,
                actual: tag,
            });
        }
        let count = self.read_u32()? as usize;
        let needed = count.saturating_mul(8);
        if needed > self.remaining() {
            return Err(WireError::TruncatedInput {
                needed,
                remaining: self.remaining(),
            });
        }
        (0..count).map(|_| self.read_u64()).collect()
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode(bytes: &[u8]) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_bytes(bytes).unwrap();
        w.into_inner()
    }

    #[test]
    fn integers_are_little_endian() {
        let mut w = Writer::new();
        w.write_u32(0x6046_9778);
        w.write_u64(0x0102_0304_0506_0708);
        assert_eq!(
            w.as_slice(),
            &[0x78, 0x97, 0x46, 0x60, 8, 7, 6, 5, 4, 3, 2, 1]
        );

        let mut r = Reader::new(w.as_slice());
        assert_eq!(r.read_u32().unwrap(), 0x6046_9778);
        assert_eq!(r.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_byte_string_layout() {
        assert_eq!(encode(&[]), vec![0, 0, 0, 0]);
        assert_eq!(encode(&[0xaa]), vec![1, 0xaa, 0, 0]);
        assert_eq!(encode(&[1, 2, 3]), vec![3, 1, 2, 3]);
        assert_eq!(encode(&[1, 2, 3, 4]), vec![4, 1, 2, 3, 4, 0, 0, 0]);
    }

    #[test]
    fn long_byte_string_layout() {
        let data = vec![7u8; 254];
        let encoded = encode(&data);
        assert_eq!(&encoded[..4], &[254, 254, 0, 0]);
        assert_eq!(encoded.len(), 4 + 254 + 2);

        let data = vec![7u8; 256];
        let encoded = encode(&data);
        assert_eq!(&encoded[..4], &[254, 0, 1, 0]);
        assert_eq!(encoded.len(), 260);
    }

    #[test]
    fn byte_strings_survive_decoding_and_stay_aligned() {
        for len in [0usize, 1, 2, 3, 4, 5, 252, 253, 254, 255, 256, 257, 1000, 70_001] {
            let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let encoded = encode(&data);
            assert_eq!(encoded.len() % 4, 0, "len {len}");

            let mut r = Reader::new(&encoded);
            assert_eq!(r.read_bytes().unwrap(), data, "len {len}");
            assert_eq!(r.remaining(), 0, "len {len}");
        }
    }

    #[test]
    fn byte_string_longer_than_24_bits_is_rejected() {
        let data = vec![0u8; MAX_BYTES_LEN];
        let mut w = Writer::new();
        assert_eq!(
            w.write_bytes(&data),
            Err(WireError::BytesTooLong { len: MAX_BYTES_LEN })
        );
        assert!(w.is_empty());
    }

    #[test]
    fn declared_length_past_end_is_malformed() {
        let mut r = Reader::new(&[10, 1, 2, 3]);
        assert_eq!(
            r.read_bytes(),
            Err(WireError::MalformedLength {
                declared: 10,
                remaining: 3
            })
        );

        let mut r = Reader::new(&[254, 0, 2, 0, 9, 9]);
        assert!(matches!(
            r.read_bytes(),
            Err(WireError::MalformedLength { declared: 512, .. })
        ));
    }

    #[test]
    fn missing_padding_is_truncated() {
        let mut r = Reader::new(&[4, 1, 2, 3, 4, 0]);
        assert!(matches!(
            r.read_bytes(),
            Err(WireError::TruncatedInput { needed: 3, remaining: 1 })
        ));
    }

    #[test]
    fn reading_past_end_is_truncated() {
        let mut r = Reader::new(&[1, 2, 3]);
        assert_eq!(
            r.read_u32(),
            Err(WireError::TruncatedInput {
                needed: 4,
                remaining: 3
            })
        );
        assert_eq!(r.position(), 0);
        assert!(r.read_int128().is_err());
    }

    #[test]
    fn vector_of_u64() {
        let mut w = Writer::new();
        w.write_vector_u64(&[0xc3b4_2b02_6ce8_6b21, 1]).unwrap();
        assert_eq!(&w.as_slice()[..4], &VECTOR_TAG.to_le_bytes());
        assert_eq!(&w.as_slice()[4..8], &2u32.to_le_bytes());
        assert_eq!(w.len(), 8 + 16);

        let mut r = Reader::new(w.as_slice());
        assert_eq!(r.read_vector_u64().unwrap(), vec![0xc3b4_2b02_6ce8_6b21, 1]);
    }

    #[test]
    fn vector_with_wrong_tag_is_rejected() {
        let mut w = Writer::new();
        w.write_u32(0xdead_beef);
        w.write_u32(0);
        let mut r = Reader::new(w.as_slice());
        assert_eq!(
            r.read_vector_u64(),
            Err(WireError::UnexpectedTag {
                expected: VECTOR_TAG,
                actual: 0xdead_beef
            })
        );
    }

    #[test]
    fn vector_count_larger_than_input_is_truncated() {
        let mut w = Writer::new();
        w.write_u32(VECTOR_TAG);
        w.write_u32(u32::MAX);
        w.write_u64(5);
        let mut r = Reader::new(w.as_slice());
        assert!(matches!(
            r.read_vector_u64(),
            Err(WireError::TruncatedInput { remaining: 8, .. })
        ));
    }

    #[test]
    fn nonces_are_raw() {
        let nonce: Int128 = core::array::from_fn(|i| i as u8);
        let mut w = Writer::new();
        w.write_int128(&nonce);
        assert_eq!(w.as_slice(), &nonce);
        assert_eq!(Reader::new(w.as_slice()).read_int128().unwrap(), nonce);
    }
}
