//! Wire codec error types.

/// Errors from decoding (and a few encoding) operations on the wire format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("Malformed length: declared {declared} bytes, {remaining} remaining")]
    MalformedLength { declared: usize, remaining: usize },

    #[error("Unexpected tag: expected {expected:#010x}, got {actual:#010x}")]
    UnexpectedTag { expected: u32, actual: u32 },

    #[error("Corrupted packet: declared payload length {declared}, actual {actual}")]
    CorruptedPacket { declared: usize, actual: usize },

    #[error("Byte string of {len} bytes does not fit a 24-bit length prefix")]
    BytesTooLong { len: usize },

    #[error("Vector of {count} elements does not fit a 32-bit count")]
    TooManyElements { count: usize },

    #[error("Envelope payload of {len} bytes does not fit a 32-bit length")]
    PayloadTooLong { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_errors_name_what_overflowed() {
        let bytes = WireError::BytesTooLong { len: 1 << 24 }.to_string();
        let vector = WireError::TooManyElements { count: 1 << 32 }.to_string();
        let payload = WireError::PayloadTooLong { len: 1 << 32 }.to_string();
        assert!(bytes.contains("Byte string"));
        assert!(vector.contains("Vector of 4294967296 elements"));
        assert!(payload.contains("Envelope payload"));
    }
}
