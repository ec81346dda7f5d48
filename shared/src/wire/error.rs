use thiserror::Error;

/// Errors that can occur while reading values out of a packet payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Tried to read past the end of the buffer (SECURITY: truncated or malicious packet)
    #[error("Unexpected end of buffer: needed {needed} bytes at offset {offset}, but only {available} remain")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A length prefix claims more data than any sane payload could carry
    #[error("Length prefix {length} exceeds the limit of {limit} bytes")]
    LengthLimitExceeded {
        length: u32,
        limit: u32,
    },

    /// A string field did not contain valid UTF-8
    #[error("String field at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        offset: usize,
    },

    /// An enum discriminant byte did not match any known variant
    #[error("Invalid discriminant {value} for {type_name}")]
    InvalidDiscriminant {
        type_name: &'static str,
        value: u32,
    },
}
