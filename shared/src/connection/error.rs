use thiserror::Error;

/// Errors that can occur while compressing frame data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    /// Failed to create compressor with the specified configuration
    #[error("Failed to create compressor with compression level {level}")]
    CompressorCreationFailed {
        level: i32,
    },

    /// Failed to create compressor with dictionary
    #[error("Failed to create compressor with dictionary (compression level {level})")]
    CompressorWithDictionaryFailed {
        level: i32,
    },

    /// Compression operation failed
    #[error("Failed to compress payload of {payload_size} bytes")]
    CompressionFailed {
        payload_size: usize,
    },

    /// Dictionary training failed
    #[error("Failed to train compression dictionary from {sample_count} samples ({total_bytes} bytes)")]
    DictionaryTrainingFailed {
        sample_count: usize,
        total_bytes: usize,
    },

    /// Failed to write dictionary to file
    #[error("Failed to write dictionary to file: {path}")]
    DictionaryWriteFailed {
        path: String,
    },
}

/// Errors that can occur while decompressing received frame data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    /// Failed to create decompressor
    #[error("Failed to create decompressor")]
    DecompressorCreationFailed,

    /// Failed to create decompressor with dictionary
    #[error("Failed to create decompressor with dictionary")]
    DecompressorWithDictionaryFailed,

    /// Failed to calculate upper bound for decompression
    #[error("Failed to calculate upper bound for payload of {payload_size} bytes")]
    UpperBoundCalculationFailed {
        payload_size: usize,
    },

    /// A compressed payload arrived but this decoder has no decompressor
    #[error("Received a compressed payload of {payload_size} bytes, but compression is not enabled")]
    CompressionUnsupported {
        payload_size: usize,
    },

    /// Decompression operation failed (SECURITY: potentially malicious payload)
    #[error("Failed to decompress payload of {payload_size} bytes (possible malformed or malicious data)")]
    DecompressionFailed {
        payload_size: usize,
    },
}

/// Compression errors on either side of a frame data transfer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// Encoder error
    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    /// Decoder error
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),
}
