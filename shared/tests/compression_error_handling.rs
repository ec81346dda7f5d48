/// Integration tests for frame data compression error handling
///
/// SECURITY: the Decoder processes pixel payloads received from other nodes.
/// Malformed payloads must return an error instead of panicking.
use lockstep_shared::{CompressionConfig, CompressionMode, Decoder, DecoderError, Encoder, EncoderError};

// ========== Error Type Tests ==========

#[test]
fn test_compression_unsupported_error() {
    let error = DecoderError::CompressionUnsupported { payload_size: 77 };
    let msg = format!("{}", error);
    assert!(msg.contains("compression is not enabled"));
    assert!(msg.contains("77"));
}

#[test]
fn test_decompression_failed_error() {
    let error = DecoderError::DecompressionFailed { payload_size: 2048 };
    let msg = format!("{}", error);
    assert!(msg.contains("Failed to decompress payload"));
    assert!(msg.contains("2048"));
    assert!(msg.contains("malformed") || msg.contains("malicious"));
}

#[test]
fn test_dictionary_write_failed_error() {
    let error = EncoderError::DictionaryWriteFailed {
        path: "/nonexistent/frames.dict".to_string(),
    };
    assert!(format!("{}", error).contains("/nonexistent/frames.dict"));
}

// ========== Passthrough ==========

#[test]
fn test_disabled_compression_passes_payloads_through() {
    let config = CompressionConfig::default();
    assert_eq!(config.mode(), CompressionMode::None);

    let mut encoder = Encoder::try_new(config.mode(), config.min_payload_size).unwrap();
    let mut decoder = Decoder::try_new(config.mode()).unwrap();

    let payload = vec![5u8; 300];
    let encoded = encoder.try_encode(&payload).unwrap();
    assert!(!encoded.compressed);
    let bytes = encoded.bytes.to_vec();

    assert_eq!(decoder.try_decode(&bytes, false).unwrap(), payload.as_slice());
}

#[test]
fn test_compressed_flag_without_decompressor_is_rejected() {
    let mut decoder = Decoder::try_new(CompressionMode::None).unwrap();

    assert_eq!(
        decoder.try_decode(&[1, 2, 3], true),
        Err(DecoderError::CompressionUnsupported { payload_size: 3 })
    );
}

#[cfg(feature = "zstd_support")]
mod zstd_tests {
    use lockstep_shared::{CompressionMode, Decoder, DecoderError, Encoder};

    #[test]
    fn test_compressible_payload_is_compressed() {
        let mut encoder = Encoder::try_new(CompressionMode::Default(3), 64).unwrap();
        let mut decoder = Decoder::try_new(CompressionMode::Default(3)).unwrap();

        let payload = vec![42u8; 4096];
        let encoded = encoder.try_encode(&payload).unwrap();
        assert!(encoded.compressed);
        assert!(encoded.bytes.len() < payload.len());
        let bytes = encoded.bytes.to_vec();

        assert_eq!(decoder.try_decode(&bytes, true).unwrap(), payload.as_slice());
    }

    #[test]
    fn test_small_payload_is_sent_raw() {
        let mut encoder = Encoder::try_new(CompressionMode::Default(3), 64).unwrap();

        let encoded = encoder.try_encode(&[1, 2, 3]).unwrap();
        assert!(!encoded.compressed);
    }

    #[test]
    fn test_garbage_payload_fails_to_decode() {
        let mut decoder = Decoder::try_new(CompressionMode::Default(3)).unwrap();

        let result = decoder.try_decode(&[0xFF, 0xFE, 0xFD, 0xFC, 0x00, 0x01], true);
        assert!(matches!(
            result,
            Err(DecoderError::DecompressionFailed { .. })
                | Err(DecoderError::UpperBoundCalculationFailed { .. })
        ));
    }
}
