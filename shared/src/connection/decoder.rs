cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use zstd::bulk::Decompressor;

        use super::compression_config::CompressionMode;
        use super::error::DecoderError;

        pub struct Decoder {
            result: Vec<u8>,
            decoder: Option<Decompressor<'static>>,
        }

        impl Decoder {
            /// Try to create a new Decoder with the specified compression mode
            pub fn try_new(compression_mode: CompressionMode) -> Result<Self, DecoderError> {
                let decoder = match compression_mode {
                    CompressionMode::None | CompressionMode::Training(..) => None,
                    CompressionMode::Default(_) => {
                        Some(Decompressor::new().map_err(|_| DecoderError::DecompressorCreationFailed)?)
                    }
                    CompressionMode::Dictionary(_, dictionary) => Some(
                        Decompressor::with_dictionary(&dictionary).map_err(|_| DecoderError::DecompressorWithDictionaryFailed)?,
                    ),
                };

                Ok(Self {
                    decoder,
                    result: Vec::new(),
                })
            }

            /// Create a new Decoder with the specified compression mode
            ///
            /// # Panics
            /// Panics if the decompressor cannot be created with the given configuration
            pub fn new(compression_mode: CompressionMode) -> Self {
                Self::try_new(compression_mode).expect("Failed to create Decoder")
            }

            /// Try to decode a payload, returning error on decompression failure
            ///
            /// SECURITY: This method processes untrusted network data. Any malformed or
            /// malicious payload will return an error instead of panicking.
            pub fn try_decode(&mut self, payload: &[u8], compressed: bool) -> Result<&[u8], DecoderError> {
                if !compressed {
                    self.result = payload.to_vec();
                    return Ok(&self.result);
                }

                let Some(decoder) = &mut self.decoder else {
                    return Err(DecoderError::CompressionUnsupported {
                        payload_size: payload.len(),
                    });
                };

                let upper_bound = Decompressor::<'static>::upper_bound(payload)
                    .map_err(|_| DecoderError::UpperBoundCalculationFailed {
                        payload_size: payload.len(),
                    })?;

                self.result = decoder
                    .decompress(payload, upper_bound)
                    .map_err(|_| DecoderError::DecompressionFailed {
                        payload_size: payload.len(),
                    })?;
                Ok(&self.result)
            }
        }
    }
    else
    {
        use super::compression_config::CompressionMode;
        use super::error::DecoderError;

        pub struct Decoder {
            result: Vec<u8>,
        }

        impl Decoder {
            pub fn try_new(_: CompressionMode) -> Result<Self, DecoderError> {
                Ok(Self {
                    result: Vec::new(),
                })
            }

            pub fn new(compression_mode: CompressionMode) -> Self {
                Self::try_new(compression_mode).expect("Failed to create Decoder")
            }

            pub fn try_decode(&mut self, payload: &[u8], compressed: bool) -> Result<&[u8], DecoderError> {
                if compressed {
                    return Err(DecoderError::CompressionUnsupported {
                        payload_size: payload.len(),
                    });
                }
                self.result = payload.to_vec();
                Ok(&self.result)
            }
        }
    }
}
