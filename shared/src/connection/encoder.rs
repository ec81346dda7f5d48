cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use std::{fs, path::PathBuf};

        use log::info;

        use zstd::{bulk::Compressor, dict::from_continuous};

        use super::compression_config::CompressionMode;
        use super::error::EncoderError;

        pub struct Encoder {
            result: Vec<u8>,
            min_payload_size: usize,
            encoder: EncoderType,
        }

        impl Encoder {
            /// Try to create a new Encoder with the specified compression mode
            pub fn try_new(compression_mode: CompressionMode, min_payload_size: usize) -> Result<Self, EncoderError> {
                let encoder = match compression_mode {
                    CompressionMode::None => EncoderType::Passthrough,
                    CompressionMode::Training(sample_size, path) => {
                        EncoderType::DictionaryTrainer(DictionaryTrainer::new(sample_size, path))
                    }
                    CompressionMode::Default(compression_level) => EncoderType::Compressor(
                        Compressor::new(compression_level).map_err(|_| EncoderError::CompressorCreationFailed {
                            level: compression_level,
                        })?,
                    ),
                    CompressionMode::Dictionary(compression_level, dictionary) => EncoderType::Compressor(
                        Compressor::with_dictionary(compression_level, &dictionary)
                            .map_err(|_| EncoderError::CompressorWithDictionaryFailed {
                                level: compression_level,
                            })?,
                    ),
                };

                Ok(Self {
                    result: Vec::new(),
                    min_payload_size,
                    encoder,
                })
            }

            /// Create a new Encoder with the specified compression mode
            ///
            /// # Panics
            /// Panics if the compressor cannot be created with the given configuration
            pub fn new(compression_mode: CompressionMode, min_payload_size: usize) -> Self {
                Self::try_new(compression_mode, min_payload_size).expect("Failed to create Encoder")
            }

            /// Try to encode a payload. The compressed form is only used when it
            /// is smaller than the input.
            pub fn try_encode(&mut self, payload: &[u8]) -> Result<Encoded<'_>, EncoderError> {
                match &mut self.encoder {
                    EncoderType::Passthrough => Ok(Encoded::raw(payload, &mut self.result)),
                    EncoderType::DictionaryTrainer(trainer) => {
                        trainer.try_record_bytes(payload)?;
                        Ok(Encoded::raw(payload, &mut self.result))
                    }
                    EncoderType::Compressor(encoder) => {
                        if payload.len() < self.min_payload_size {
                            return Ok(Encoded::raw(payload, &mut self.result));
                        }
                        let compressed = encoder.compress(payload).map_err(|_| EncoderError::CompressionFailed {
                            payload_size: payload.len(),
                        })?;
                        if compressed.len() >= payload.len() {
                            return Ok(Encoded::raw(payload, &mut self.result));
                        }
                        self.result = compressed;
                        Ok(Encoded {
                            bytes: &self.result,
                            compressed: true,
                        })
                    }
                }
            }

            /// Encode a payload
            ///
            /// # Panics
            /// Panics if compression fails
            pub fn encode(&mut self, payload: &[u8]) -> Encoded<'_> {
                self.try_encode(payload).expect("Failed to encode payload")
            }
        }

        pub enum EncoderType {
            Passthrough,
            Compressor(Compressor<'static>),
            DictionaryTrainer(DictionaryTrainer),
        }

        pub struct DictionaryTrainer {
            sample_data: Vec<u8>,
            sample_sizes: Vec<usize>,
            next_alert_size: usize,
            target_sample_size: usize,
            output: PathBuf,
            training_complete: bool,
        }

        impl DictionaryTrainer {
            /// `target_sample_size` is the number of payloads to train on
            pub fn new(target_sample_size: usize, output: PathBuf) -> Self {
                Self {
                    target_sample_size,
                    sample_data: Vec::new(),
                    sample_sizes: Vec::new(),
                    next_alert_size: 0,
                    output,
                    training_complete: false,
                }
            }

            /// Try to record bytes for dictionary training, returning error on failure
            pub fn try_record_bytes(&mut self, bytes: &[u8]) -> Result<(), EncoderError> {
                if self.training_complete {
                    return Ok(());
                }

                self.sample_data.extend_from_slice(bytes);
                self.sample_sizes.push(bytes.len());

                let current_sample_size = self.sample_sizes.len();

                if current_sample_size >= self.next_alert_size {
                    let percent =
                        ((self.next_alert_size as f32) / (self.target_sample_size as f32)) * 100.0;
                    info!("Frame data dictionary training: {}% complete", percent);

                    self.next_alert_size += (self.target_sample_size / 20).max(1);
                }

                if current_sample_size >= self.target_sample_size {
                    info!(
                        "Frame data dictionary training complete. Samples: {} ({} bytes)",
                        self.sample_sizes.len(),
                        self.sample_data.len()
                    );

                    let target_dict_size = (self.sample_data.len() / 100).max(256);
                    let dictionary =
                        from_continuous(&self.sample_data, &self.sample_sizes, target_dict_size)
                            .map_err(|_| EncoderError::DictionaryTrainingFailed {
                                sample_count: self.sample_sizes.len(),
                                total_bytes: self.sample_data.len(),
                            })?;

                    fs::write(&self.output, &dictionary).map_err(|_| {
                        EncoderError::DictionaryWriteFailed {
                            path: self.output.display().to_string(),
                        }
                    })?;

                    info!("Dictionary written to `{}`", self.output.display());

                    self.training_complete = true;
                    self.sample_data.clear();
                    self.sample_sizes.clear();
                }

                Ok(())
            }
        }
    }
    else
    {
        use super::compression_config::CompressionMode;
        use super::error::EncoderError;

        pub struct Encoder {
            result: Vec<u8>
        }

        impl Encoder {
            pub fn try_new(_: CompressionMode, _: usize) -> Result<Self, EncoderError> {
                Ok(Self {
                    result: Vec::new(),
                })
            }

            pub fn new(compression_mode: CompressionMode, min_payload_size: usize) -> Self {
                Self::try_new(compression_mode, min_payload_size).expect("Failed to create Encoder")
            }

            pub fn try_encode(&mut self, payload: &[u8]) -> Result<Encoded<'_>, EncoderError> {
                Ok(Encoded::raw(payload, &mut self.result))
            }

            pub fn encode(&mut self, payload: &[u8]) -> Encoded<'_> {
                Encoded::raw(payload, &mut self.result)
            }
        }
    }
}

/// The output of an encoder, borrowed from its internal buffer
pub struct Encoded<'e> {
    pub bytes: &'e [u8],
    /// Whether `bytes` must go through a decoder on the receiving side
    pub compressed: bool,
}

impl<'e> Encoded<'e> {
    fn raw(payload: &[u8], buffer: &'e mut Vec<u8>) -> Self {
        buffer.clear();
        buffer.extend_from_slice(payload);
        Self {
            bytes: buffer,
            compressed: false,
        }
    }
}
