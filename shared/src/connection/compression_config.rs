use std::path::PathBuf;

/// Compression settings for frame data transmitted between nodes
#[derive(Clone, Debug, Default)]
pub struct CompressionConfig {
    /// `None` sends pixel payloads uncompressed
    pub frame_data: Option<CompressionMode>,
    /// Payloads smaller than this are never compressed
    pub min_payload_size: usize,
}

impl CompressionConfig {
    pub fn new(frame_data: Option<CompressionMode>) -> Self {
        Self {
            frame_data,
            min_payload_size: 64,
        }
    }

    /// The mode used to build encoders and decoders
    pub fn mode(&self) -> CompressionMode {
        self.frame_data.clone().unwrap_or(CompressionMode::None)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompressionMode {
    /// Payloads pass through untouched
    None,
    /// Compression Mode using default zstd dictionary & specified compression
    /// level. This should range from -7 (fastest) to 22 (smallest).
    Default(i32),
    /// Compression Mode using custom dictionary & specified compression level.
    /// This should range from -7 (fastest) to 22 (smallest).
    Dictionary(i32, Vec<u8>),
    /// Dictionary training mode: records the given number of payloads, then
    /// writes a trained dictionary to the given path. Payloads are sent
    /// uncompressed meanwhile.
    Training(usize, PathBuf),
}

impl CompressionMode {
    pub fn is_enabled(&self) -> bool {
        matches!(self, CompressionMode::Default(_) | CompressionMode::Dictionary(..))
    }
}
