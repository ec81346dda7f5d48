use thiserror::Error;

use crate::wire::error::SerdeErr;

/// Errors that can occur while reading a persisted tree stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeStreamError {
    /// A node starts with a tag that is neither `TAG_REGULAR` nor `TAG_LEAF`
    #[error("Unknown node tag {tag:#x} at offset {offset}")]
    UnknownTag {
        tag: u32,
        offset: usize,
    },

    /// The stream ended inside a node, or a field is invalid
    #[error("Malformed tree stream: {0}")]
    Malformed(#[from] SerdeErr),

    /// Bytes remain after the root node
    #[error("Tree stream has {remaining} trailing bytes after the root node")]
    TrailingBytes {
        remaining: usize,
    },

    /// The tree nests deeper than `max_depth`
    #[error("Tree stream nests deeper than {max_depth} levels")]
    TooDeep {
        max_depth: usize,
    },

    /// The stream file could not be read or written
    #[error("Failed to access tree stream file {path}: {message}")]
    Io {
        path: String,
        message: String,
    },
}
