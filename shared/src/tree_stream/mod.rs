//! The persisted format of a binary spatial tree.
//!
//! Each node is written depth first as a `u32` tag, its bounds, and then
//! either its two children (`TAG_REGULAR`) or its payload (`TAG_LEAF`).

use std::{fs, path::Path};

use crate::wire::{
    error::SerdeErr, reader::PacketReader, serde::Serde, writer::PacketWriter,
};

pub mod error;

pub use error::TreeStreamError;

pub const TAG_REGULAR: u32 = 1;
pub const TAG_LEAF: u32 = 2;
/// Deepest nesting accepted by `read_tree`
pub const MAX_DEPTH: usize = 64;

/// Spatial extent of a subtree
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    /// center x, y, z and radius
    pub sphere: [f32; 4],
    /// first and last index of the data covered by the subtree
    pub range: [u32; 2],
}

impl Serde for Bounds {
    fn ser(&self, writer: &mut PacketWriter) {
        self.sphere.ser(writer);
        self.range.ser(writer);
    }

    fn de(reader: &mut PacketReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            sphere: <[f32; 4]>::de(reader)?,
            range: <[u32; 2]>::de(reader)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TreeNode<L> {
    Regular {
        bounds: Bounds,
        left: Box<TreeNode<L>>,
        right: Box<TreeNode<L>>,
    },
    Leaf {
        bounds: Bounds,
        payload: L,
    },
}

impl<L> TreeNode<L> {
    pub fn regular(bounds: Bounds, left: TreeNode<L>, right: TreeNode<L>) -> Self {
        TreeNode::Regular {
            bounds,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn leaf(bounds: Bounds, payload: L) -> Self {
        TreeNode::Leaf { bounds, payload }
    }

    pub fn bounds(&self) -> &Bounds {
        match self {
            TreeNode::Regular { bounds, .. } | TreeNode::Leaf { bounds, .. } => bounds,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Regular { left, right, .. } => 1 + left.depth().max(right.depth()),
            TreeNode::Leaf { .. } => 1,
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            TreeNode::Regular { left, right, .. } => left.leaf_count() + right.leaf_count(),
            TreeNode::Leaf { .. } => 1,
        }
    }
}

pub fn write_tree<L: Serde>(root: &TreeNode<L>, writer: &mut PacketWriter) {
    match root {
        TreeNode::Regular {
            bounds,
            left,
            right,
        } => {
            writer.write_u32(TAG_REGULAR);
            bounds.ser(writer);
            write_tree(left, writer);
            write_tree(right, writer);
        }
        TreeNode::Leaf { bounds, payload } => {
            writer.write_u32(TAG_LEAF);
            bounds.ser(writer);
            payload.ser(writer);
        }
    }
}

/// Reads a complete stream. Any error discards everything read so far.
pub fn read_tree<L: Serde>(bytes: &[u8]) -> Result<TreeNode<L>, TreeStreamError> {
    let mut reader = PacketReader::new(bytes);
    let root = read_node(&mut reader, 1)?;
    if !reader.is_empty() {
        return Err(TreeStreamError::TrailingBytes {
            remaining: reader.remaining(),
        });
    }
    Ok(root)
}

fn read_node<L: Serde>(
    reader: &mut PacketReader,
    depth: usize,
) -> Result<TreeNode<L>, TreeStreamError> {
    if depth > MAX_DEPTH {
        return Err(TreeStreamError::TooDeep {
            max_depth: MAX_DEPTH,
        });
    }

    let offset = reader.offset();
    match reader.read_u32()? {
        TAG_REGULAR => {
            let bounds = Bounds::de(reader)?;
            let left = read_node(reader, depth + 1)?;
            let right = read_node(reader, depth + 1)?;
            Ok(TreeNode::regular(bounds, left, right))
        }
        TAG_LEAF => {
            let bounds = Bounds::de(reader)?;
            let payload = L::de(reader)?;
            Ok(TreeNode::leaf(bounds, payload))
        }
        tag => Err(TreeStreamError::UnknownTag { tag, offset }),
    }
}

pub fn save_tree<L: Serde>(root: &TreeNode<L>, path: &Path) -> Result<(), TreeStreamError> {
    let mut writer = PacketWriter::new();
    write_tree(root, &mut writer);
    fs::write(path, writer.as_slice()).map_err(|error| TreeStreamError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    })
}

pub fn load_tree<L: Serde>(path: &Path) -> Result<TreeNode<L>, TreeStreamError> {
    let bytes = fs::read(path).map_err(|error| TreeStreamError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;
    read_tree(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(first: u32, last: u32) -> Bounds {
        Bounds {
            sphere: [0.0, 0.0, 0.0, 1.0],
            range: [first, last],
        }
    }

    fn sample() -> TreeNode<Vec<u8>> {
        TreeNode::regular(
            bounds(0, 9),
            TreeNode::leaf(bounds(0, 4), vec![1, 2, 3]),
            TreeNode::regular(
                bounds(5, 9),
                TreeNode::leaf(bounds(5, 6), vec![4]),
                TreeNode::leaf(bounds(7, 9), vec![]),
            ),
        )
    }

    fn encode(tree: &TreeNode<Vec<u8>>) -> Vec<u8> {
        let mut writer = PacketWriter::new();
        write_tree(tree, &mut writer);
        writer.to_bytes()
    }

    #[test]
    fn stream_preserves_shape_and_payloads() {
        let tree = sample();
        let read = read_tree::<Vec<u8>>(&encode(&tree)).unwrap();

        assert_eq!(read, tree);
        assert_eq!(read.depth(), 3);
        assert_eq!(read.leaf_count(), 3);
    }

    #[test]
    fn unknown_tag_fails() {
        let mut bytes = encode(&sample());
        bytes[0..4].copy_from_slice(&7u32.to_le_bytes());

        assert_eq!(
            read_tree::<Vec<u8>>(&bytes),
            Err(TreeStreamError::UnknownTag { tag: 7, offset: 0 })
        );
    }

    #[test]
    fn truncated_stream_fails() {
        let bytes = encode(&sample());
        for cut in [0, 3, 10, bytes.len() - 1] {
            assert!(matches!(
                read_tree::<Vec<u8>>(&bytes[..cut]),
                Err(TreeStreamError::Malformed(_))
            ));
        }
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut bytes = encode(&sample());
        bytes.push(0);

        assert_eq!(
            read_tree::<Vec<u8>>(&bytes),
            Err(TreeStreamError::TrailingBytes { remaining: 1 })
        );
    }

    #[test]
    fn nesting_is_capped() {
        let mut writer = PacketWriter::new();
        for _ in 0..=MAX_DEPTH {
            writer.write_u32(TAG_REGULAR);
            bounds(0, 0).ser(&mut writer);
        }

        assert_eq!(
            read_tree::<Vec<u8>>(&writer.to_bytes()),
            Err(TreeStreamError::TooDeep {
                max_depth: MAX_DEPTH
            })
        );
    }
}
