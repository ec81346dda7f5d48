pub mod error;
pub mod reader;
pub mod serde;
pub mod writer;
