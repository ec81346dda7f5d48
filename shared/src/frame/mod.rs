pub mod error;
pub mod frame_data;
pub mod image;
