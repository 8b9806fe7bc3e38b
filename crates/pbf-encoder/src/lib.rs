#![warn(clippy::pedantic)]

pub mod error;
pub mod block_builder;
pub mod compression;
pub mod writer;

pub use block_builder::{BlockBuilder, Member};
pub use compression::Compression;
pub use error::EncodeError;
pub use writer::PbfWriter;
