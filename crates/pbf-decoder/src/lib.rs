#![warn(clippy::pedantic)]

pub mod error;
pub mod block;
pub mod decompression;
pub mod frame_reader;
pub mod dense;
pub mod node;
pub mod way;
pub mod relation;

pub use block::{BlockContext, classify, decode_block};
pub use decompression::materialize;
pub use dense::DenseNodeIter;
pub use error::DecodeError;
pub use frame_reader::{FrameReader, ReaderLimits};
pub use node::decode_node;
pub use relation::decode_relation;
pub use way::decode_way;
