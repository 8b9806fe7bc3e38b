#![warn(clippy::pedantic)]

pub mod blob;
pub mod error;
pub mod frame;
pub mod proto;

pub use blob::{Blob, BlobEncoding, BlobPayload};
pub use error::WireError;
pub use frame::FrameHeader;
