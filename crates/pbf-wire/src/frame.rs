use std::io::Write;

use prost::Message;

use crate::blob::Blob;
use crate::error::WireError;
use crate::proto;

/// Size of the big-endian length prefix in front of every frame header.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound for a serialized frame header (64 KiB).
pub const MAX_HEADER_SIZE: usize = 64 * 1024;

/// Upper bound for a serialized blob and for its uncompressed content (32 MiB).
pub const MAX_BLOB_SIZE: usize = 32 * 1024 * 1024;

/// Frame type of the single header frame that opens a file.
pub const OSM_HEADER: &str = "OSMHeader";

/// Frame type of every content frame.
pub const OSM_DATA: &str = "OSMData";

/// One frame on the wire:
///
/// ```text
/// ┌──────────────────────────────────────────────────┐
/// │ header_len   (i32, big-endian, 4 bytes)          │
/// │ FrameHeader  [header_len bytes, protobuf]        │
/// │ Blob         [FrameHeader.data_size bytes]       │
/// └──────────────────────────────────────────────────┘
/// ```
///
/// The length prefix is signed on the wire. Callers reject negative
/// values and anything above [`MAX_HEADER_SIZE`] before reading further.
#[must_use]
pub fn decode_length_prefix(bytes: [u8; LENGTH_PREFIX_SIZE]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// Encode a header length as the 4-byte prefix.
///
/// # Errors
///
/// Returns [`WireError::LengthOverflow`] if `len` does not fit an `i32`.
pub fn encode_length_prefix(len: usize) -> Result<[u8; LENGTH_PREFIX_SIZE], WireError> {
    let len = i32::try_from(len).map_err(|_| WireError::LengthOverflow { length: len as u64 })?;
    Ok(len.to_be_bytes())
}

/// The per-frame header message (`BlobHeader` in the PBF schema).
///
/// | Field | Name        | Type   |
/// |-------|-------------|--------|
/// | 1     | `type`      | string |
/// | 2     | `indexdata` | bytes  |
/// | 3     | `datasize`  | int32  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    /// `"OSMHeader"` for the first frame, `"OSMData"` for content frames.
    pub frame_type: String,

    /// Opaque index bytes some writers attach. Never interpreted here.
    pub index_data: Option<Vec<u8>>,

    /// Size in bytes of the serialized blob that follows.
    pub data_size: i32,
}

impl FrameHeader {
    #[must_use]
    pub fn new(frame_type: &str, data_size: i32) -> Self {
        Self {
            frame_type: frame_type.to_string(),
            index_data: None,
            data_size,
        }
    }

    /// Whether this frame carries a data block.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.frame_type == OSM_DATA
    }

    /// Decode a header from exactly the bytes announced by the length prefix.
    ///
    /// # Errors
    ///
    /// Fails if the body is malformed or `type`/`datasize` are missing.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        let msg = proto::BlobHeader::decode(buf)?;
        let missing = |field| WireError::MissingRequiredField {
            message: "BlobHeader",
            field,
        };
        Ok(Self {
            frame_type: msg.r#type.ok_or_else(|| missing("type"))?,
            index_data: msg.indexdata,
            data_size: msg.datasize.ok_or_else(|| missing("datasize"))?,
        })
    }

    /// Serialize the header message (without the length prefix).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        proto::BlobHeader {
            r#type: Some(self.frame_type.clone()),
            indexdata: self.index_data.clone(),
            datasize: Some(self.data_size),
        }
        .encode_to_vec()
    }
}

/// Write one complete frame (prefix, header, blob) to `w`.
///
/// # Returns
///
/// Total number of bytes written.
///
/// # Errors
///
/// Fails on I/O errors or when the blob is too large for an `i32` size.
pub fn write_frame(w: &mut impl Write, frame_type: &str, blob: &Blob) -> Result<usize, WireError> {
    let blob_bytes = blob.encode();
    let data_size = i32::try_from(blob_bytes.len()).map_err(|_| WireError::LengthOverflow {
        length: blob_bytes.len() as u64,
    })?;
    let header = FrameHeader::new(frame_type, data_size).encode();
    let prefix = encode_length_prefix(header.len())?;

    w.write_all(&prefix)?;
    w.write_all(&header)?;
    w.write_all(&blob_bytes)?;

    Ok(prefix.len() + header.len() + blob_bytes.len())
}
