use prost::Message;

use crate::error::WireError;
use crate::proto::{self, blob::Data};

/// Compression applied to a blob payload.
///
/// Each encoding is a distinct field of the `Blob` message; a writer sets
/// exactly one of them.
///
/// ```text
/// ┌───────┬─────────────────────┬───────────────────────────┐
/// │ Field │ Encoding            │ Decoder support           │
/// ├───────┼─────────────────────┼───────────────────────────┤
/// │ 1     │ Raw                 │ copied verbatim           │
/// │ 3     │ Zlib                │ inflate                   │
/// │ 4     │ Lzma                │ unsupported               │
/// │ 5     │ Bzip2 (obsolete)    │ unsupported               │
/// │ 6     │ Lz4                 │ unsupported               │
/// │ 7     │ Zstd                │ zstd                      │
/// └───────┴─────────────────────┴───────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlobEncoding {
    Raw,
    Zlib,
    Lzma,
    Bzip2,
    Lz4,
    Zstd,
}

impl BlobEncoding {
    /// Lower-case name used in diagnostics and the CLI.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Zlib => "zlib",
            Self::Lzma => "lzma",
            Self::Bzip2 => "bzip2",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }
}

/// The populated data field of a blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobPayload {
    pub encoding: BlobEncoding,
    pub data: Vec<u8>,
}

/// The blob envelope that follows each frame header.
///
/// `raw_size` (field 2) is the uncompressed length. Writers set it for
/// every compressed payload; raw payloads may omit it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blob {
    pub raw_size: Option<i32>,
    pub payload: Option<BlobPayload>,
}

impl Blob {
    /// An uncompressed blob.
    #[must_use]
    pub fn raw(data: Vec<u8>) -> Self {
        let raw_size = i32::try_from(data.len()).ok();
        Self {
            raw_size,
            payload: Some(BlobPayload {
                encoding: BlobEncoding::Raw,
                data,
            }),
        }
    }

    /// A compressed blob whose content inflates to `raw_size` bytes.
    #[must_use]
    pub fn compressed(encoding: BlobEncoding, data: Vec<u8>, raw_size: i32) -> Self {
        Self {
            raw_size: Some(raw_size),
            payload: Some(BlobPayload { encoding, data }),
        }
    }

    /// Encoding of the populated data field, if any.
    #[must_use]
    pub fn encoding(&self) -> Option<BlobEncoding> {
        self.payload.as_ref().map(|p| p.encoding)
    }

    /// The size the payload should have once materialized.
    ///
    /// Raw blobs without `raw_size` report their own length.
    #[must_use]
    pub fn declared_size(&self) -> Option<i64> {
        match (&self.payload, self.raw_size) {
            (_, Some(size)) => Some(i64::from(size)),
            (Some(payload), None) if payload.encoding == BlobEncoding::Raw => {
                i64::try_from(payload.data.len()).ok()
            }
            _ => None,
        }
    }

    /// Decode a blob envelope.
    ///
    /// When a (malformed) writer sets several data fields the last one
    /// wins, the usual protobuf rule for `oneof` members.
    ///
    /// # Errors
    ///
    /// Fails if the envelope bytes are not a well-formed message.
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        Ok(proto::Blob::decode(buf)?.into())
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        proto::Blob::from(self).encode_to_vec()
    }
}

impl From<proto::Blob> for Blob {
    fn from(msg: proto::Blob) -> Self {
        let payload = msg.data.map(|data| {
            let (encoding, data) = match data {
                Data::Raw(d) => (BlobEncoding::Raw, d),
                Data::ZlibData(d) => (BlobEncoding::Zlib, d),
                Data::LzmaData(d) => (BlobEncoding::Lzma, d),
                Data::ObsoleteBzip2Data(d) => (BlobEncoding::Bzip2, d),
                Data::Lz4Data(d) => (BlobEncoding::Lz4, d),
                Data::ZstdData(d) => (BlobEncoding::Zstd, d),
            };
            BlobPayload { encoding, data }
        });
        Self {
            raw_size: msg.raw_size,
            payload,
        }
    }
}

impl From<&Blob> for proto::Blob {
    fn from(blob: &Blob) -> Self {
        let data = blob.payload.as_ref().map(|p| {
            let bytes = p.data.clone();
            match p.encoding {
                BlobEncoding::Raw => Data::Raw(bytes),
                BlobEncoding::Zlib => Data::ZlibData(bytes),
                BlobEncoding::Lzma => Data::LzmaData(bytes),
                BlobEncoding::Bzip2 => Data::ObsoleteBzip2Data(bytes),
                BlobEncoding::Lz4 => Data::Lz4Data(bytes),
                BlobEncoding::Zstd => Data::ZstdData(bytes),
            }
        });
        Self {
            raw_size: blob.raw_size,
            data,
        }
    }
}
