use std::io::Write;

use flate2::write::ZlibEncoder;
use pbf_wire::{Blob, BlobEncoding, WireError};

use crate::error::EncodeError;

/// Zstd level used for blob payloads.
const ZSTD_LEVEL: i32 = 3;

/// How the writer packs each block into its blob.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Stored verbatim in the `raw` field.
    None,
    /// Deflate with a zlib wrapper. What nearly every PBF producer emits.
    #[default]
    Zlib,
    Zstd,
}

impl Compression {
    #[must_use]
    pub fn encoding(self) -> BlobEncoding {
        match self {
            Self::None => BlobEncoding::Raw,
            Self::Zlib => BlobEncoding::Zlib,
            Self::Zstd => BlobEncoding::Zstd,
        }
    }
}

/// Wrap serialized block bytes in a blob using `compression`.
///
/// `raw_size` is always set, including for raw blobs.
///
/// # Errors
///
/// Fails if the compressor reports an I/O error or the input is too
/// large for the `i32` size field.
pub fn compress_blob(data: Vec<u8>, compression: Compression) -> Result<Blob, EncodeError> {
    let raw_size = i32::try_from(data.len()).map_err(|_| WireError::LengthOverflow {
        length: data.len() as u64,
    })?;

    let blob = match compression {
        Compression::None => Blob::raw(data),
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&data)?;
            Blob::compressed(BlobEncoding::Zlib, encoder.finish()?, raw_size)
        }
        Compression::Zstd => {
            let compressed = zstd::bulk::compress(&data, ZSTD_LEVEL)?;
            Blob::compressed(BlobEncoding::Zstd, compressed, raw_size)
        }
    };
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_materializes_to_the_input() {
        let data = b"name=Hauptstrasse ".repeat(200);
        for compression in [Compression::None, Compression::Zlib, Compression::Zstd] {
            let blob = compress_blob(data.clone(), compression).unwrap();
            assert_eq!(blob.encoding(), Some(compression.encoding()));
            assert_eq!(blob.declared_size(), Some(data.len() as i64));
            let restored = pbf_decoder::materialize(&blob, usize::MAX).unwrap();
            assert_eq!(restored, data);
        }
    }

    #[test]
    fn compression_shrinks_repetitive_data() {
        let data = b"highway=residential ".repeat(500);
        for compression in [Compression::Zlib, Compression::Zstd] {
            let blob = compress_blob(data.clone(), compression).unwrap();
            let payload = blob.payload.unwrap();
            assert!(payload.data.len() < data.len());
        }
    }
}
