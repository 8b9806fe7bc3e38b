use flate2::{Decompress, FlushDecompress, Status};
use pbf_wire::{Blob, BlobEncoding, BlobPayload};

use crate::error::DecodeError;

/// Turn a blob into the flat bytes of the block it carries.
///
/// `max_size` bounds the declared uncompressed size; blobs announcing more
/// are rejected before any allocation.
///
/// | Encoding             | Result                                         |
/// |----------------------|------------------------------------------------|
/// | raw                  | payload copied verbatim                        |
/// | zlib                 | inflated, must produce exactly `raw_size`      |
/// | zstd                 | decompressed, must produce exactly `raw_size`  |
/// | lzma, bzip2, lz4     | [`DecodeError::UnsupportedEncoding`]           |
/// | (no data field)      | [`DecodeError::EmptyBlob`]                     |
///
/// # Errors
///
/// See the table above. A compressed blob without `raw_size`, or with one
/// that is negative or above `max_size`, is [`DecodeError::MalformedBlob`].
pub fn materialize(blob: &Blob, max_size: usize) -> Result<Vec<u8>, DecodeError> {
    let Some(BlobPayload { encoding, data }) = &blob.payload else {
        return Err(DecodeError::EmptyBlob);
    };

    if *encoding == BlobEncoding::Raw {
        check_declared(blob.raw_size.map(i64::from), max_size)?;
        return Ok(data.clone());
    }

    let expected = match blob.raw_size {
        Some(size) => check_declared(Some(i64::from(size)), max_size)?,
        None => {
            return Err(DecodeError::MalformedBlob {
                reason: format!("{} blob without raw_size", encoding.name()),
            });
        }
    };

    match encoding {
        BlobEncoding::Zlib => inflate(data, expected),
        BlobEncoding::Zstd => unzstd(data, expected),
        other => Err(DecodeError::UnsupportedEncoding {
            encoding: other.name(),
        }),
    }
}

fn check_declared(size: Option<i64>, max_size: usize) -> Result<usize, DecodeError> {
    let Some(size) = size else {
        return Ok(0);
    };
    match usize::try_from(size) {
        Ok(size) if size <= max_size => Ok(size),
        _ => Err(DecodeError::MalformedBlob {
            reason: format!("declared size {size} outside 0..={max_size}"),
        }),
    }
}

fn inflate(data: &[u8], expected: usize) -> Result<Vec<u8>, DecodeError> {
    let failed = |reason: String| DecodeError::DecompressionFailed {
        encoding: "zlib",
        reason,
    };

    // One spare byte so an over-long stream shows up as a size mismatch.
    let mut out = Vec::with_capacity(expected + 1);
    let mut inflater = Decompress::new(true);
    let status = inflater
        .decompress_vec(data, &mut out, FlushDecompress::Finish)
        .map_err(|e| failed(e.to_string()))?;

    if status != Status::StreamEnd {
        return Err(failed(format!(
            "stream did not finish ({} of {expected} bytes produced)",
            out.len()
        )));
    }
    if out.len() != expected {
        return Err(failed(format!(
            "produced {} bytes, expected {expected}",
            out.len()
        )));
    }
    if inflater.total_in() != data.len() as u64 {
        return Err(failed(format!(
            "{} trailing input bytes",
            data.len() as u64 - inflater.total_in()
        )));
    }
    Ok(out)
}

fn unzstd(data: &[u8], expected: usize) -> Result<Vec<u8>, DecodeError> {
    let out = zstd::bulk::decompress(data, expected).map_err(|e| {
        DecodeError::DecompressionFailed {
            encoding: "zstd",
            reason: e.to_string(),
        }
    })?;
    if out.len() != expected {
        return Err(DecodeError::DecompressionFailed {
            encoding: "zstd",
            reason: format!("produced {} bytes, expected {expected}", out.len()),
        });
    }
    Ok(out)
}
