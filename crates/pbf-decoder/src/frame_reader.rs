use pbf_types::{HeaderBlock, PrimitiveBlock};
use pbf_wire::frame::{
    LENGTH_PREFIX_SIZE, MAX_BLOB_SIZE, MAX_HEADER_SIZE, OSM_DATA, OSM_HEADER, decode_length_prefix,
};
use pbf_wire::{Blob, FrameHeader};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::block::decode_block;
use crate::decompression::materialize;
use crate::error::DecodeError;

/// Size bounds enforced before anything is allocated or read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReaderLimits {
    /// Largest accepted frame header. Default: 64 KiB.
    pub max_header_size: usize,

    /// Largest accepted blob, and largest accepted uncompressed block.
    /// Default: 32 MiB.
    pub max_blob_size: usize,
}

impl Default for ReaderLimits {
    fn default() -> Self {
        Self {
            max_header_size: MAX_HEADER_SIZE,
            max_blob_size: MAX_BLOB_SIZE,
        }
    }
}

/// Asynchronous reader that pulls frames off a PBF byte stream.
///
/// A file is a sequence of frames:
///
/// ```text
///   [len][FrameHeader "OSMHeader"][Blob → HeaderBlock]
///   [len][FrameHeader "OSMData"  ][Blob → PrimitiveBlock]
///   [len][FrameHeader "OSMData"  ][Blob → PrimitiveBlock]
///   ... (clean end of input)
/// ```
///
/// Nothing is read ahead: each call consumes exactly one frame header or
/// one blob. Size checks run before the corresponding bytes are read, so
/// an absurd length prefix never turns into an allocation.
pub struct FrameReader<R> {
    reader: R,
    limits: ReaderLimits,
    /// Reused across frames for header and blob bodies.
    buf: Vec<u8>,
    bytes_read: u64,
    frames_read: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, ReaderLimits::default())
    }

    #[must_use]
    pub fn with_limits(reader: R, limits: ReaderLimits) -> Self {
        Self {
            reader,
            limits,
            buf: Vec::with_capacity(4096),
            bytes_read: 0,
            frames_read: 0,
        }
    }

    /// Total bytes consumed from the underlying reader.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of complete frame headers read so far.
    #[must_use]
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    #[must_use]
    pub fn limits(&self) -> ReaderLimits {
        self.limits
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read the next frame header.
    ///
    /// Returns `Ok(None)` when the input ends cleanly before the first byte
    /// of a length prefix. That check comes before any size validation.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedHeader`] if the prefix is cut short, is
    /// negative or exceeds the header limit, if the header body is cut
    /// short, or if it does not parse.
    pub async fn read_frame_header(&mut self) -> Result<Option<FrameHeader>, DecodeError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let mut filled = 0;
        while filled < LENGTH_PREFIX_SIZE {
            let n = self.reader.read(&mut prefix[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(DecodeError::MalformedHeader {
                    reason: format!("length prefix truncated after {filled} bytes"),
                });
            }
            filled += n;
        }
        self.bytes_read += LENGTH_PREFIX_SIZE as u64;

        let len = decode_length_prefix(prefix);
        let len = match usize::try_from(len) {
            Ok(len) if len <= self.limits.max_header_size => len,
            _ => {
                return Err(DecodeError::MalformedHeader {
                    reason: format!(
                        "header size {len} outside 0..={}",
                        self.limits.max_header_size
                    ),
                });
            }
        };

        self.fill(len).await.map_err(|e| DecodeError::MalformedHeader {
            reason: format!("header body: {e}"),
        })?;
        let header = FrameHeader::decode(&self.buf).map_err(|e| DecodeError::MalformedHeader {
            reason: e.to_string(),
        })?;

        self.frames_read += 1;
        tracing::debug!(
            frame = self.frames_read,
            frame_type = %header.frame_type,
            data_size = header.data_size,
            "read frame header"
        );
        Ok(Some(header))
    }

    /// Read the blob announced by `header`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedBlob`] if `datasize` is negative or exceeds
    /// the blob limit (checked before reading), if the input ends early, or
    /// if the envelope does not parse.
    pub async fn read_blob(&mut self, header: &FrameHeader) -> Result<Blob, DecodeError> {
        let size = match usize::try_from(header.data_size) {
            Ok(size) if size <= self.limits.max_blob_size => size,
            _ => {
                return Err(DecodeError::MalformedBlob {
                    reason: format!(
                        "datasize {} outside 0..={}",
                        header.data_size, self.limits.max_blob_size
                    ),
                });
            }
        };

        self.fill(size).await.map_err(|e| DecodeError::MalformedBlob {
            reason: format!("blob body: {e}"),
        })?;
        Blob::decode(&self.buf).map_err(|e| DecodeError::MalformedBlob {
            reason: e.to_string(),
        })
    }

    /// Read one whole frame. `Ok(None)` at a clean end of input.
    ///
    /// # Errors
    ///
    /// Anything [`read_frame_header`](Self::read_frame_header) or
    /// [`read_blob`](Self::read_blob) reports.
    pub async fn next_frame(&mut self) -> Result<Option<(FrameHeader, Blob)>, DecodeError> {
        let Some(header) = self.read_frame_header().await? else {
            return Ok(None);
        };
        let blob = self.read_blob(&header).await?;
        Ok(Some((header, blob)))
    }

    /// Read the `OSMHeader` frame that must open the stream.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::MalformedHeader`] if the stream is empty.
    /// - [`DecodeError::UnexpectedFrameType`] if the first frame is
    ///   anything else.
    /// - Blob and decompression errors as for [`next_block`](Self::next_block).
    /// - [`DecodeError::MalformedBlock`] if the header block does not parse.
    pub async fn read_header_block(&mut self) -> Result<HeaderBlock, DecodeError> {
        let Some(header) = self.read_frame_header().await? else {
            return Err(DecodeError::MalformedHeader {
                reason: "input ended before the OSMHeader frame".to_string(),
            });
        };
        if header.frame_type != OSM_HEADER {
            return Err(DecodeError::UnexpectedFrameType {
                expected: OSM_HEADER,
                found: header.frame_type,
            });
        }
        let blob = self.read_blob(&header).await?;
        let bytes = materialize(&blob, self.limits.max_blob_size)?;
        HeaderBlock::decode_body(&bytes).map_err(|e| DecodeError::MalformedBlock {
            reason: format!("header block: {e}"),
        })
    }

    /// Read, decompress and decode the next data block.
    ///
    /// Returns `Ok(None)` at a clean end of input and also when the next
    /// frame is not `OSMData`; in the latter case the frame's blob is left
    /// unread.
    ///
    /// # Errors
    ///
    /// Any frame, blob, decompression or block decoding error.
    pub async fn next_block(&mut self) -> Result<Option<PrimitiveBlock>, DecodeError> {
        let Some(header) = self.read_frame_header().await? else {
            return Ok(None);
        };
        if header.frame_type != OSM_DATA {
            tracing::debug!(
                frame_type = %header.frame_type,
                "non-data frame ends the block stream"
            );
            return Ok(None);
        }
        let blob = self.read_blob(&header).await?;
        let bytes = materialize(&blob, self.limits.max_blob_size)?;
        decode_block(&bytes).map(Some)
    }

    /// Read exactly `len` bytes into the scratch buffer.
    async fn fill(&mut self, len: usize) -> std::io::Result<()> {
        self.buf.clear();
        self.buf.resize(len, 0);
        self.reader.read_exact(&mut self.buf).await?;
        self.bytes_read += len as u64;
        Ok(())
    }
}
