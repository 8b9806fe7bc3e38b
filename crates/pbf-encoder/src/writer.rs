use std::io::Write;

use pbf_types::{HeaderBlock, PrimitiveBlock};
use pbf_wire::Blob;
use pbf_wire::frame::{MAX_BLOB_SIZE, OSM_DATA, OSM_HEADER, write_frame};

use crate::compression::{Compression, compress_blob};
use crate::error::EncodeError;

/// Streaming PBF writer.
///
/// Write the header block first, then any number of data blocks:
///
/// ```rust
/// use pbf_encoder::{BlockBuilder, Compression, PbfWriter};
/// use pbf_types::HeaderBlock;
///
/// let mut writer = PbfWriter::new(Vec::new(), Compression::Zlib);
/// writer.write_header(&HeaderBlock {
///     required_features: vec!["OsmSchema-V0.6".into(), "DenseNodes".into()],
///     ..HeaderBlock::default()
/// })?;
/// let mut block = BlockBuilder::new();
/// block.add_point(1, 48.85, 2.35, &[]);
/// writer.write_block(&block.build())?;
/// let bytes = writer.finish()?;
/// assert!(!bytes.is_empty());
/// # Ok::<(), pbf_encoder::EncodeError>(())
/// ```
///
/// Ordering is not enforced; tests use that to produce files a reader
/// must reject.
pub struct PbfWriter<W: Write> {
    inner: W,
    compression: Compression,
    bytes_written: u64,
    frames_written: u64,
}

impl<W: Write> PbfWriter<W> {
    pub fn new(inner: W, compression: Compression) -> Self {
        Self {
            inner,
            compression,
            bytes_written: 0,
            frames_written: 0,
        }
    }

    /// Write the `OSMHeader` frame.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or if the header exceeds the blob limit.
    pub fn write_header(&mut self, header: &HeaderBlock) -> Result<usize, EncodeError> {
        self.write_message(OSM_HEADER, header.encode_body())
    }

    /// Write one `OSMData` frame.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or if the block exceeds the blob limit.
    pub fn write_block(&mut self, block: &PrimitiveBlock) -> Result<usize, EncodeError> {
        self.write_message(OSM_DATA, block.encode_body())
    }

    /// Write a frame with an arbitrary type and a prepared blob.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors.
    pub fn write_raw_frame(&mut self, frame_type: &str, blob: &Blob) -> Result<usize, EncodeError> {
        let n = write_frame(&mut self.inner, frame_type, blob)?;
        self.bytes_written += n as u64;
        self.frames_written += 1;
        Ok(n)
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and return the underlying sink.
    ///
    /// # Errors
    ///
    /// Fails if the flush fails.
    pub fn finish(mut self) -> Result<W, EncodeError> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn write_message(&mut self, frame_type: &str, body: Vec<u8>) -> Result<usize, EncodeError> {
        if body.len() > MAX_BLOB_SIZE {
            return Err(EncodeError::BlockTooLarge {
                size: body.len(),
                limit: MAX_BLOB_SIZE,
            });
        }
        let blob = compress_blob(body, self.compression)?;
        self.write_raw_frame(frame_type, &blob)
    }
}
