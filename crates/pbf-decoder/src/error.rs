/// Errors that can occur while turning PBF bytes into entities.
///
/// Variants follow the layer at which decoding failed, from the outermost
/// frame down to a single relation member:
///
/// ```text
///   DecodeError
///   ├── MalformedHeader        ← length prefix out of range, truncated or unparsable frame header
///   ├── MalformedBlob          ← datasize / raw_size out of range, truncated or unparsable blob
///   ├── DecompressionFailed    ← inflate did not finish, or produced the wrong size
///   ├── UnsupportedEncoding    ← lzma, bzip2, lz4
///   ├── EmptyBlob              ← blob carries no data field at all
///   ├── UnexpectedFrameType    ← first frame is not OSMHeader
///   ├── MalformedBlock         ← block or header block body unparsable, parallel arrays disagree
///   ├── StringIndexOutOfRange  ← key, value or role index past the string table
///   ├── EmptyGroup             ← primitive group with no entities
///   ├── UnknownMemberType      ← relation member type outside node/way/relation
///   └── Io(std::io::Error)     ← from the underlying reader
/// ```
///
/// Everything above `UnexpectedFrameType` is raised by the frame reader and
/// ends a stream. The rest is raised while decoding a block.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The length prefix or the frame header it announces is unusable.
    #[error("malformed frame header: {reason}")]
    MalformedHeader { reason: String },

    /// The blob envelope is out of bounds, truncated or unparsable.
    #[error("malformed blob: {reason}")]
    MalformedBlob { reason: String },

    /// Decompression did not yield exactly the declared number of bytes.
    #[error("{encoding} decompression failed: {reason}")]
    DecompressionFailed {
        encoding: &'static str,
        reason: String,
    },

    /// The blob uses a compression this reader does not implement.
    #[error("unsupported blob encoding: {encoding}")]
    UnsupportedEncoding { encoding: &'static str },

    /// The blob has no data field.
    #[error("blob has no data")]
    EmptyBlob,

    /// The stream does not open with an `OSMHeader` frame.
    #[error("expected a {expected} frame, found {found:?}")]
    UnexpectedFrameType {
        expected: &'static str,
        found: String,
    },

    /// A block body could not be decoded or is internally inconsistent.
    #[error("malformed block: {reason}")]
    MalformedBlock { reason: String },

    /// A key, value or role points past the end of the block's string table.
    #[error("string index {index} out of range for a table of {len} entries")]
    StringIndexOutOfRange { index: i64, len: usize },

    /// A primitive group populated none of its entity kinds.
    #[error("primitive group contains no entities")]
    EmptyGroup,

    /// A member of a restriction relation is neither node, way nor relation.
    #[error("unknown relation member type {value} in relation {relation_id}")]
    UnknownMemberType { relation_id: i64, value: i32 },

    /// An I/O error from the underlying reader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub(crate) fn malformed_block(reason: impl std::fmt::Display) -> Self {
        Self::MalformedBlock {
            reason: reason.to_string(),
        }
    }

    /// Whether the error was raised inside a block rather than while
    /// reading frames.
    #[must_use]
    pub fn is_block_level(&self) -> bool {
        matches!(
            self,
            Self::MalformedBlock { .. }
                | Self::StringIndexOutOfRange { .. }
                | Self::EmptyGroup
                | Self::UnknownMemberType { .. }
        )
    }
}
