use pbf_wire::WireError;

/// Errors that can occur while writing a PBF stream.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── BlockTooLarge        ← serialized block exceeds the blob limit
///   ├── Wire(WireError)      ← from pbf-wire framing
///   └── Io(std::io::Error)   ← from the sink or the compressor
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("block exceeds maximum size ({size} bytes, limit {limit})")]
    BlockTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
