/// Errors raised while decoding or encoding the frame envelope.
///
/// ```text
///   WireError
///   ├── Decode                ← bytes are not a well-formed protobuf message
///   ├── LengthOverflow        ← a size does not fit the i32 fields
///   ├── MissingRequiredField  ← proto2 `required` field absent
///   └── Io(std::io::Error)    ← from the sink while writing frames
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),

    /// A length does not fit the platform or the i32 frame fields.
    #[error("length {length} does not fit the target integer type")]
    LengthOverflow { length: u64 },

    /// prost leaves proto2 `required` fields unchecked, so presence is
    /// verified after decoding.
    #[error("{message} is missing required field `{field}`")]
    MissingRequiredField {
        message: &'static str,
        field: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
