/// Errors that can occur when decoding typed block messages.
///
/// ```text
/// ┌─────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                              │
/// │   ├── Decode for bytes prost cannot parse           │
/// │   ├── MissingRequiredField for incomplete messages  │
/// │   └── InvalidEnumValue for out-of-range enums       │
/// └─────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    /// A proto2 `required` field was not present in the message body.
    #[error("{message} is missing required field `{field}`")]
    MissingRequiredField {
        message: &'static str,
        field: &'static str,
    },

    /// An enum field contained a value outside its defined range.
    #[error("invalid {enum_name} value: {value}")]
    InvalidEnumValue { enum_name: &'static str, value: i64 },

    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
}
