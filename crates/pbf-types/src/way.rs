use crate::error::TypeError;
use crate::proto;

/// A way as stored: absolute id, parallel tag indices, delta-coded refs.
///
/// ```text
/// ┌──────────┬───────────┬──────┬──────────────────────────────┐
/// │ Field ID │ Wire Type │ Name │ Description                  │
/// ├──────────┼───────────┼──────┼──────────────────────────────┤
/// │ 1        │ int64     │ id   │ Absolute id                  │
/// │ 2        │ packed    │ keys │ String-table indices         │
/// │ 3        │ packed    │ vals │ String-table indices         │
/// │ 4        │ Nested    │ info │ Metadata (skipped)           │
/// │ 8        │ packed    │ refs │ sint64 node id deltas        │
/// └──────────┴───────────┴──────┴──────────────────────────────┘
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub keys: Vec<u32>,
    pub vals: Vec<u32>,
    pub refs: Vec<i64>,
}

impl TryFrom<proto::Way> for Way {
    type Error = TypeError;

    fn try_from(msg: proto::Way) -> Result<Self, TypeError> {
        let id = msg.id.ok_or(TypeError::MissingRequiredField {
            message: "Way",
            field: "id",
        })?;
        Ok(Self {
            id,
            keys: msg.keys,
            vals: msg.vals,
            refs: msg.refs,
        })
    }
}

impl From<&Way> for proto::Way {
    fn from(way: &Way) -> Self {
        Self {
            id: Some(way.id),
            keys: way.keys.clone(),
            vals: way.vals.clone(),
            refs: way.refs.clone(),
        }
    }
}
