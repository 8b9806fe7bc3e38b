use crate::error::TypeError;
use crate::proto;

/// A plain (non-dense) node.
///
/// ```text
/// ┌──────────┬───────────┬──────┬───────────────────────────────────┐
/// │ Field ID │ Wire Type │ Name │ Description                       │
/// ├──────────┼───────────┼──────┼───────────────────────────────────┤
/// │ 1        │ sint64    │ id   │ Absolute id                       │
/// │ 2        │ packed    │ keys │ String-table indices              │
/// │ 3        │ packed    │ vals │ String-table indices, same length │
/// │ 4        │ Nested    │ info │ Metadata (skipped)                │
/// │ 8        │ sint64    │ lat  │ Raw latitude, granularity units   │
/// │ 9        │ sint64    │ lon  │ Raw longitude                     │
/// └──────────┴───────────┴──────┴───────────────────────────────────┘
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub id: i64,
    pub keys: Vec<u32>,
    pub vals: Vec<u32>,
    pub lat: i64,
    pub lon: i64,
}

impl TryFrom<proto::Node> for Node {
    type Error = TypeError;

    fn try_from(msg: proto::Node) -> Result<Self, TypeError> {
        let missing = |field| TypeError::MissingRequiredField {
            message: "Node",
            field,
        };
        Ok(Self {
            id: msg.id.ok_or_else(|| missing("id"))?,
            keys: msg.keys,
            vals: msg.vals,
            lat: msg.lat.ok_or_else(|| missing("lat"))?,
            lon: msg.lon.ok_or_else(|| missing("lon"))?,
        })
    }
}

impl From<&Node> for proto::Node {
    fn from(node: &Node) -> Self {
        Self {
            id: Some(node.id),
            keys: node.keys.clone(),
            vals: node.vals.clone(),
            lat: Some(node.lat),
            lon: Some(node.lon),
        }
    }
}
