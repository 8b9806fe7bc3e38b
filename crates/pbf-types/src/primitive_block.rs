use prost::Message;

use crate::dense::DenseNodes;
use crate::error::TypeError;
use crate::node::Node;
use crate::proto;
use crate::relation::Relation;
use crate::string_table::StringTable;
use crate::way::Way;

/// Default coordinate granularity, in nanodegrees per raw unit.
pub const DEFAULT_GRANULARITY: i32 = 100;

/// Default timestamp granularity, in milliseconds per raw unit.
pub const DEFAULT_DATE_GRANULARITY: i32 = 1000;

/// One group of a primitive block.
///
/// ```text
/// ┌──────────┬───────────┬────────────┬─────────────────────────┐
/// │ Field ID │ Wire Type │ Name       │ Description             │
/// ├──────────┼───────────┼────────────┼─────────────────────────┤
/// │ 1        │ Nested    │ nodes      │ Repeated Node           │
/// │ 2        │ Nested    │ dense      │ DenseNodes              │
/// │ 3        │ Nested    │ ways       │ Repeated Way            │
/// │ 4        │ Nested    │ relations  │ Repeated Relation       │
/// │ 5        │ Nested    │ changesets │ Skipped                 │
/// └──────────┴───────────┴────────────┴─────────────────────────┘
/// ```
///
/// Writers populate exactly one kind per group. The decoder decides what
/// to do when that does not hold.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveGroup {
    pub nodes: Vec<Node>,
    pub dense: Option<DenseNodes>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
}

impl TryFrom<proto::PrimitiveGroup> for PrimitiveGroup {
    type Error = TypeError;

    fn try_from(msg: proto::PrimitiveGroup) -> Result<Self, TypeError> {
        Ok(Self {
            nodes: msg
                .nodes
                .into_iter()
                .map(Node::try_from)
                .collect::<Result<_, _>>()?,
            dense: msg.dense.map(DenseNodes::from),
            ways: msg
                .ways
                .into_iter()
                .map(Way::try_from)
                .collect::<Result<_, _>>()?,
            relations: msg
                .relations
                .into_iter()
                .map(Relation::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl From<&PrimitiveGroup> for proto::PrimitiveGroup {
    fn from(group: &PrimitiveGroup) -> Self {
        Self {
            nodes: group.nodes.iter().map(Into::into).collect(),
            dense: group.dense.as_ref().map(Into::into),
            ways: group.ways.iter().map(Into::into).collect(),
            relations: group.relations.iter().map(Into::into).collect(),
        }
    }
}

/// The payload of an `OSMData` frame.
///
/// Field layout within body:
///
/// ```text
/// ┌──────────┬───────────┬──────────────────┬───────────────────────────┐
/// │ Field ID │ Wire Type │ Name             │ Description               │
/// ├──────────┼───────────┼──────────────────┼───────────────────────────┤
/// │ 1        │ Nested    │ stringtable      │ Required                  │
/// │ 2        │ Nested    │ primitivegroup   │ Repeated                  │
/// │ 17       │ int32     │ granularity      │ Default 100               │
/// │ 18       │ int32     │ date_granularity │ Default 1000              │
/// │ 19       │ int64     │ lat_offset       │ Nanodegrees, default 0    │
/// │ 20       │ int64     │ lon_offset       │ Nanodegrees, default 0    │
/// └──────────┴───────────┴──────────────────┴───────────────────────────┘
/// ```
///
/// A coordinate in degrees is `1e-9 * (offset + granularity * raw)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveBlock {
    pub string_table: StringTable,
    pub groups: Vec<PrimitiveGroup>,
    pub granularity: i32,
    pub date_granularity: i32,
    pub lat_offset: i64,
    pub lon_offset: i64,
}

impl Default for PrimitiveBlock {
    fn default() -> Self {
        Self {
            string_table: StringTable::default(),
            groups: Vec::new(),
            granularity: DEFAULT_GRANULARITY,
            date_granularity: DEFAULT_DATE_GRANULARITY,
            lat_offset: 0,
            lon_offset: 0,
        }
    }
}

impl PrimitiveBlock {
    /// Serialize the block. Fields equal to their defaults are omitted.
    #[must_use]
    pub fn encode_body(&self) -> Vec<u8> {
        proto::PrimitiveBlock::from(self).encode_to_vec()
    }

    /// # Errors
    ///
    /// Fails on malformed protobuf, a missing string table, or a malformed
    /// group.
    pub fn decode_body(buf: &[u8]) -> Result<Self, TypeError> {
        proto::PrimitiveBlock::decode(buf)?.try_into()
    }
}

impl TryFrom<proto::PrimitiveBlock> for PrimitiveBlock {
    type Error = TypeError;

    fn try_from(msg: proto::PrimitiveBlock) -> Result<Self, TypeError> {
        let string_table = msg
            .stringtable
            .ok_or(TypeError::MissingRequiredField {
                message: "PrimitiveBlock",
                field: "stringtable",
            })?
            .into();
        Ok(Self {
            string_table,
            groups: msg
                .primitivegroup
                .into_iter()
                .map(PrimitiveGroup::try_from)
                .collect::<Result<_, _>>()?,
            granularity: msg.granularity.unwrap_or(DEFAULT_GRANULARITY),
            date_granularity: msg.date_granularity.unwrap_or(DEFAULT_DATE_GRANULARITY),
            lat_offset: msg.lat_offset.unwrap_or_default(),
            lon_offset: msg.lon_offset.unwrap_or_default(),
        })
    }
}

impl From<&PrimitiveBlock> for proto::PrimitiveBlock {
    fn from(block: &PrimitiveBlock) -> Self {
        Self {
            stringtable: Some((&block.string_table).into()),
            primitivegroup: block.groups.iter().map(Into::into).collect(),
            granularity: Some(block.granularity).filter(|&g| g != DEFAULT_GRANULARITY),
            date_granularity: Some(block.date_granularity)
                .filter(|&g| g != DEFAULT_DATE_GRANULARITY),
            lat_offset: Some(block.lat_offset).filter(|&o| o != 0),
            lon_offset: Some(block.lon_offset).filter(|&o| o != 0),
        }
    }
}
