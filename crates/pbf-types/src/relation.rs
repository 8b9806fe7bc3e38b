use crate::error::TypeError;
use crate::proto;

/// Kind of object a relation member points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberType {
    Node,
    Way,
    Relation,
}

impl MemberType {
    #[must_use]
    pub fn to_wire(self) -> i32 {
        match self {
            Self::Node => 0,
            Self::Way => 1,
            Self::Relation => 2,
        }
    }

    /// # Errors
    ///
    /// Returns [`TypeError::InvalidEnumValue`] for anything but 0, 1 or 2.
    pub fn from_wire(value: i32) -> Result<Self, TypeError> {
        match value {
            0 => Ok(Self::Node),
            1 => Ok(Self::Way),
            2 => Ok(Self::Relation),
            other => Err(TypeError::InvalidEnumValue {
                enum_name: "MemberType",
                value: i64::from(other),
            }),
        }
    }
}

/// A relation as stored.
///
/// ```text
/// ┌──────────┬───────────┬───────────┬──────────────────────────────┐
/// │ Field ID │ Wire Type │ Name      │ Description                  │
/// ├──────────┼───────────┼───────────┼──────────────────────────────┤
/// │ 1        │ int64     │ id        │ Absolute id                  │
/// │ 2        │ packed    │ keys      │ String-table indices         │
/// │ 3        │ packed    │ vals      │ String-table indices         │
/// │ 4        │ Nested    │ info      │ Metadata (skipped)           │
/// │ 8        │ packed    │ roles_sid │ int32 role string indices    │
/// │ 9        │ packed    │ memids    │ sint64 member id deltas      │
/// │ 10       │ packed    │ types     │ MemberType per member        │
/// └──────────┴───────────┴───────────┴──────────────────────────────┘
/// ```
///
/// `types` holds the raw enum values. Validating them is left to the
/// decoder, which only inspects members of relations it cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Relation {
    pub id: i64,
    pub keys: Vec<u32>,
    pub vals: Vec<u32>,
    pub roles_sid: Vec<i32>,
    pub memids: Vec<i64>,
    pub types: Vec<i32>,
}

impl TryFrom<proto::Relation> for Relation {
    type Error = TypeError;

    fn try_from(msg: proto::Relation) -> Result<Self, TypeError> {
        let id = msg.id.ok_or(TypeError::MissingRequiredField {
            message: "Relation",
            field: "id",
        })?;
        Ok(Self {
            id,
            keys: msg.keys,
            vals: msg.vals,
            roles_sid: msg.roles_sid,
            memids: msg.memids,
            types: msg.types,
        })
    }
}

impl From<&Relation> for proto::Relation {
    fn from(relation: &Relation) -> Self {
        Self {
            id: Some(relation.id),
            keys: relation.keys.clone(),
            vals: relation.vals.clone(),
            roles_sid: relation.roles_sid.clone(),
            memids: relation.memids.clone(),
            types: relation.types.clone(),
        }
    }
}
