/// Marker for a restriction slot that no member has filled.
pub const UNSET: i64 = i64::MAX;

/// Insertion-ordered key/value pairs attached to an entity.
///
/// PBF stores tags as parallel string-table indices, so the order here is
/// the order the writer emitted them. Lookups are linear; entities rarely
/// carry more than a handful of tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tags(Vec<(String, String)>);

impl Tags {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Value of the first tag named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A node. `lat` and `lon` are fixed-point degrees scaled by 100 000.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub id: i64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Tags,
}

/// A way: an ordered list of node ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    pub id: i64,
    pub node_refs: Vec<i64>,
    pub tags: Tags,
}

/// A turn restriction extracted from a `type=restriction` relation.
///
/// Slots no member filled stay at [`UNSET`]. Candidates are handed to the
/// sink whether or not they are complete; deciding what to do with a
/// partial restriction is the consumer's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestrictionCandidate {
    pub from_way: i64,
    pub to_way: i64,
    pub via_node: i64,
    /// `true` for `only_*` restrictions, `false` for `no_*` and friends.
    pub is_only: bool,
}

impl RestrictionCandidate {
    #[must_use]
    pub fn new(is_only: bool) -> Self {
        Self {
            from_way: UNSET,
            to_way: UNSET,
            via_node: UNSET,
            is_only,
        }
    }

    /// Whether all three slots were assigned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.from_way != UNSET && self.to_way != UNSET && self.via_node != UNSET
    }
}

/// Which entity kind a primitive group carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Nodes,
    DenseNodes,
    Ways,
    Relations,
}

impl EntityKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Nodes => "nodes",
            Self::DenseNodes => "dense",
            Self::Ways => "ways",
            Self::Relations => "relations",
        }
    }
}
