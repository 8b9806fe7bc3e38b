use std::collections::HashMap;

use pbf_types::primitive_block::DEFAULT_GRANULARITY;
use pbf_types::{
    DenseNodes, MemberType, Node, PrimitiveBlock, PrimitiveGroup, Relation, StringTable, Way,
};

const NANO: f64 = 1_000_000_000.0;

/// One relation member as handed to [`BlockBuilder::add_relation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member<'a> {
    pub member_type: MemberType,
    pub id: i64,
    pub role: &'a str,
}

impl<'a> Member<'a> {
    #[must_use]
    pub fn node(id: i64, role: &'a str) -> Self {
        Self {
            member_type: MemberType::Node,
            id,
            role,
        }
    }

    #[must_use]
    pub fn way(id: i64, role: &'a str) -> Self {
        Self {
            member_type: MemberType::Way,
            id,
            role,
        }
    }

    #[must_use]
    pub fn relation(id: i64, role: &'a str) -> Self {
        Self {
            member_type: MemberType::Relation,
            id,
            role,
        }
    }
}

struct PendingPoint {
    id: i64,
    lat: i64,
    lon: i64,
    tags: Vec<(u32, u32)>,
}

/// Builder for a single primitive block.
///
/// Entities are added with absolute ids and coordinates; the builder
/// interns strings, delta-codes ids, coordinates and refs, and groups
/// entities by kind:
///
/// ```text
///   group 0: points     (dense, or plain nodes when enabled)
///   group 1: ways
///   group 2: relations
/// ```
///
/// Kinds with no entities produce no group.
///
/// # Usage
///
/// ```rust
/// use pbf_encoder::{BlockBuilder, Member};
///
/// let mut builder = BlockBuilder::new();
/// builder
///     .add_point(1, 52.52, 13.40, &[("highway", "traffic_signals")])
///     .add_path(10, &[1, 2, 3], &[("highway", "primary")])
///     .add_relation(
///         20,
///         &[Member::way(10, "from"), Member::node(2, "via"), Member::way(11, "to")],
///         &[("type", "restriction"), ("restriction", "no_left_turn")],
///     );
/// let block = builder.build();
/// assert_eq!(block.groups.len(), 3);
/// ```
pub struct BlockBuilder {
    strings: Vec<String>,
    index: HashMap<String, u32>,
    granularity: i32,
    lat_offset: i64,
    lon_offset: i64,
    plain_nodes: bool,
    points: Vec<PendingPoint>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
}

impl BlockBuilder {
    #[must_use]
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(String::new(), 0);
        Self {
            strings: vec![String::new()],
            index,
            granularity: DEFAULT_GRANULARITY,
            lat_offset: 0,
            lon_offset: 0,
            plain_nodes: false,
            points: Vec::new(),
            ways: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the coordinate granularity in nanodegrees. Affects points added
    /// afterwards.
    pub fn granularity(&mut self, granularity: i32) -> &mut Self {
        self.granularity = granularity;
        self
    }

    /// Set the coordinate offsets in nanodegrees. Affects points added
    /// afterwards.
    pub fn offsets(&mut self, lat_offset: i64, lon_offset: i64) -> &mut Self {
        self.lat_offset = lat_offset;
        self.lon_offset = lon_offset;
        self
    }

    /// Emit points as plain `Node` records instead of a dense group.
    pub fn plain_nodes(&mut self) -> &mut Self {
        self.plain_nodes = true;
        self
    }

    /// Add a point at the given position in degrees.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_point(&mut self, id: i64, lat: f64, lon: f64, tags: &[(&str, &str)]) -> &mut Self {
        let gran = f64::from(self.granularity);
        #[allow(clippy::cast_precision_loss)]
        let (lat_offset, lon_offset) = (self.lat_offset as f64, self.lon_offset as f64);
        let raw_lat = ((lat * NANO - lat_offset) / gran).round() as i64;
        let raw_lon = ((lon * NANO - lon_offset) / gran).round() as i64;
        self.add_point_raw(id, raw_lat, raw_lon, tags)
    }

    /// Add a point with coordinates already in granularity units.
    pub fn add_point_raw(
        &mut self,
        id: i64,
        lat: i64,
        lon: i64,
        tags: &[(&str, &str)],
    ) -> &mut Self {
        let tags = self.intern_tags(tags);
        self.points.push(PendingPoint { id, lat, lon, tags });
        self
    }

    /// Add a way through the given node ids.
    pub fn add_path(&mut self, id: i64, node_refs: &[i64], tags: &[(&str, &str)]) -> &mut Self {
        let (keys, vals) = self.intern_tags(tags).into_iter().unzip();
        self.ways.push(Way {
            id,
            keys,
            vals,
            refs: deltas(node_refs.iter().copied()),
        });
        self
    }

    pub fn add_relation(
        &mut self,
        id: i64,
        members: &[Member<'_>],
        tags: &[(&str, &str)],
    ) -> &mut Self {
        let (keys, vals) = self.intern_tags(tags).into_iter().unzip();
        #[allow(clippy::cast_possible_wrap)]
        let roles_sid = members.iter().map(|m| self.intern(m.role) as i32).collect();
        self.relations.push(Relation {
            id,
            keys,
            vals,
            roles_sid,
            memids: deltas(members.iter().map(|m| m.id)),
            types: members.iter().map(|m| m.member_type.to_wire()).collect(),
        });
        self
    }

    /// Number of entities added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len() + self.ways.len() + self.relations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assemble the block.
    #[must_use]
    pub fn build(&self) -> PrimitiveBlock {
        let mut groups = Vec::new();

        if !self.points.is_empty() {
            groups.push(if self.plain_nodes {
                self.plain_group()
            } else {
                self.dense_group()
            });
        }
        if !self.ways.is_empty() {
            groups.push(PrimitiveGroup {
                ways: self.ways.clone(),
                ..PrimitiveGroup::default()
            });
        }
        if !self.relations.is_empty() {
            groups.push(PrimitiveGroup {
                relations: self.relations.clone(),
                ..PrimitiveGroup::default()
            });
        }

        PrimitiveBlock {
            string_table: StringTable::new(self.strings.clone()),
            groups,
            granularity: self.granularity,
            lat_offset: self.lat_offset,
            lon_offset: self.lon_offset,
            ..PrimitiveBlock::default()
        }
    }

    fn dense_group(&self) -> PrimitiveGroup {
        let mut keys_vals = Vec::new();
        let any_tags = self.points.iter().any(|p| !p.tags.is_empty());
        if any_tags {
            for point in &self.points {
                for &(k, v) in &point.tags {
                    #[allow(clippy::cast_possible_wrap)]
                    keys_vals.extend([k as i32, v as i32]);
                }
                keys_vals.push(0);
            }
        }
        PrimitiveGroup {
            dense: Some(DenseNodes {
                ids: deltas(self.points.iter().map(|p| p.id)),
                lats: deltas(self.points.iter().map(|p| p.lat)),
                lons: deltas(self.points.iter().map(|p| p.lon)),
                keys_vals,
            }),
            ..PrimitiveGroup::default()
        }
    }

    fn plain_group(&self) -> PrimitiveGroup {
        let nodes = self
            .points
            .iter()
            .map(|p| {
                let (keys, vals) = p.tags.iter().copied().unzip();
                Node {
                    id: p.id,
                    keys,
                    vals,
                    lat: p.lat,
                    lon: p.lon,
                }
            })
            .collect();
        PrimitiveGroup {
            nodes,
            ..PrimitiveGroup::default()
        }
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        #[allow(clippy::cast_possible_truncation)]
        let i = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    fn intern_tags(&mut self, tags: &[(&str, &str)]) -> Vec<(u32, u32)> {
        tags.iter()
            .map(|(k, v)| (self.intern(k), self.intern(v)))
            .collect()
    }
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn deltas(values: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut prev = 0_i64;
    values
        .map(|v| {
            let d = v.wrapping_sub(prev);
            prev = v;
            d
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pbf_decoder::{BlockContext, DenseNodeIter, decode_relation, decode_way};

    use super::*;

    #[test]
    fn strings_are_interned_once() {
        let mut builder = BlockBuilder::new();
        builder
            .add_path(1, &[1, 2], &[("highway", "primary")])
            .add_path(2, &[2, 3], &[("highway", "secondary")]);
        let block = builder.build();
        let highway_entries = block
            .string_table
            .as_slice()
            .iter()
            .filter(|s| *s == "highway")
            .count();
        assert_eq!(highway_entries, 1);
        assert_eq!(block.string_table.get(0), Some(""));
    }

    #[test]
    fn refs_are_delta_coded() {
        let mut builder = BlockBuilder::new();
        builder.add_path(7, &[5, 3, 13], &[]);
        let block = builder.build();
        assert_eq!(block.groups[0].ways[0].refs, vec![5, -2, 10]);

        let path = decode_way(&BlockContext::new(&block), &block.groups[0].ways[0]).unwrap();
        assert_eq!(path.node_refs, vec![5, 3, 13]);
    }

    #[test]
    fn dense_points_decode_back() {
        let mut builder = BlockBuilder::new();
        builder
            .add_point_raw(100, 10, -10, &[("a", "b")])
            .add_point_raw(90, 30, -5, &[])
            .add_point_raw(200, 20, 0, &[("c", "d"), ("e", "f")]);
        let block = builder.build();
        let dense = block.groups[0].dense.as_ref().unwrap();
        assert_eq!(dense.ids, vec![100, -10, 110]);

        let points: Vec<_> = DenseNodeIter::new(BlockContext::new(&block), dense)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let ids: Vec<i64> = points.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![100, 90, 200]);
        assert_eq!(points[0].tags.get("a"), Some("b"));
        assert!(points[1].tags.is_empty());
        assert_eq!(points[2].tags.len(), 2);
    }

    #[test]
    fn untagged_dense_group_has_no_keys_vals() {
        let mut builder = BlockBuilder::new();
        builder.add_point(1, 0.0, 0.0, &[]).add_point(2, 1.0, 1.0, &[]);
        let block = builder.build();
        assert!(block.groups[0].dense.as_ref().unwrap().keys_vals.is_empty());
    }

    #[test]
    fn degrees_are_scaled_by_granularity_and_offset() {
        let mut builder = BlockBuilder::new();
        builder
            .granularity(1000)
            .offsets(500_000, -500_000)
            .add_point(1, 1.0, -1.0, &[]);
        let block = builder.build();
        let dense = block.groups[0].dense.as_ref().unwrap();
        assert_eq!(dense.lats, vec![999_500]);
        assert_eq!(dense.lons, vec![-999_500]);
    }

    #[test]
    fn plain_nodes_are_absolute() {
        let mut builder = BlockBuilder::new();
        builder
            .plain_nodes()
            .add_point_raw(5, 100, 200, &[("k", "v")])
            .add_point_raw(6, 50, 60, &[]);
        let block = builder.build();
        let nodes = &block.groups[0].nodes;
        assert_eq!(nodes.len(), 2);
        assert_eq!((nodes[1].id, nodes[1].lat, nodes[1].lon), (6, 50, 60));
        assert!(block.groups[0].dense.is_none());
    }

    #[test]
    fn relation_members_round_trip_through_decoder() {
        let mut builder = BlockBuilder::new();
        builder.add_relation(
            3,
            &[
                Member::way(40, "from"),
                Member::node(7, "via"),
                Member::way(41, "to"),
            ],
            &[("type", "restriction"), ("restriction", "only_right_turn")],
        );
        let block = builder.build();
        let relation = &block.groups[0].relations[0];
        let candidate = decode_relation(&BlockContext::new(&block), relation)
            .unwrap()
            .unwrap();
        assert_eq!(
            (candidate.from_way, candidate.via_node, candidate.to_way),
            (40, 7, 41)
        );
        assert!(candidate.is_only);
    }

    #[test]
    fn groups_follow_kind_order() {
        let mut builder = BlockBuilder::new();
        builder
            .add_relation(1, &[], &[])
            .add_path(1, &[], &[])
            .add_point(1, 0.0, 0.0, &[]);
        let block = builder.build();
        assert_eq!(block.groups.len(), 3);
        assert!(block.groups[0].dense.is_some());
        assert_eq!(block.groups[1].ways.len(), 1);
        assert_eq!(block.groups[2].relations.len(), 1);
        assert_eq!(builder.len(), 3);
    }
}
