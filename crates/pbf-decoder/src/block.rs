use pbf_types::{EntityKind, PrimitiveBlock, PrimitiveGroup, StringTable, Tags};

use crate::error::DecodeError;

/// Fixed-point scale of the coordinates handed to sinks.
pub const COORDINATE_PRECISION: f64 = 100_000.0;

/// Nanodegrees per degree; raw coordinates are stored in nanodegree units.
pub const NANO: f64 = 1_000_000_000.0;

/// Decode the bytes of a materialized `OSMData` blob.
///
/// # Errors
///
/// Any protobuf or schema failure is reported as
/// [`DecodeError::MalformedBlock`].
pub fn decode_block(bytes: &[u8]) -> Result<PrimitiveBlock, DecodeError> {
    PrimitiveBlock::decode_body(bytes).map_err(DecodeError::malformed_block)
}

/// Decide which entity kind a group carries.
///
/// Kinds are checked in the order nodes, ways, relations, dense nodes, and
/// a later non-empty kind overrides an earlier one. A well-formed group has
/// exactly one, so the order only matters for files that break that rule.
///
/// # Errors
///
/// Returns [`DecodeError::EmptyGroup`] if every kind is empty.
pub fn classify(group: &PrimitiveGroup) -> Result<EntityKind, DecodeError> {
    let mut kind = None;
    if !group.nodes.is_empty() {
        kind = Some(EntityKind::Nodes);
    }
    if !group.ways.is_empty() {
        kind = Some(EntityKind::Ways);
    }
    if !group.relations.is_empty() {
        kind = Some(EntityKind::Relations);
    }
    if group.dense.as_ref().is_some_and(|d| !d.is_empty()) {
        kind = Some(EntityKind::DenseNodes);
    }
    kind.ok_or(DecodeError::EmptyGroup)
}

/// The block-wide state every entity decoder needs: the string table and
/// the coordinate transform.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    strings: &'a StringTable,
    granularity: f64,
    lat_offset: f64,
    lon_offset: f64,
}

impl<'a> BlockContext<'a> {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(block: &'a PrimitiveBlock) -> Self {
        Self {
            strings: &block.string_table,
            granularity: f64::from(block.granularity),
            lat_offset: block.lat_offset as f64,
            lon_offset: block.lon_offset as f64,
        }
    }

    /// Look up a string-table entry.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::StringIndexOutOfRange`] for negative indices
    /// and indices past the end of the table.
    pub fn string(&self, index: i64) -> Result<&'a str, DecodeError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .ok_or(DecodeError::StringIndexOutOfRange {
                index,
                len: self.strings.len(),
            })
    }

    /// Build tags from parallel key and value index arrays.
    ///
    /// # Errors
    ///
    /// Fails if the arrays differ in length or an index is out of range.
    pub fn tags(&self, keys: &[u32], vals: &[u32]) -> Result<Tags, DecodeError> {
        if keys.len() != vals.len() {
            return Err(DecodeError::malformed_block(format!(
                "{} keys but {} values",
                keys.len(),
                vals.len()
            )));
        }
        let mut tags = Tags::with_capacity(keys.len());
        for (&k, &v) in keys.iter().zip(vals) {
            tags.push(self.string(i64::from(k))?, self.string(i64::from(v))?);
        }
        Ok(tags)
    }

    /// Latitude of a raw (delta-summed) coordinate, in fixed-point units.
    #[must_use]
    pub fn lat(&self, raw: i64) -> f64 {
        self.coordinate(raw, self.lat_offset)
    }

    /// Longitude of a raw (delta-summed) coordinate, in fixed-point units.
    #[must_use]
    pub fn lon(&self, raw: i64) -> f64 {
        self.coordinate(raw, self.lon_offset)
    }

    #[allow(clippy::cast_precision_loss)]
    fn coordinate(&self, raw: i64, offset: f64) -> f64 {
        COORDINATE_PRECISION * (raw as f64 * self.granularity + offset) / NANO
    }
}

#[cfg(test)]
mod tests {
    use pbf_types::{DenseNodes, Node, Relation, Way};

    use super::*;

    fn block(strings: &[&str]) -> PrimitiveBlock {
        PrimitiveBlock {
            string_table: StringTable::new(strings.iter().map(|s| (*s).to_string()).collect()),
            ..PrimitiveBlock::default()
        }
    }

    #[test]
    fn classify_single_kinds() {
        let ways = PrimitiveGroup {
            ways: vec![Way::default()],
            ..PrimitiveGroup::default()
        };
        assert_eq!(classify(&ways).unwrap(), EntityKind::Ways);

        let nodes = PrimitiveGroup {
            nodes: vec![Node::default()],
            ..PrimitiveGroup::default()
        };
        assert_eq!(classify(&nodes).unwrap(), EntityKind::Nodes);
    }

    #[test]
    fn later_kind_overrides_earlier() {
        let mixed = PrimitiveGroup {
            nodes: vec![Node::default()],
            ways: vec![Way::default()],
            relations: vec![Relation::default()],
            ..PrimitiveGroup::default()
        };
        assert_eq!(classify(&mixed).unwrap(), EntityKind::Relations);

        let with_dense = PrimitiveGroup {
            ways: vec![Way::default()],
            dense: Some(DenseNodes {
                ids: vec![1],
                lats: vec![0],
                lons: vec![0],
                keys_vals: Vec::new(),
            }),
            ..PrimitiveGroup::default()
        };
        assert_eq!(classify(&with_dense).unwrap(), EntityKind::DenseNodes);
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(matches!(
            classify(&PrimitiveGroup::default()),
            Err(DecodeError::EmptyGroup)
        ));
        let empty_dense = PrimitiveGroup {
            dense: Some(DenseNodes::default()),
            ..PrimitiveGroup::default()
        };
        assert!(matches!(classify(&empty_dense), Err(DecodeError::EmptyGroup)));
    }

    #[test]
    fn string_lookup_is_bounds_checked() {
        let block = block(&["", "name"]);
        let ctx = BlockContext::new(&block);
        assert_eq!(ctx.string(1).unwrap(), "name");
        assert!(matches!(
            ctx.string(2),
            Err(DecodeError::StringIndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            ctx.string(-1),
            Err(DecodeError::StringIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn coordinates_use_granularity_and_offset() {
        let mut block = block(&[""]);
        block.granularity = 100;
        block.lat_offset = 1_000;
        let ctx = BlockContext::new(&block);
        // (12_345 * 100 + 1_000) nanodegrees = 0.001_235_5 degrees
        let lat = ctx.lat(12_345);
        assert!((lat - 123.55).abs() < 1e-9, "{lat}");
        assert!((ctx.lon(-10_000_000) + 100_000.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_tag_arrays_are_malformed() {
        let block = block(&["", "k", "v"]);
        let ctx = BlockContext::new(&block);
        assert!(matches!(
            ctx.tags(&[1, 1], &[2]),
            Err(DecodeError::MalformedBlock { .. })
        ));
    }
}
