use pbf_types::{DenseNodes, Point, Tags};

use crate::block::BlockContext;
use crate::error::DecodeError;

/// Iterator that rebuilds points from a delta-coded dense group.
///
/// Three accumulators (id, lat, lon) start at zero for every group and are
/// advanced by one stored delta per point. Tags come from `keys_vals`, a
/// single flat array walked with a cursor that stays in step with the
/// point index:
///
/// ```text
///   keys_vals:  k v k v 0 | 0 | k v 0 | ...
///               point 0     p1  point 2
/// ```
///
/// A `0` in key position ends the current point's tags. It is positional
/// and never looked up in the string table. An empty `keys_vals` means no
/// point in the group has tags.
///
/// Deltas are summed with wrapping arithmetic; hostile input produces
/// garbage ids rather than a panic.
pub struct DenseNodeIter<'a> {
    ctx: BlockContext<'a>,
    dense: &'a DenseNodes,
    index: usize,
    id: i64,
    lat: i64,
    lon: i64,
    tag_cursor: usize,
    failed: bool,
}

impl<'a> DenseNodeIter<'a> {
    /// # Errors
    ///
    /// Returns [`DecodeError::MalformedBlock`] if the id, lat and lon
    /// arrays have different lengths.
    pub fn new(ctx: BlockContext<'a>, dense: &'a DenseNodes) -> Result<Self, DecodeError> {
        let n = dense.ids.len();
        if dense.lats.len() != n || dense.lons.len() != n {
            return Err(DecodeError::malformed_block(format!(
                "dense group has {n} ids, {} lats, {} lons",
                dense.lats.len(),
                dense.lons.len()
            )));
        }
        Ok(Self {
            ctx,
            dense,
            index: 0,
            id: 0,
            lat: 0,
            lon: 0,
            tag_cursor: 0,
            failed: false,
        })
    }

    fn next_tags(&mut self) -> Result<Tags, DecodeError> {
        let keys_vals = &self.dense.keys_vals;
        let mut tags = Tags::new();
        while let Some(&key) = keys_vals.get(self.tag_cursor) {
            if key == 0 {
                self.tag_cursor += 1;
                break;
            }
            let Some(&val) = keys_vals.get(self.tag_cursor + 1) else {
                return Err(DecodeError::malformed_block(format!(
                    "dense key at position {} has no value",
                    self.tag_cursor
                )));
            };
            tags.push(
                self.ctx.string(i64::from(key))?,
                self.ctx.string(i64::from(val))?,
            );
            self.tag_cursor += 2;
        }
        Ok(tags)
    }
}

impl Iterator for DenseNodeIter<'_> {
    type Item = Result<Point, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.index >= self.dense.ids.len() {
            return None;
        }
        let i = self.index;
        self.index += 1;

        self.id = self.id.wrapping_add(self.dense.ids[i]);
        self.lat = self.lat.wrapping_add(self.dense.lats[i]);
        self.lon = self.lon.wrapping_add(self.dense.lons[i]);

        match self.next_tags() {
            Ok(tags) => Some(Ok(Point {
                id: self.id,
                lat: self.ctx.lat(self.lat),
                lon: self.ctx.lon(self.lon),
                tags,
            })),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed {
            0
        } else {
            self.dense.ids.len() - self.index
        };
        (0, Some(remaining))
    }
}
