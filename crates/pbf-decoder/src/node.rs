use pbf_types::{Node, Point};

use crate::block::BlockContext;
use crate::error::DecodeError;

/// Decode a plain node. Unlike dense nodes, id and coordinates are
/// absolute.
///
/// # Errors
///
/// Fails if the key and value arrays differ in length or an index is out
/// of range.
pub fn decode_node(ctx: &BlockContext<'_>, node: &Node) -> Result<Point, DecodeError> {
    Ok(Point {
        id: node.id,
        lat: ctx.lat(node.lat),
        lon: ctx.lon(node.lon),
        tags: ctx.tags(&node.keys, &node.vals)?,
    })
}
