use pbf_types::{Path, Way};

use crate::block::BlockContext;
use crate::error::DecodeError;

/// Decode a way into a path.
///
/// The id is stored absolute. Node refs are delta-coded and summed with a
/// single running accumulator in array order.
///
/// # Errors
///
/// Fails if the key and value arrays differ in length or an index is out
/// of range.
pub fn decode_way(ctx: &BlockContext<'_>, way: &Way) -> Result<Path, DecodeError> {
    let tags = ctx.tags(&way.keys, &way.vals)?;

    let mut acc = 0_i64;
    let node_refs = way
        .refs
        .iter()
        .map(|&delta| {
            acc = acc.wrapping_add(delta);
            acc
        })
        .collect();

    Ok(Path {
        id: way.id,
        node_refs,
        tags,
    })
}
