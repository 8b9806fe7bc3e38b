use pbf_types::{MemberType, Relation, RestrictionCandidate};

use crate::block::BlockContext;
use crate::error::DecodeError;

/// Extract a turn-restriction candidate from a relation.
///
/// Returns `Ok(None)` for relations not tagged `type=restriction`. For
/// restrictions, members are walked in order with one running id
/// accumulator that advances on every member, whatever its role:
///
/// | Member type | `from`     | `to`     | `via`      | other role |
/// |-------------|------------|----------|------------|------------|
/// | node        | ignored    | ignored  | `via_node` | ignored    |
/// | way         | `from_way` | `to_way` | `via_node` | ignored    |
/// | relation    | ignored    | ignored  | ignored    | ignored    |
///
/// A via-way lands in `via_node` and is reported with a warning. The
/// candidate is returned even if some slots stay [`pbf_types::UNSET`].
///
/// # Errors
///
/// - [`DecodeError::MalformedBlock`] if the tag arrays or the member
///   arrays disagree in length.
/// - [`DecodeError::StringIndexOutOfRange`] for a bad tag or role index.
/// - [`DecodeError::UnknownMemberType`] for a `from`/`to`/`via` member
///   whose type is not node, way or relation.
pub fn decode_relation(
    ctx: &BlockContext<'_>,
    relation: &Relation,
) -> Result<Option<RestrictionCandidate>, DecodeError> {
    let tags = ctx.tags(&relation.keys, &relation.vals)?;
    let mut is_restriction = false;
    let mut is_only = false;
    for (key, value) in tags.iter() {
        if key == "type" && value == "restriction" {
            is_restriction = true;
        }
        if key == "restriction" && value.starts_with("only_") {
            is_only = true;
        }
    }
    if !is_restriction {
        return Ok(None);
    }

    let n = relation.roles_sid.len();
    if relation.memids.len() != n || relation.types.len() != n {
        return Err(DecodeError::malformed_block(format!(
            "relation {} has {n} roles, {} member ids, {} member types",
            relation.id,
            relation.memids.len(),
            relation.types.len()
        )));
    }

    let mut candidate = RestrictionCandidate::new(is_only);
    let mut member_id = 0_i64;
    for i in 0..n {
        member_id = member_id.wrapping_add(relation.memids[i]);

        let role = ctx.string(i64::from(relation.roles_sid[i]))?;
        if !matches!(role, "from" | "to" | "via") {
            continue;
        }

        let member_type = MemberType::from_wire(relation.types[i]).map_err(|_| {
            DecodeError::UnknownMemberType {
                relation_id: relation.id,
                value: relation.types[i],
            }
        })?;

        match (member_type, role) {
            (MemberType::Node, "via") => candidate.via_node = member_id,
            (MemberType::Way, "from") => candidate.from_way = member_id,
            (MemberType::Way, "to") => candidate.to_way = member_id,
            (MemberType::Way, "via") => {
                tracing::warn!(
                    relation = relation.id,
                    way = member_id,
                    "restriction uses a via way; storing the way id as the via node"
                );
                candidate.via_node = member_id;
            }
            _ => {}
        }
    }

    Ok(Some(candidate))
}
