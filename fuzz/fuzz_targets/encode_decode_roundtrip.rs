#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use pbf_decoder::{classify, decode_block, decode_relation, decode_way, BlockContext, DenseNodeIter};
use pbf_encoder::{BlockBuilder, Member};
use pbf_types::EntityKind;

#[derive(Debug, Arbitrary)]
struct FuzzPoint {
    id: i32,
    lat: i32,
    lon: i32,
    tags: Vec<(String, String)>,
}

#[derive(Debug, Arbitrary)]
struct FuzzPath {
    id: i32,
    refs: Vec<i32>,
}

#[derive(Debug, Arbitrary)]
struct FuzzRestriction {
    id: i32,
    from: i32,
    via: i32,
    to: i32,
    only: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    points: Vec<FuzzPoint>,
    paths: Vec<FuzzPath>,
    restrictions: Vec<FuzzRestriction>,
}

// Fuzz target: BlockBuilder -> decoder roundtrip.
//
// Builds a block from structured input, serializes it, parses it back,
// and checks that every entity decodes to what was put in.
fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = FuzzInput::arbitrary(&mut u) else {
        return;
    };

    let mut builder = BlockBuilder::new();
    for p in input.points.iter().take(256) {
        let tags: Vec<(&str, &str)> = p
            .tags
            .iter()
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        builder.add_point_raw(i64::from(p.id), i64::from(p.lat), i64::from(p.lon), &tags);
    }
    for w in input.paths.iter().take(64) {
        let refs: Vec<i64> = w.refs.iter().map(|&r| i64::from(r)).collect();
        builder.add_path(i64::from(w.id), &refs, &[]);
    }
    for r in input.restrictions.iter().take(64) {
        let kind = if r.only { "only_left_turn" } else { "no_left_turn" };
        builder.add_relation(
            i64::from(r.id),
            &[
                Member::way(i64::from(r.from), "from"),
                Member::node(i64::from(r.via), "via"),
                Member::way(i64::from(r.to), "to"),
            ],
            &[("type", "restriction"), ("restriction", kind)],
        );
    }

    let block = decode_block(&builder.build().encode_body()).unwrap();
    let ctx = BlockContext::new(&block);

    for group in &block.groups {
        match classify(group).unwrap() {
            EntityKind::DenseNodes => {
                let dense = group.dense.as_ref().unwrap();
                let points = DenseNodeIter::new(ctx, dense).unwrap();
                for (point, expected) in points.zip(&input.points) {
                    let point = point.unwrap();
                    assert_eq!(point.id, i64::from(expected.id));
                    assert_eq!(point.lat, ctx.lat(i64::from(expected.lat)));
                }
            }
            EntityKind::Ways => {
                for (way, expected) in group.ways.iter().zip(&input.paths) {
                    let path = decode_way(&ctx, way).unwrap();
                    let refs: Vec<i64> = expected.refs.iter().map(|&r| i64::from(r)).collect();
                    assert_eq!(path.node_refs, refs);
                }
            }
            EntityKind::Relations => {
                for (relation, expected) in group.relations.iter().zip(&input.restrictions) {
                    let candidate = decode_relation(&ctx, relation).unwrap().unwrap();
                    assert_eq!(candidate.from_way, i64::from(expected.from));
                    assert_eq!(candidate.via_node, i64::from(expected.via));
                    assert_eq!(candidate.to_way, i64::from(expected.to));
                    assert_eq!(candidate.is_only, expected.only);
                }
            }
            EntityKind::Nodes => unreachable!("builder emits dense groups"),
        }
    }
});
