#![no_main]

use libfuzzer_sys::fuzz_target;
use pbf_decoder::{
    classify, decode_block, decode_node, decode_relation, decode_way, BlockContext, DenseNodeIter,
};
use pbf_types::EntityKind;

// Fuzz target: decode a PrimitiveBlock body and every entity in it.
//
// Mirrors what a pipeline consumer does with a block, minus the sink.
//
// Catches bugs in:
// - String indices past the table or negative
// - Dense columns of different lengths
// - keys_vals without a trailing terminator or with a dangling key
// - Delta overflow in ids, coordinates, refs and member ids
// - Unknown member types on restriction roles
fuzz_target!(|data: &[u8]| {
    let Ok(block) = decode_block(data) else {
        return;
    };
    let ctx = BlockContext::new(&block);
    for group in &block.groups {
        let Ok(kind) = classify(group) else {
            continue;
        };
        match kind {
            EntityKind::DenseNodes => {
                if let Some(dense) = &group.dense {
                    if let Ok(points) = DenseNodeIter::new(ctx, dense) {
                        for point in points {
                            if point.is_err() {
                                break;
                            }
                        }
                    }
                }
            }
            EntityKind::Nodes => {
                for node in &group.nodes {
                    let _ = decode_node(&ctx, node);
                }
            }
            EntityKind::Ways => {
                for way in &group.ways {
                    let _ = decode_way(&ctx, way);
                }
            }
            EntityKind::Relations => {
                for relation in &group.relations {
                    let _ = decode_relation(&ctx, relation);
                }
            }
        }
    }
});
