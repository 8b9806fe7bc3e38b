/// Implementation of `pbf inspect`.
///
/// Walks the file frame by frame and prints one line per frame, followed
/// by the decoded header block or the group layout of each data block.
///
/// # Example output
///
/// ```text
/// #0  OSMHeader  blob=98 B  raw=84 B  zlib
///     program: osmium/1.16.0
///     required: OsmSchema-V0.6, DenseNodes
///     bbox: 2.224100,48.815500 .. 2.469800,48.902200
/// #1  OSMData    blob=61234 B  raw=125840 B  zlib
///     strings=812  granularity=100
///     group 0: DenseNodes x8000
/// ```
///
/// With `--no-decode` only the first line of each frame is printed.
use anyhow::{Context, Result};
use pbf_decoder::{FrameReader, classify, decode_block, materialize};
use pbf_types::{EntityKind, HeaderBlock, PrimitiveBlock, PrimitiveGroup};
use pbf_wire::frame::{OSM_DATA, OSM_HEADER};
use pbf_wire::{Blob, FrameHeader};
use tokio::fs::File;
use tokio::io::BufReader;

use crate::InspectArgs;

/// Run the `pbf inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a frame fails to
/// read or decode.
pub async fn run(args: &InspectArgs) -> Result<()> {
    let file = File::open(&args.file)
        .await
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let mut reader = FrameReader::new(BufReader::new(file));
    let limit = args.frames.unwrap_or(usize::MAX);

    let mut index = 0;
    while index < limit {
        let Some((header, blob)) = reader
            .next_frame()
            .await
            .with_context(|| format!("frame #{index}"))?
        else {
            break;
        };
        println!("{}", frame_line(index, &header, &blob));

        if !args.no_decode {
            let bytes = materialize(&blob, reader.limits().max_blob_size)
                .with_context(|| format!("frame #{index}: blob"))?;
            match header.frame_type.as_str() {
                OSM_HEADER => {
                    let block = HeaderBlock::decode_body(&bytes)
                        .with_context(|| format!("frame #{index}: header block"))?;
                    print_header(&block);
                }
                OSM_DATA => {
                    let block = decode_block(&bytes)
                        .with_context(|| format!("frame #{index}: data block"))?;
                    print_block(&block);
                }
                other => {
                    tracing::warn!(frame = index, frame_type = other, "unknown frame type");
                    println!("    (unknown frame type)");
                }
            }
        }
        index += 1;
    }

    println!();
    println!("{index} frame(s), {} bytes read", reader.bytes_read());
    Ok(())
}

fn frame_line(index: usize, header: &FrameHeader, blob: &Blob) -> String {
    let blob_size = header.data_size;
    let raw = blob
        .declared_size()
        .map_or_else(|| "-".to_string(), |n| format!("{n} B"));
    let encoding = blob.encoding().map_or("empty", |e| e.name());
    format!(
        "#{index:<3} {:<10} blob={blob_size} B  raw={raw}  {encoding}",
        header.frame_type
    )
}

fn print_header(block: &HeaderBlock) {
    if let Some(program) = &block.writing_program {
        println!("    program: {program}");
    }
    if let Some(source) = &block.source {
        println!("    source: {source}");
    }
    println!("    required: {}", block.required_features.join(", "));
    if !block.optional_features.is_empty() {
        println!("    optional: {}", block.optional_features.join(", "));
    }
    if let Some(bbox) = &block.bbox {
        let [min_lon, min_lat, max_lon, max_lat] = bbox.to_degrees();
        println!("    bbox: {min_lon:.6},{min_lat:.6} .. {max_lon:.6},{max_lat:.6}");
    }
    if let Some(seq) = block.replication_sequence {
        println!(
            "    replication: seq={seq} ts={} url={}",
            block.replication_timestamp.unwrap_or_default(),
            block.replication_base_url.as_deref().unwrap_or("-")
        );
    }
}

fn print_block(block: &PrimitiveBlock) {
    println!(
        "    strings={}  granularity={}",
        block.string_table.len(),
        block.granularity
    );
    for (i, group) in block.groups.iter().enumerate() {
        match classify(group) {
            Ok(kind) => println!("    group {i}: {} x{}", kind.name(), group_len(group, kind)),
            Err(e) => println!("    group {i}: {e}"),
        }
    }
}

fn group_len(group: &PrimitiveGroup, kind: EntityKind) -> usize {
    match kind {
        EntityKind::Nodes => group.nodes.len(),
        EntityKind::DenseNodes => group.dense.as_ref().map_or(0, |d| d.len()),
        EntityKind::Ways => group.ways.len(),
        EntityKind::Relations => group.relations.len(),
    }
}
