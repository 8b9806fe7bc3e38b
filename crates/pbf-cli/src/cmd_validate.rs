/// Implementation of `pbf validate`.
///
/// Runs the full pipeline with a sink that accepts every entity and
/// reports either success checkmarks (`✓`) or the failing step (`✗`).
///
/// ```text
/// ✓ Header: OsmSchema-V0.6, DenseNodes (osmium/1.16.0)
/// ✓ Blocks: 214 read, 214 decoded
/// ✓ Entities: 1702341 points, 241772 paths, 1180 restrictions
/// ```
///
/// A run that ends early because of a truncated or corrupt frame still
/// decodes what came before it; validate reports that as a failure.
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use pbf_driver::{NullSink, Pipeline};
use tokio::fs::File;
use tokio::io::BufReader;

use crate::ValidateArgs;

/// Run the `pbf validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, initialization or the
/// run fails, or the block stream ended on a read error.
pub async fn run(args: &ValidateArgs) -> Result<()> {
    let file = File::open(&args.file)
        .await
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let config = args.pipeline.config();
    tracing::debug!(
        file = %args.file.display(),
        consumers = config.consumers,
        queue_capacity = config.queue_capacity,
        "validating"
    );
    let mut pipeline = Pipeline::builder(BufReader::new(file), Arc::new(NullSink))
        .config(config)
        .build();

    let header = match pipeline.try_initialize().await {
        Ok(header) => header,
        Err(e) => {
            println!("✗ Header: {e}");
            return Err(anyhow!("validation failed"));
        }
    };
    println!(
        "✓ Header: {} ({})",
        header.required_features.join(", "),
        header.writing_program.as_deref().unwrap_or("unknown program")
    );

    if let Err(e) = pipeline.try_run().await {
        println!("✗ Blocks: {e}");
        return Err(anyhow!("validation failed"));
    }
    let stats = pipeline.stats();
    if stats.read_errors > 0 {
        tracing::warn!(
            blocks_read = stats.blocks_read,
            bytes_read = stats.bytes_read,
            "block stream ended on a read error"
        );
        println!(
            "✗ Blocks: stream ended on a read error after {} block(s)",
            stats.blocks_read
        );
        return Err(anyhow!("validation failed"));
    }

    println!(
        "✓ Blocks: {} read, {} decoded",
        stats.blocks_read, stats.blocks_processed
    );
    println!(
        "✓ Entities: {} points, {} paths, {} restrictions",
        stats.points, stats.paths, stats.restrictions
    );
    if stats.node_groups_skipped > 0 {
        println!(
            "  note: {} plain-node group(s) skipped, rerun with --plain-nodes",
            stats.node_groups_skipped
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pbf_encoder::{BlockBuilder, Compression, PbfWriter};
    use pbf_types::HeaderBlock;

    use super::*;
    use crate::PipelineArgs;

    fn write_file(name: &str, truncate_by: usize) -> PathBuf {
        let mut writer = PbfWriter::new(Vec::new(), Compression::Zlib);
        writer
            .write_header(&HeaderBlock {
                required_features: vec!["OsmSchema-V0.6".into(), "DenseNodes".into()],
                ..HeaderBlock::default()
            })
            .unwrap();
        for b in 0..3 {
            let mut block = BlockBuilder::new();
            block.add_point(b + 1, 48.85, 2.35, &[("amenity", "cafe")]);
            writer.write_block(&block.build()).unwrap();
        }
        let mut bytes = writer.finish().unwrap();
        bytes.truncate(bytes.len() - truncate_by);
        let path = std::env::temp_dir()
            .join(format!("pbf-cli-{}-{name}.osm.pbf", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn args(file: PathBuf) -> ValidateArgs {
        ValidateArgs {
            file,
            pipeline: PipelineArgs {
                consumers: 2,
                queue_capacity: 4,
                plain_nodes: false,
                max_blob_size: None,
            },
        }
    }

    #[tokio::test]
    async fn complete_file_validates() {
        let path = write_file("complete", 0);
        let result = run(&args(path.clone())).await;
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn truncated_stream_fails_validation() {
        let path = write_file("truncated", 5);
        let result = run(&args(path.clone())).await;
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result.unwrap_err().to_string(), "validation failed");
    }
}
