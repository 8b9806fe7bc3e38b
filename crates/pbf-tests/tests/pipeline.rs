//! End-to-end pipeline tests.
//!
//! Every test builds a PBF file in memory, runs it through `initialize` and
//! `run`, and checks what reached the sink and what the run statistics say.
//! Several tests use a tiny queue and many consumers so that the sentinel
//! has to be passed on between consumers; a broken hand-off shows up as a
//! test that never finishes.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use pbf_driver::{HookError, Pipeline, PipelineError, PipelineState, ScriptHook};
use pbf_encoder::{BlockBuilder, Compression, Member, PbfWriter};
use pbf_tests::{RecordingSink, grid_block, grid_file, header, pbf_file};
use pbf_types::{Path, Point, PrimitiveBlock, PrimitiveGroup, StringTable};
use pbf_wire::Blob;

fn pipeline(bytes: Vec<u8>, sink: &Arc<RecordingSink>) -> Pipeline<Cursor<Vec<u8>>> {
    Pipeline::new(Cursor::new(bytes), sink.clone())
}

fn empty_group_block() -> PrimitiveBlock {
    PrimitiveBlock {
        string_table: StringTable::new(vec![String::new()]),
        groups: vec![PrimitiveGroup::default()],
        ..PrimitiveBlock::default()
    }
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_consumer_preserves_file_order() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(grid_file(5, 10, Compression::Zlib), &sink);
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);

    assert_eq!(sink.point_ids(), (1..=50).collect::<Vec<_>>());
    assert_eq!(sink.path_count(), 5);

    let stats = pipeline.stats();
    assert_eq!(stats.blocks_read, 5);
    assert_eq!(stats.blocks_processed, 5);
    assert_eq!(stats.points, 50);
    assert_eq!(stats.read_errors, 0);
    assert_eq!(stats.released_on_teardown, 0);
    assert_eq!(pipeline.state(), PipelineState::Done);
}

#[tokio::test]
async fn zstd_and_raw_blobs_decode_like_zlib() {
    for compression in [Compression::None, Compression::Zstd] {
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = pipeline(grid_file(2, 7, compression), &sink);
        assert!(pipeline.initialize().await, "{compression:?}");
        assert!(pipeline.run().await, "{compression:?}");
        assert_eq!(sink.point_ids().len(), 14, "{compression:?}");
    }
}

#[tokio::test]
async fn header_only_file_runs_empty() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(pbf_file(&header(), &[], Compression::Zlib), &sink);
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);
    assert!(sink.point_ids().is_empty());
    assert_eq!(pipeline.stats().blocks_read, 0);
}

#[tokio::test]
async fn header_metadata_is_exposed() {
    let mut meta = header();
    meta.source = Some("survey".to_string());
    meta.replication_sequence = Some(4_242);
    let bytes = pbf_file(&meta, &[], Compression::None);

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    let returned = pipeline.try_initialize().await.unwrap();
    assert_eq!(returned, meta);
    assert_eq!(pipeline.header(), Some(&meta));
}

// ── Sentinel hand-off ─────────────────────────────────────────────────────────

#[tokio::test]
async fn sentinel_reaches_every_consumer() {
    for consumers in [2, 3, 8] {
        let sink = Arc::new(RecordingSink::default());
        let mut pipeline = Pipeline::builder(Cursor::new(grid_file(12, 5, Compression::Zlib)), sink.clone())
            .queue_capacity(1)
            .consumers(consumers)
            .build();
        assert!(pipeline.initialize().await);
        assert!(pipeline.run().await, "consumers={consumers}");

        let mut ids = sink.point_ids();
        ids.sort_unstable();
        assert_eq!(ids, (1..=60).collect::<Vec<_>>(), "consumers={consumers}");
        assert_eq!(pipeline.stats().blocks_processed, 12);
        assert_eq!(pipeline.stats().released_on_teardown, 0);
    }
}

#[tokio::test]
async fn more_consumers_than_blocks() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::builder(Cursor::new(grid_file(1, 3, Compression::Zlib)), sink.clone())
        .consumers(6)
        .build();
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);
    assert_eq!(sink.point_ids().len(), 3);
}

// ── Stream ends ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_data_frame_ends_the_stream() {
    let mut writer = PbfWriter::new(Vec::new(), Compression::Zlib);
    writer.write_header(&header()).unwrap();
    writer.write_block(&grid_block(1, 4)).unwrap();
    writer
        .write_raw_frame("OSMIndex", &Blob::raw(vec![1, 2, 3]))
        .unwrap();
    writer.write_block(&grid_block(100, 4)).unwrap();
    let bytes = writer.finish().unwrap();

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);
    assert_eq!(sink.point_ids(), vec![1, 2, 3, 4]);
    assert_eq!(pipeline.stats().read_errors, 0);
}

#[tokio::test]
async fn corrupt_frame_mid_stream_is_end_of_stream() {
    let mut bytes = grid_file(3, 4, Compression::Zlib);
    // Chop into the last frame's blob.
    bytes.truncate(bytes.len() - 5);

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);
    assert_eq!(sink.point_ids(), (1..=8).collect::<Vec<_>>());
    assert_eq!(pipeline.stats().read_errors, 1);
    assert_eq!(pipeline.state(), PipelineState::Done);
}

// ── Failures ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn block_level_error_fails_run_and_drains_queue() {
    let blocks = [
        grid_block(1, 3),
        empty_group_block(),
        grid_block(10, 3),
        grid_block(20, 3),
    ];
    let bytes = pbf_file(&header(), &blocks, Compression::Zlib);

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    assert!(pipeline.initialize().await);
    assert!(!pipeline.run().await);
    assert_eq!(pipeline.state(), PipelineState::Failed);

    assert_eq!(sink.point_ids(), vec![1, 2, 3]);
    let stats = pipeline.stats();
    assert_eq!(stats.blocks_read, 4);
    assert_eq!(stats.blocks_processed, 2);
    assert_eq!(stats.blocks_discarded, 2);
}

/// Holds every point long enough for a failing block popped alongside it
/// to raise the abort flag first.
struct SlowPointHook;

impl ScriptHook for SlowPointHook {
    fn process_point(&self, _point: &mut Point) -> Result<(), HookError> {
        std::thread::sleep(Duration::from_millis(50));
        Ok(())
    }

    fn process_path(&self, _path: &mut Path, _node_count: usize) -> Result<(), HookError> {
        Ok(())
    }
}

#[tokio::test]
async fn block_level_error_stops_every_consumer() {
    let mut blocks = vec![empty_group_block()];
    blocks.extend((0..40).map(|b| grid_block(b * 10 + 1, 5)));
    let bytes = pbf_file(&header(), &blocks, Compression::Zlib);

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::builder(Cursor::new(bytes), sink.clone())
        .consumers(4)
        .queue_capacity(2)
        .script_hook(Arc::new(SlowPointHook))
        .build();
    assert!(pipeline.initialize().await);
    assert!(matches!(
        pipeline.try_run().await,
        Err(PipelineError::Decode(pbf_decoder::DecodeError::EmptyGroup))
    ));

    assert!(sink.point_ids().is_empty());
    assert_eq!(sink.path_count(), 0);
    let stats = pipeline.stats();
    assert_eq!(stats.blocks_read, 41);
    assert_eq!(
        stats.blocks_processed + stats.blocks_discarded + stats.released_on_teardown,
        41
    );
}

#[tokio::test]
async fn block_level_error_surfaces_from_try_run() {
    let bytes = pbf_file(&header(), &[empty_group_block()], Compression::None);
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    pipeline.try_initialize().await.unwrap();
    assert!(matches!(
        pipeline.try_run().await,
        Err(PipelineError::Decode(pbf_decoder::DecodeError::EmptyGroup))
    ));
}

#[tokio::test]
async fn unsupported_feature_stops_before_any_block() {
    let mut meta = header();
    meta.required_features.push("HistoricalInformation".to_string());
    let bytes = pbf_file(&meta, &[grid_block(1, 3)], Compression::Zlib);

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    assert!(!pipeline.initialize().await);
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!pipeline.run().await);
    assert!(sink.point_ids().is_empty());
}

#[tokio::test]
async fn data_frame_first_fails_initialize() {
    let mut writer = PbfWriter::new(Vec::new(), Compression::Zlib);
    writer.write_block(&grid_block(1, 2)).unwrap();
    let bytes = writer.finish().unwrap();

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    assert!(matches!(
        pipeline.try_initialize().await,
        Err(PipelineError::Decode(
            pbf_decoder::DecodeError::UnexpectedFrameType { .. }
        ))
    ));
}

// ── Sink and hook interaction ─────────────────────────────────────────────────

#[tokio::test]
async fn rejected_entities_do_not_fail_the_run() {
    let sink = Arc::new(RecordingSink::rejecting());
    let mut pipeline = pipeline(grid_file(2, 4, Compression::Zlib), &sink);
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);
    assert_eq!(pipeline.stats().rejected_entities, 10);
    assert_eq!(pipeline.stats().entities(), 0);
}

struct HighwayFilterHook;

impl ScriptHook for HighwayFilterHook {
    fn process_point(&self, point: &mut Point) -> Result<(), HookError> {
        if point.tags.contains_key("highway") {
            return Err(HookError::new("tagged points are not allowed"));
        }
        Ok(())
    }

    fn process_path(&self, path: &mut Path, node_count: usize) -> Result<(), HookError> {
        assert_eq!(node_count, path.node_refs.len());
        path.tags.push("checked", "true");
        Ok(())
    }
}

#[tokio::test]
async fn hook_runs_before_sink() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::builder(Cursor::new(grid_file(1, 6, Compression::Zlib)), sink.clone())
        .script_hook(Arc::new(HighwayFilterHook))
        .build();
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);

    // Points 1 and 4 carry highway=crossing and fail the hook.
    assert_eq!(sink.point_ids(), vec![2, 3, 5, 6]);
    assert_eq!(pipeline.stats().hook_failures, 2);
    let paths = sink.paths.lock().unwrap();
    assert_eq!(paths[0].tags.get("checked"), Some("true"));
}

#[tokio::test]
async fn restrictions_reach_the_sink() {
    let mut builder = BlockBuilder::new();
    builder
        .add_relation(
            1,
            &[
                Member::way(10, "from"),
                Member::node(20, "via"),
                Member::way(30, "to"),
            ],
            &[("type", "restriction"), ("restriction", "only_straight_on")],
        )
        .add_relation(2, &[Member::way(10, "outer")], &[("type", "multipolygon")]);
    let bytes = pbf_file(&header(), &[builder.build()], Compression::Zlib);

    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = pipeline(bytes, &sink);
    assert!(pipeline.initialize().await);
    assert!(pipeline.run().await);

    let restrictions = sink.restrictions.lock().unwrap();
    assert_eq!(restrictions.len(), 1);
    assert!(restrictions[0].is_only);
    assert_eq!(
        (restrictions[0].from_way, restrictions[0].via_node, restrictions[0].to_way),
        (10, 20, 30)
    );
    assert_eq!(pipeline.stats().relations_skipped, 1);
}

#[tokio::test]
async fn plain_nodes_need_opt_in() {
    let mut builder = BlockBuilder::new();
    builder
        .plain_nodes()
        .add_point(5, 1.0, 2.0, &[])
        .add_point(6, 1.5, 2.5, &[]);
    let bytes = pbf_file(&header(), &[builder.build()], Compression::Zlib);

    let sink = Arc::new(RecordingSink::default());
    let mut skipped = pipeline(bytes.clone(), &sink);
    assert!(skipped.initialize().await);
    assert!(skipped.run().await);
    assert!(sink.point_ids().is_empty());
    assert_eq!(skipped.stats().node_groups_skipped, 1);

    let mut decoded = Pipeline::builder(Cursor::new(bytes), sink.clone())
        .plain_nodes(true)
        .build();
    assert!(decoded.initialize().await);
    assert!(decoded.run().await);
    assert_eq!(sink.point_ids(), vec![5, 6]);
}
