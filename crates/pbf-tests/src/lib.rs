//! Shared fixtures for the integration tests and benchmarks.
//!
//! Files are built in memory with `pbf-encoder`, so every test states the
//! exact content it decodes.

use std::sync::Mutex;

use pbf_driver::{EntitySink, SUPPORTED_FEATURES};
use pbf_encoder::{BlockBuilder, Compression, PbfWriter};
use pbf_types::{HeaderBlock, Path, Point, PrimitiveBlock, RestrictionCandidate};

/// A header requiring exactly the features the pipeline supports.
pub fn header() -> HeaderBlock {
    HeaderBlock {
        required_features: SUPPORTED_FEATURES.iter().map(|f| (*f).to_string()).collect(),
        writing_program: Some("pbf-tests".to_string()),
        ..HeaderBlock::default()
    }
}

/// Serialize a header and data blocks into one PBF byte stream.
pub fn pbf_file(header: &HeaderBlock, blocks: &[PrimitiveBlock], compression: Compression) -> Vec<u8> {
    let mut writer = PbfWriter::new(Vec::new(), compression);
    writer.write_header(header).unwrap();
    for block in blocks {
        writer.write_block(block).unwrap();
    }
    writer.finish().unwrap()
}

/// A block of `count` tagged points on a small grid, with ids starting at
/// `first_id`, plus one path through all of them.
pub fn grid_block(first_id: i64, count: i64) -> PrimitiveBlock {
    let mut builder = BlockBuilder::new();
    let mut refs = Vec::new();
    for i in 0..count {
        let id = first_id + i;
        #[allow(clippy::cast_precision_loss)]
        let step = i as f64 * 0.001;
        if i % 3 == 0 {
            builder.add_point(id, 48.85 + step, 2.35 - step, &[("highway", "crossing")]);
        } else {
            builder.add_point(id, 48.85 + step, 2.35 - step, &[]);
        }
        refs.push(id);
    }
    builder.add_path(first_id, &refs, &[("highway", "residential")]);
    builder.build()
}

/// A file of `blocks` grid blocks with consecutive point ids.
pub fn grid_file(blocks: i64, points_per_block: i64, compression: Compression) -> Vec<u8> {
    let blocks: Vec<_> = (0..blocks)
        .map(|b| grid_block(b * points_per_block + 1, points_per_block))
        .collect();
    pbf_file(&header(), &blocks, compression)
}

/// Sink that records every entity it is given.
///
/// Accepts everything unless built with [`RecordingSink::rejecting`].
#[derive(Default)]
pub struct RecordingSink {
    pub points: Mutex<Vec<Point>>,
    pub paths: Mutex<Vec<Path>>,
    pub restrictions: Mutex<Vec<RestrictionCandidate>>,
    reject: bool,
}

impl RecordingSink {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn point_ids(&self) -> Vec<i64> {
        self.points.lock().unwrap().iter().map(|p| p.id).collect()
    }

    pub fn path_count(&self) -> usize {
        self.paths.lock().unwrap().len()
    }
}

impl EntitySink for RecordingSink {
    fn notify_point(&self, point: Point) -> bool {
        self.points.lock().unwrap().push(point);
        !self.reject
    }

    fn notify_path(&self, path: Path) -> bool {
        self.paths.lock().unwrap().push(path);
        !self.reject
    }

    fn notify_restriction(&self, restriction: RestrictionCandidate) -> bool {
        self.restrictions.lock().unwrap().push(restriction);
        !self.reject
    }
}
