/// Implementation of `pbf stats`.
///
/// Runs the pipeline with a counting sink and prints a summary.
///
/// # Example output
///
/// ```text
/// File:     monaco.osm.pbf  (601 KiB)
/// Program:  osmium/1.16.0
/// Blocks:   7 read, 7 decoded  (1 consumer, 0.21 s)
///
/// Entity             Count
/// ────────────────────────
/// points             31472
///   tagged            3519
/// paths               4872
///   node refs        39871
/// restrictions          41
///   only_*              12
///   incomplete           3
/// ────────────────────────
///
/// Bounds:   7.4091,43.7247 .. 7.4398,43.7519
/// ```
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use pbf_decoder::block::COORDINATE_PRECISION;
use pbf_driver::{EntitySink, Pipeline};
use pbf_types::{Path, Point, RestrictionCandidate};
use tokio::fs::File;
use tokio::io::BufReader;

use crate::StatsArgs;

// ── Counting sink ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Bounds {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
    seen: bool,
}

impl Bounds {
    fn extend(&mut self, lat: f64, lon: f64) {
        if self.seen {
            self.min_lat = self.min_lat.min(lat);
            self.max_lat = self.max_lat.max(lat);
            self.min_lon = self.min_lon.min(lon);
            self.max_lon = self.max_lon.max(lon);
        } else {
            *self = Bounds {
                min_lat: lat,
                min_lon: lon,
                max_lat: lat,
                max_lon: lon,
                seen: true,
            };
        }
    }
}

/// Sink that only counts. Shared across consumers, hence atomics.
#[derive(Default)]
struct CountingSink {
    points: AtomicU64,
    tagged_points: AtomicU64,
    paths: AtomicU64,
    node_refs: AtomicU64,
    restrictions: AtomicU64,
    only_restrictions: AtomicU64,
    incomplete_restrictions: AtomicU64,
    bounds: Mutex<Bounds>,
}

impl EntitySink for CountingSink {
    fn notify_point(&self, point: Point) -> bool {
        self.points.fetch_add(1, Ordering::Relaxed);
        if !point.tags.is_empty() {
            self.tagged_points.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut bounds) = self.bounds.lock() {
            bounds.extend(point.lat, point.lon);
        }
        true
    }

    fn notify_path(&self, path: Path) -> bool {
        self.paths.fetch_add(1, Ordering::Relaxed);
        self.node_refs
            .fetch_add(path.node_refs.len() as u64, Ordering::Relaxed);
        true
    }

    fn notify_restriction(&self, restriction: RestrictionCandidate) -> bool {
        self.restrictions.fetch_add(1, Ordering::Relaxed);
        if restriction.is_only {
            self.only_restrictions.fetch_add(1, Ordering::Relaxed);
        }
        if !restriction.is_complete() {
            self.incomplete_restrictions.fetch_add(1, Ordering::Relaxed);
        }
        true
    }
}

// ── Command ───────────────────────────────────────────────────────────────────

/// Run the `pbf stats` command.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the pipeline fails to
/// initialize or run.
pub async fn run(args: &StatsArgs) -> Result<()> {
    let file = File::open(&args.file)
        .await
        .with_context(|| format!("cannot open {}", args.file.display()))?;
    let file_size = file.metadata().await.map(|m| m.len()).unwrap_or_default();

    let sink = Arc::new(CountingSink::default());
    let config = args.pipeline.config();
    let mut pipeline = Pipeline::builder(BufReader::new(file), sink.clone())
        .config(config)
        .build();

    let started = Instant::now();
    let header = pipeline
        .try_initialize()
        .await
        .with_context(|| format!("failed to initialize {}", args.file.display()))?;
    if !pipeline.run().await {
        bail!("decoding {} failed", args.file.display());
    }
    let elapsed = started.elapsed();
    let stats = pipeline.stats();
    tracing::debug!(
        elapsed_s = elapsed.as_secs_f64(),
        consumers = config.consumers,
        "stats run finished"
    );

    println!(
        "File:     {}  ({} KiB)",
        args.file.display(),
        file_size.div_ceil(1024)
    );
    println!(
        "Program:  {}",
        header.writing_program.as_deref().unwrap_or("-")
    );
    println!(
        "Blocks:   {} read, {} decoded  ({} consumer{}, {:.2} s)",
        stats.blocks_read,
        stats.blocks_processed,
        config.consumers,
        if config.consumers == 1 { "" } else { "s" },
        elapsed.as_secs_f64()
    );
    println!();

    let rows = [
        ("points", &sink.points),
        ("  tagged", &sink.tagged_points),
        ("paths", &sink.paths),
        ("  node refs", &sink.node_refs),
        ("restrictions", &sink.restrictions),
        ("  only_*", &sink.only_restrictions),
        ("  incomplete", &sink.incomplete_restrictions),
    ];
    println!("{:<14} {:>9}", "Entity", "Count");
    println!("{}", "─".repeat(24));
    for (label, count) in rows {
        println!("{label:<14} {:>9}", count.load(Ordering::Relaxed));
    }
    println!("{}", "─".repeat(24));

    if stats.read_errors > 0 {
        println!("warning: input ended on a read error; counts are partial");
    }
    if stats.node_groups_skipped > 0 {
        println!(
            "warning: {} plain-node group(s) skipped, rerun with --plain-nodes",
            stats.node_groups_skipped
        );
    }

    if let Ok(bounds) = sink.bounds.lock() {
        if bounds.seen {
            println!();
            println!(
                "Bounds:   {:.4},{:.4} .. {:.4},{:.4}",
                bounds.min_lon / COORDINATE_PRECISION,
                bounds.min_lat / COORDINATE_PRECISION,
                bounds.max_lon / COORDINATE_PRECISION,
                bounds.max_lat / COORDINATE_PRECISION
            );
        }
    }
    Ok(())
}
