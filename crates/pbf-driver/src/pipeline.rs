use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pbf_decoder::{DecodeError, FrameReader, ReaderLimits};
use pbf_types::{HeaderBlock, PrimitiveBlock};
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, Receiver, Sender, WeakSender};
use tokio::task::JoinSet;

use crate::config::ParserConfig;
use crate::consumer::Consumer;
use crate::error::PipelineError;
use crate::sink::{EntitySink, ScriptHook};
use crate::stats::RunStats;

/// Header features this reader can honour.
pub const SUPPORTED_FEATURES: [&str; 2] = ["OsmSchema-V0.6", "DenseNodes"];

/// `None` is the end-of-stream sentinel.
type QueueItem = Option<PrimitiveBlock>;
type SharedReceiver = Arc<Mutex<Receiver<QueueItem>>>;

/// Lifecycle of a [`Pipeline`].
///
/// ```text
///   Idle ──initialize──▶ Initialized ──run──▶ Running ──▶ Draining ──▶ Done
///    │                                                        │
///    └──────────────────────────▶ Failed ◀────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Initialized,
    Running,
    Draining,
    Done,
    Failed,
}

// ── Pipeline ────────────────────────────────────────────────────────

/// Two-stage decode pipeline over a PBF byte stream.
///
/// The producer is an async task that reads frames and pushes decoded
/// blocks onto a bounded queue. One or more consumers pop blocks in FIFO
/// order, decode their groups, and hand entities to the [`EntitySink`].
///
/// ```text
///   AsyncRead ─▶ producer ─▶ [ Some(block) ... Some(block) None ] ─▶ consumer(s) ─▶ sink
///                  (task)          bounded mpsc, cap N             (blocking)
/// ```
///
/// The producer ends the stream with one `None`. A consumer that pops it
/// pushes it back before stopping, so every other consumer sees it too.
/// Consumers only hold weak senders; once the producer is gone the queue
/// closes and they stop after draining it.
///
/// A block-level error in any consumer raises a shared abort flag: from
/// then on no consumer dispatches another entity, and popped blocks are
/// discarded. If either stage panics the queue is closed so the other
/// stage cannot block on it, and the run reports
/// [`PipelineError::TaskFailed`]. Whatever is still queued after both
/// stages join is released during teardown.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use pbf_driver::{NullSink, Pipeline};
///
/// # async fn demo() -> std::io::Result<()> {
/// let file = tokio::fs::File::open("planet.osm.pbf").await?;
/// let mut pipeline = Pipeline::new(file, Arc::new(NullSink));
/// if pipeline.initialize().await && pipeline.run().await {
///     println!("{}", pipeline.stats());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<R> {
    reader: Option<FrameReader<R>>,
    config: ParserConfig,
    sink: Arc<dyn EntitySink>,
    hook: Option<Arc<dyn ScriptHook>>,
    state: PipelineState,
    header: Option<HeaderBlock>,
    stats: RunStats,
}

impl<R> Pipeline<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Create a pipeline with the default configuration and no hook.
    pub fn new(reader: R, sink: Arc<dyn EntitySink>) -> Self {
        PipelineBuilder::new(reader, sink).build()
    }

    pub fn builder(reader: R, sink: Arc<dyn EntitySink>) -> PipelineBuilder<R> {
        PipelineBuilder::new(reader, sink)
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// The header block, once [`initialize`](Self::initialize) succeeded.
    #[must_use]
    pub fn header(&self) -> Option<&HeaderBlock> {
        self.header.as_ref()
    }

    #[must_use]
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Read the header frame and check its required features.
    ///
    /// Returns `false` and logs the cause on any failure; see
    /// [`try_initialize`](Self::try_initialize) for the error itself.
    pub async fn initialize(&mut self) -> bool {
        match self.try_initialize().await {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("initialization failed: {err}");
                false
            }
        }
    }

    /// Read the header frame and check its required features.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidState`] unless the pipeline is `Idle`.
    /// - [`PipelineError::Decode`] if the first frame is missing, is not
    ///   an `OSMHeader`, or does not decode.
    /// - [`PipelineError::UnsupportedFeature`] for the first required
    ///   feature outside [`SUPPORTED_FEATURES`].
    pub async fn try_initialize(&mut self) -> Result<HeaderBlock, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(self.invalid_state("initialize"));
        }
        let Some(reader) = self.reader.as_mut() else {
            return Err(self.invalid_state("initialize"));
        };

        let header = match reader.read_header_block().await {
            Ok(header) => header,
            Err(err) => {
                self.state = PipelineState::Failed;
                return Err(err.into());
            }
        };

        let unsupported = header.unsupported_features(&SUPPORTED_FEATURES);
        if let Some(&first) = unsupported.first() {
            for feature in &unsupported {
                tracing::error!(feature = *feature, "required feature not supported");
            }
            let feature = first.to_string();
            self.state = PipelineState::Failed;
            return Err(PipelineError::UnsupportedFeature { feature });
        }

        tracing::info!(
            writing_program = header.writing_program.as_deref().unwrap_or("-"),
            source = header.source.as_deref().unwrap_or("-"),
            required = ?header.required_features,
            "PBF header accepted"
        );
        self.state = PipelineState::Initialized;
        self.header = Some(header.clone());
        Ok(header)
    }

    /// Run both stages to completion.
    ///
    /// Returns `false` if the pipeline was not initialized or a consumer
    /// hit a block-level error. Read errors after the header end the
    /// stream early but do not fail the run.
    pub async fn run(&mut self) -> bool {
        match self.try_run().await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("run failed: {err}");
                false
            }
        }
    }

    /// Run both stages to completion.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidState`] unless the pipeline is
    ///   `Initialized`.
    /// - [`PipelineError::Decode`] with the first block-level error a
    ///   consumer hit.
    /// - [`PipelineError::TaskFailed`] if a stage panicked.
    pub async fn try_run(&mut self) -> Result<(), PipelineError> {
        if self.state != PipelineState::Initialized {
            return Err(self.invalid_state("run"));
        }
        let Some(reader) = self.reader.take() else {
            return Err(self.invalid_state("run"));
        };
        self.state = PipelineState::Running;

        let (tx, rx) = mpsc::channel::<QueueItem>(self.config.queue_capacity.max(1));
        let rx: SharedReceiver = Arc::new(Mutex::new(rx));
        let abort = Arc::new(AtomicBool::new(false));

        let mut consumers = JoinSet::new();
        for id in 0..self.config.consumers.max(1) {
            let consumer = Consumer::new(
                id,
                Arc::clone(&self.sink),
                self.hook.clone(),
                self.config.plain_nodes,
                Arc::clone(&abort),
            );
            let rx = Arc::clone(&rx);
            let tx = tx.downgrade();
            consumers.spawn_blocking(move || consume(consumer, &rx, &tx));
        }
        let mut producer = tokio::spawn(produce(reader, tx));
        let mut producer_done = false;

        let mut fatal: Option<DecodeError> = None;
        let mut task_failure: Option<(&'static str, String)> = None;

        loop {
            tokio::select! {
                joined = &mut producer, if !producer_done => {
                    producer_done = true;
                    self.state = PipelineState::Draining;
                    match joined {
                        Ok(stats) => self.stats.merge(&stats),
                        Err(err) => {
                            tracing::error!("producer task failed: {err}");
                            abort.store(true, Ordering::Release);
                            if task_failure.is_none() {
                                task_failure = Some(("producer", err.to_string()));
                            }
                        }
                    }
                }
                Some(joined) = consumers.join_next() => match joined {
                    Ok((stats, err)) => {
                        self.stats.merge(&stats);
                        if fatal.is_none() {
                            fatal = err;
                        }
                    }
                    Err(err) => {
                        tracing::error!("consumer task failed: {err}");
                        abort.store(true, Ordering::Release);
                        rx.lock().await.close();
                        if task_failure.is_none() {
                            task_failure = Some(("consumer", err.to_string()));
                        }
                    }
                },
                else => break,
            }
        }

        self.stats.released_on_teardown += release_remaining(&rx).await;
        tracing::info!(
            blocks = self.stats.blocks_processed,
            points = self.stats.points,
            paths = self.stats.paths,
            restrictions = self.stats.restrictions,
            released = self.stats.released_on_teardown,
            "pipeline finished"
        );

        if let Some((stage, reason)) = task_failure {
            self.state = PipelineState::Failed;
            return Err(PipelineError::TaskFailed { stage, reason });
        }
        if let Some(err) = fatal {
            self.state = PipelineState::Failed;
            return Err(err.into());
        }
        self.state = PipelineState::Done;
        Ok(())
    }

    fn invalid_state(&self, operation: &'static str) -> PipelineError {
        PipelineError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

// ── Stages ──────────────────────────────────────────────────────────

/// Read blocks until the stream ends, then push the sentinel.
///
/// A read or decode error ends the stream like a clean EOF does; it is
/// logged and counted in `read_errors`.
async fn produce<R>(mut reader: FrameReader<R>, tx: Sender<QueueItem>) -> RunStats
where
    R: AsyncRead + Unpin,
{
    let mut stats = RunStats::default();
    loop {
        match reader.next_block().await {
            Ok(Some(block)) => {
                stats.blocks_read += 1;
                if tx.send(Some(block)).await.is_err() {
                    tracing::warn!("block queue closed before end of input");
                    break;
                }
            }
            Ok(None) => {
                tracing::debug!(blocks = stats.blocks_read, "end of block stream");
                break;
            }
            Err(err) => {
                tracing::warn!("stopping at frame {}: {err}", reader.frames_read());
                stats.read_errors += 1;
                break;
            }
        }
    }
    stats.bytes_read = reader.bytes_read();
    let _ = tx.send(None).await;
    stats
}

/// Pop and process blocks until the sentinel or channel closure.
///
/// Once the run is aborted the consumer keeps popping and releasing
/// blocks so the producer never waits on a full queue.
fn consume(
    mut consumer: Consumer,
    rx: &SharedReceiver,
    tx: &WeakSender<QueueItem>,
) -> (RunStats, Option<DecodeError>) {
    let mut fatal: Option<DecodeError> = None;
    loop {
        let item = rx.blocking_lock().blocking_recv();
        match item {
            Some(Some(block)) => {
                if consumer.aborted() {
                    consumer.discard();
                    continue;
                }
                if let Err(err) = consumer.process_block(&block) {
                    tracing::error!(consumer = consumer.id(), "aborting dispatch: {err}");
                    consumer.abort_run();
                    fatal = Some(err);
                }
            }
            Some(None) => {
                // The producer has already let go if upgrading fails; the
                // closed queue then stops the others.
                if let Some(tx) = tx.upgrade() {
                    let _ = tx.blocking_send(None);
                }
                break;
            }
            None => break,
        }
    }
    (consumer.into_stats(), fatal)
}

/// Drain whatever is left on the queue after both stages joined.
async fn release_remaining(rx: &SharedReceiver) -> u64 {
    let mut rx = rx.lock().await;
    let mut released = 0;
    while let Ok(item) = rx.try_recv() {
        if item.is_some() {
            released += 1;
        }
    }
    released
}

// ── Builder ─────────────────────────────────────────────────────────

/// Builder for a [`Pipeline`] with a non-default configuration or a
/// script hook.
pub struct PipelineBuilder<R> {
    reader: R,
    sink: Arc<dyn EntitySink>,
    hook: Option<Arc<dyn ScriptHook>>,
    config: ParserConfig,
}

impl<R> PipelineBuilder<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, sink: Arc<dyn EntitySink>) -> Self {
        Self {
            reader,
            sink,
            hook: None,
            config: ParserConfig::default(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn consumers(mut self, consumers: usize) -> Self {
        self.config.consumers = consumers;
        self
    }

    #[must_use]
    pub fn plain_nodes(mut self, enabled: bool) -> Self {
        self.config.plain_nodes = enabled;
        self
    }

    #[must_use]
    pub fn limits(mut self, limits: ReaderLimits) -> Self {
        self.config.limits = limits;
        self
    }

    #[must_use]
    pub fn script_hook(mut self, hook: Arc<dyn ScriptHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn build(self) -> Pipeline<R> {
        Pipeline {
            reader: Some(FrameReader::with_limits(self.reader, self.config.limits)),
            config: self.config,
            sink: self.sink,
            hook: self.hook,
            state: PipelineState::Idle,
            header: None,
            stats: RunStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    use pbf_encoder::{BlockBuilder, Compression, PbfWriter};
    use pbf_types::{Path, Point, RestrictionCandidate};
    use tokio::io::ReadBuf;

    use super::*;

    #[derive(Default)]
    struct Counter {
        points: AtomicU64,
        paths: AtomicU64,
    }

    impl EntitySink for Counter {
        fn notify_point(&self, _point: Point) -> bool {
            self.points.fetch_add(1, Ordering::Relaxed);
            true
        }

        fn notify_path(&self, _path: Path) -> bool {
            self.paths.fetch_add(1, Ordering::Relaxed);
            true
        }

        fn notify_restriction(&self, _restriction: RestrictionCandidate) -> bool {
            true
        }
    }

    fn header(features: &[&str]) -> HeaderBlock {
        HeaderBlock {
            required_features: features.iter().map(|f| (*f).to_string()).collect(),
            ..HeaderBlock::default()
        }
    }

    fn file(blocks: usize, points_per_block: i64) -> Vec<u8> {
        let mut writer = PbfWriter::new(Vec::new(), Compression::Zlib);
        writer.write_header(&header(&SUPPORTED_FEATURES)).unwrap();
        for b in 0..blocks {
            let mut builder = BlockBuilder::new();
            for i in 0..points_per_block {
                let id = i64::try_from(b).unwrap() * points_per_block + i + 1;
                builder.add_point(id, 1.0, 1.0, &[]);
            }
            builder.add_path(1_000 + i64::try_from(b).unwrap(), &[1, 2], &[]);
            writer.write_block(&builder.build()).unwrap();
        }
        writer.finish().unwrap()
    }

    #[tokio::test]
    async fn runs_to_completion() {
        let sink = Arc::new(Counter::default());
        let mut pipeline = Pipeline::new(Cursor::new(file(3, 4)), sink.clone());
        assert_eq!(pipeline.state(), PipelineState::Idle);
        assert!(pipeline.initialize().await);
        assert_eq!(pipeline.state(), PipelineState::Initialized);
        assert!(pipeline.header().is_some());
        assert!(pipeline.run().await);
        assert_eq!(pipeline.state(), PipelineState::Done);

        assert_eq!(sink.points.load(Ordering::Relaxed), 12);
        assert_eq!(sink.paths.load(Ordering::Relaxed), 3);
        let stats = pipeline.stats();
        assert_eq!(stats.blocks_read, 3);
        assert_eq!(stats.blocks_processed, 3);
        assert_eq!(stats.released_on_teardown, 0);
    }

    #[tokio::test]
    async fn run_before_initialize_fails() {
        let mut pipeline = Pipeline::new(Cursor::new(file(1, 1)), Arc::new(Counter::default()));
        assert!(!pipeline.run().await);
        assert!(matches!(
            pipeline.try_run().await,
            Err(PipelineError::InvalidState {
                operation: "run",
                state: PipelineState::Idle
            })
        ));
    }

    #[tokio::test]
    async fn initialize_twice_fails() {
        let mut pipeline = Pipeline::new(Cursor::new(file(1, 1)), Arc::new(Counter::default()));
        assert!(pipeline.initialize().await);
        assert!(!pipeline.initialize().await);
        assert_eq!(pipeline.state(), PipelineState::Initialized);
    }

    #[tokio::test]
    async fn unsupported_feature_fails_initialize() {
        let mut writer = PbfWriter::new(Vec::new(), Compression::None);
        writer
            .write_header(&header(&["OsmSchema-V0.6", "HistoricalInformation"]))
            .unwrap();
        let bytes = writer.finish().unwrap();

        let mut pipeline = Pipeline::new(Cursor::new(bytes), Arc::new(Counter::default()));
        match pipeline.try_initialize().await {
            Err(PipelineError::UnsupportedFeature { feature }) => {
                assert_eq!(feature, "HistoricalInformation");
            }
            other => panic!("expected UnsupportedFeature, got {other:?}"),
        }
        assert_eq!(pipeline.state(), PipelineState::Failed);
        assert!(!pipeline.run().await);
    }

    #[tokio::test]
    async fn empty_input_fails_initialize() {
        let mut pipeline = Pipeline::new(Cursor::new(Vec::new()), Arc::new(Counter::default()));
        assert!(matches!(
            pipeline.try_initialize().await,
            Err(PipelineError::Decode(DecodeError::MalformedHeader { .. }))
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn tiny_queue_and_many_consumers() {
        let sink = Arc::new(Counter::default());
        let mut pipeline = Pipeline::builder(Cursor::new(file(20, 3)), sink.clone())
            .queue_capacity(1)
            .consumers(4)
            .build();
        assert!(pipeline.initialize().await);
        assert!(pipeline.run().await);
        assert_eq!(sink.points.load(Ordering::Relaxed), 60);
        assert_eq!(pipeline.stats().blocks_processed, 20);
    }

    #[tokio::test]
    async fn truncated_tail_ends_stream_without_failing() {
        let mut bytes = file(2, 2);
        bytes.truncate(bytes.len() - 3);
        let sink = Arc::new(Counter::default());
        let mut pipeline = Pipeline::new(Cursor::new(bytes), sink.clone());
        assert!(pipeline.initialize().await);
        assert!(pipeline.run().await);
        assert_eq!(pipeline.stats().blocks_read, 1);
        assert_eq!(pipeline.stats().read_errors, 1);
        assert_eq!(sink.points.load(Ordering::Relaxed), 2);
    }

    struct PanickingSink;

    impl EntitySink for PanickingSink {
        fn notify_point(&self, _point: Point) -> bool {
            panic!("sink failed");
        }

        fn notify_path(&self, _path: Path) -> bool {
            true
        }

        fn notify_restriction(&self, _restriction: RestrictionCandidate) -> bool {
            true
        }
    }

    /// Serves `inner` until `limit` bytes have gone out, then panics.
    struct PanicAfter {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl AsyncRead for PanicAfter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            assert!(self.inner.position() < self.limit, "reader failed");
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    #[tokio::test]
    async fn consumer_panic_fails_the_run() {
        let mut pipeline = Pipeline::builder(Cursor::new(file(10, 5)), Arc::new(PanickingSink))
            .queue_capacity(2)
            .consumers(1)
            .build();
        assert!(pipeline.initialize().await);

        let result = tokio::time::timeout(Duration::from_secs(10), pipeline.try_run())
            .await
            .expect("run returned");
        assert!(matches!(
            result,
            Err(PipelineError::TaskFailed {
                stage: "consumer",
                ..
            })
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn producer_panic_fails_the_run() {
        let bytes = file(10, 5);
        let limit = bytes.len() as u64 / 2;
        let reader = PanicAfter {
            inner: Cursor::new(bytes),
            limit,
        };
        let sink = Arc::new(Counter::default());
        let mut pipeline = Pipeline::builder(reader, sink.clone())
            .queue_capacity(2)
            .consumers(3)
            .build();
        assert!(pipeline.initialize().await);

        let result = tokio::time::timeout(Duration::from_secs(10), pipeline.try_run())
            .await
            .expect("run returned");
        assert!(matches!(
            result,
            Err(PipelineError::TaskFailed {
                stage: "producer",
                ..
            })
        ));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }
}
