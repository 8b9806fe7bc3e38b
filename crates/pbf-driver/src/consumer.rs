use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pbf_decoder::{
    BlockContext, DecodeError, DenseNodeIter, classify, decode_node, decode_relation, decode_way,
};
use pbf_types::{EntityKind, Path, Point, PrimitiveBlock, PrimitiveGroup, RestrictionCandidate};

use crate::error::EntityError;
use crate::sink::{EntitySink, ScriptHook};
use crate::stats::RunStats;

/// One decoding context. Each consumer task owns one and keeps its own
/// counters; they are merged once the task joins.
///
/// The abort flag is shared by every consumer of a run. Nothing reaches
/// the sink after it is raised.
pub(crate) struct Consumer {
    id: usize,
    sink: Arc<dyn EntitySink>,
    hook: Option<Arc<dyn ScriptHook>>,
    plain_nodes: bool,
    abort: Arc<AtomicBool>,
    stats: RunStats,
}

impl Consumer {
    pub(crate) fn new(
        id: usize,
        sink: Arc<dyn EntitySink>,
        hook: Option<Arc<dyn ScriptHook>>,
        plain_nodes: bool,
        abort: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id,
            sink,
            hook,
            plain_nodes,
            abort,
            stats: RunStats::default(),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }

    /// Stop dispatch in every consumer of the run.
    pub(crate) fn abort_run(&self) {
        self.abort.store(true, Ordering::Release);
    }

    /// Count a block that was popped but not processed.
    pub(crate) fn discard(&mut self) {
        self.stats.blocks_discarded += 1;
    }

    pub(crate) fn into_stats(self) -> RunStats {
        self.stats
    }

    /// Decode every group in `block` and hand the entities to the sink.
    ///
    /// Entity-level failures are logged and counted here. An `Err` is a
    /// block-level failure; entities dispatched before it stay dispatched.
    pub(crate) fn process_block(&mut self, block: &PrimitiveBlock) -> Result<(), DecodeError> {
        self.stats.blocks_processed += 1;
        let ctx = BlockContext::new(block);
        for group in &block.groups {
            if self.aborted() {
                break;
            }
            self.process_group(&ctx, group)?;
        }
        Ok(())
    }

    fn process_group(
        &mut self,
        ctx: &BlockContext<'_>,
        group: &PrimitiveGroup,
    ) -> Result<(), DecodeError> {
        self.stats.groups += 1;
        let kind = classify(group)?;
        tracing::debug!(consumer = self.id, kind = kind.name(), "decoding group");

        match kind {
            EntityKind::DenseNodes => {
                if let Some(dense) = &group.dense {
                    for point in DenseNodeIter::new(*ctx, dense)? {
                        self.dispatch_point(point?);
                    }
                }
            }
            EntityKind::Nodes => {
                if !self.plain_nodes {
                    tracing::error!(
                        nodes = group.nodes.len(),
                        "parsing of simple nodes not supported, PBF should use dense nodes"
                    );
                    self.stats.node_groups_skipped += 1;
                    return Ok(());
                }
                for node in &group.nodes {
                    self.dispatch_point(decode_node(ctx, node)?);
                }
            }
            EntityKind::Ways => {
                for way in &group.ways {
                    self.dispatch_path(decode_way(ctx, way)?);
                }
            }
            EntityKind::Relations => {
                for relation in &group.relations {
                    match decode_relation(ctx, relation)? {
                        Some(candidate) => self.dispatch_restriction(candidate),
                        None => self.stats.relations_skipped += 1,
                    }
                }
            }
        }
        Ok(())
    }

    fn dispatch_point(&mut self, mut point: Point) {
        let id = point.id;
        if let Some(hook) = &self.hook {
            if let Err(source) = hook.process_point(&mut point) {
                self.report(EntityError::ScriptHookFailure {
                    kind: "point",
                    id,
                    source,
                });
                self.stats.hook_failures += 1;
                return;
            }
        }
        if self.aborted() {
            return;
        }
        if self.sink.notify_point(point) {
            self.stats.points += 1;
        } else {
            self.reject("point", id);
        }
    }

    fn dispatch_path(&mut self, mut path: Path) {
        let id = path.id;
        if let Some(hook) = &self.hook {
            let node_count = path.node_refs.len();
            if let Err(source) = hook.process_path(&mut path, node_count) {
                self.report(EntityError::ScriptHookFailure {
                    kind: "path",
                    id,
                    source,
                });
                self.stats.hook_failures += 1;
                return;
            }
        }
        if self.aborted() {
            return;
        }
        if self.sink.notify_path(path) {
            self.stats.paths += 1;
        } else {
            self.reject("path", id);
        }
    }

    fn dispatch_restriction(&mut self, candidate: RestrictionCandidate) {
        // Restrictions carry no id of their own; the from-way identifies them in logs.
        let from_way = candidate.from_way;
        if self.aborted() {
            return;
        }
        if self.sink.notify_restriction(candidate) {
            self.stats.restrictions += 1;
        } else {
            self.reject("restriction", from_way);
        }
    }

    fn reject(&mut self, kind: &'static str, id: i64) {
        self.report(EntityError::CallbackRejected { kind, id });
        self.stats.rejected_entities += 1;
    }

    fn report(&self, err: EntityError) {
        tracing::warn!(consumer = self.id, "{err}");
    }
}
