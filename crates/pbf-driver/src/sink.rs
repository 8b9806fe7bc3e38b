use pbf_types::{Path, Point, RestrictionCandidate};

use crate::error::HookError;

/// Receiver for decoded entities.
///
/// Called from consumer contexts, possibly several at once, hence
/// `Send + Sync`. Returning `false` reports the entity as not accepted;
/// the pipeline logs it and carries on.
pub trait EntitySink: Send + Sync {
    fn notify_point(&self, point: Point) -> bool;

    fn notify_path(&self, path: Path) -> bool;

    fn notify_restriction(&self, restriction: RestrictionCandidate) -> bool;
}

/// Per-entity hook run before the sink sees a point or path.
///
/// The hook may rewrite the entity in place. An error skips the sink call
/// for that entity only.
pub trait ScriptHook: Send + Sync {
    /// # Errors
    ///
    /// Any failure inside the hook.
    fn process_point(&self, point: &mut Point) -> Result<(), HookError>;

    /// `node_count` is the number of node refs in the path.
    ///
    /// # Errors
    ///
    /// Any failure inside the hook.
    fn process_path(&self, path: &mut Path, node_count: usize) -> Result<(), HookError>;
}

/// Sink that accepts and drops everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EntitySink for NullSink {
    fn notify_point(&self, _point: Point) -> bool {
        true
    }

    fn notify_path(&self, _path: Path) -> bool {
        true
    }

    fn notify_restriction(&self, _restriction: RestrictionCandidate) -> bool {
        true
    }
}
