use pbf_decoder::DecodeError;

use crate::pipeline::PipelineState;

/// Errors that stop a pipeline from starting or completing.
///
/// ```text
/// ┌────────────────────┬─────────────────────────────────────────────────┐
/// │ Variant            │ Cause                                           │
/// ├────────────────────┼─────────────────────────────────────────────────┤
/// │ UnsupportedFeature │ Header requires a feature this reader lacks     │
/// │ Decode             │ Header frame unreadable, or fatal block error   │
/// │ InvalidState       │ Operation called in the wrong lifecycle state   │
/// │ TaskFailed         │ A producer or consumer task panicked            │
/// └────────────────────┴─────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("required feature not supported: {feature}")]
    UnsupportedFeature { feature: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    #[error("{stage} task failed: {reason}")]
    TaskFailed {
        stage: &'static str,
        reason: String,
    },
}

/// Failure reported by a [`ScriptHook`](crate::ScriptHook).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Per-entity failures. They are logged and counted, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    /// The hook failed; the sink was not called for this entity.
    #[error("script hook failed on {kind} {id}: {source}")]
    ScriptHookFailure {
        kind: &'static str,
        id: i64,
        source: HookError,
    },

    /// The sink returned `false`.
    #[error("{kind} {id} not accepted by sink")]
    CallbackRejected { kind: &'static str, id: i64 },
}
