#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod sink;
pub mod stats;

mod consumer;

pub use config::ParserConfig;
pub use error::{EntityError, HookError, PipelineError};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineState, SUPPORTED_FEATURES};
pub use sink::{EntitySink, NullSink, ScriptHook};
pub use stats::RunStats;
