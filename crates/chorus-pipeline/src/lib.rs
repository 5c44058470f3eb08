//! Chorus Synthesis Pipeline
//!
//! Orchestrates one conversation turn end to end: the prompt fan-out, the
//! mapping step that turns N provider answers into a claim artifact, and the
//! blast-radius-gated survey follow-up.
//!
//! # Architecture
//!
//! - `turn`: the step sequencer, generic over injected capabilities
//! - `mapper`: tolerant parsing of the mapper's structured output, plus the
//!   dispatcher-backed and scripted [`ClaimMapper`] implementations
//! - `summary`: the pre-semantic summary and its prompt rendering
//! - `config`: one TOML-loadable aggregate config for every stage
//! - `store`: the in-memory [`ContextStore`]
//!
//! [`ClaimMapper`]: chorus_domain::traits::ClaimMapper
//! [`ContextStore`]: chorus_domain::traits::ContextStore

#![warn(missing_docs)]

pub mod config;
pub mod mapper;
pub mod store;
pub mod summary;
pub mod turn;

pub use config::{ConfigError, PipelineConfig};
pub use mapper::{parse_mapper_output, DispatcherMapper, MapperOutput, ScriptedMapper};
pub use store::MemoryContextStore;
pub use summary::{build_summary, render_prompt};
pub use turn::{PipelineError, TurnOutcome, TurnPipeline};
