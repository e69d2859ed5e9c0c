//! # mql-engine: reactive execution of compiled MQL programs
//!
//! A compiler outside this crate turns MQL source into a flat [`Program`] of
//! chunks addressed by refs. This crate runs that program against bound
//! inputs and a live resource graph.
//!
//! ## Components
//!
//! ### 1. Program model
//! Immutable compiled programs ([`program`]) with chunks, nested block
//! functions, entrypoints, datapoints, checksums and assertions. Programs can
//! be loaded from JSON or assembled with [`program::builder::ProgramBuilder`].
//! [`program::labels`] derives human readable labels per checksum.
//!
//! ### 2. Builtin operator registry
//! [`registry::BuiltinRegistry`] maps bound type × operator × operand type to
//! a handler. It is built once and shared read-only through [`Runtime`].
//!
//! ### 3. Reactive evaluator
//! [`eval::Executor`] resolves refs, caches results, suspends on values that
//! are not known yet and re-runs dependents when they arrive. Resource
//! fields resolve through watches on a [`graph::ResourceGraph`].
//!
//! ### 4. Run orchestration
//! [`run`] drives executors: long-lived ([`run::run`]), until every callpoint
//! reported once ([`run::run_once`]), or blocking until then
//! ([`run::run_once_sync`], [`run::run_once_async`]).
//!
//! ```text
//! Program + props → Executor ─┬─ Registry (operators)
//!                             └─ ResourceGraph (fields, watches)
//!                  ↓
//!           RawResult stream → run drivers → caller
//! ```

pub mod config;
pub mod error;
pub mod eval;
pub mod graph;
pub mod program;
pub mod registry;
pub mod run;
pub mod runtime;
pub mod types;

// Re-exports
pub use config::EngineConfig;
pub use error::*;
pub use eval::{BlockOutcome, Executor};
pub use graph::{MemoryGraph, ResourceGraph, ResourceHandle, ResourceSchema};
pub use program::{Chunk, Primitive, Program, RawData, RawResult, Ref, Value};
pub use registry::BuiltinRegistry;
pub use run::{no_run, run, run_once, run_once_async, run_once_sync};
pub use runtime::Runtime;
pub use types::Type;
