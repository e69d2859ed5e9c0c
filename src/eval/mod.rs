//! Reactive evaluation of programs.
//!
//! An [`Executor`] resolves refs on demand, caches every result and re-runs
//! the refs that read a value whenever it changes. Resource fields resolve
//! asynchronously through watches on the runtime's resource graph.

mod block;
mod bridge;
mod executor;

pub use block::BlockOutcome;
pub use executor::Executor;
