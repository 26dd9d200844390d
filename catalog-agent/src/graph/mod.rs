//! Workflow graph: the generate / execute-tools state machine.
//!
//! - [`Phase`] and [`next_phase`]: explicit states and the transition function.
//! - [`Node`]: one step returning messages to append.
//! - [`Workflow`]: the interpreter loop with checkpointing, cancellation and streaming.
//! - [`RunContext`]: per-run options.

mod logging;
mod node;
mod phase;
mod run_context;
mod workflow;

pub use node::Node;
pub use phase::{next_phase, Phase};
pub use run_context::RunContext;
pub use workflow::{RunOutcome, Workflow, DEFAULT_RECURSION_LIMIT};
