//! catalog-agent-cli library: env configuration and backend wiring for the catalog agent.
//!
//! Reads OpenAI and storage config from .env, wires chat, embeddings, catalog and checkpoint
//! store, sends one message on a thread and returns the reply.
//!
//! ## Usage
//!
//! ```rust,no_run,ignore
//! let out = catalog_agent_cli::run("Do you have an oak table?", &RunOptions::default()).await?;
//! println!("thread: {}", out.thread_id);
//! match out.reply {
//!     Ok(reply) => println!("{}", reply.text),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```

mod config;
mod logging;
mod run;

pub use catalog_agent::{AgentReply, UserFacingError};
pub use config::{Error, RunConfig, RunOptions};
pub use logging::{default_filter, init_tracing};
pub use run::{
    history, history_with_backends, load_catalog_file, run, run_with_backends, run_with_config,
    Backends, TurnOutput,
};

#[cfg(test)]
mod tests;
