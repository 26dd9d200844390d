//! Run entry points: [`run`] (env + overrides), [`run_with_config`], [`run_with_backends`],
//! and [`history`].
//!
//! A run sends one message on one thread and returns a [`TurnOutput`]. Config, storage and
//! catalog-loading problems are returned as [`Error`]; agent failures are already mapped to a
//! [`UserFacingError`] inside the output.

pub use crate::config::Error;

mod backends;
mod catalog_file;

use catalog_agent::{AgentReply, AgentRunner, UserFacingError};
use tracing::{info, warn};

use crate::config::{RunConfig, RunOptions};

pub use backends::Backends;
pub use catalog_file::load_catalog_file;

/// Result of sending one message.
#[derive(Debug)]
pub struct TurnOutput {
    /// Thread the message went to (given or freshly assigned).
    pub thread_id: String,
    pub reply: Result<AgentReply, UserFacingError>,
}

/// Loads `.env`, builds `RunConfig` from env, applies `options`, then runs.
pub async fn run(message: &str, options: &RunOptions) -> Result<TurnOutput, Error> {
    let config = load_config(options)?;
    run_with_config(&config, message).await
}

/// Runs with the real backends described by `config`; does not read .env.
pub async fn run_with_config(config: &RunConfig, message: &str) -> Result<TurnOutput, Error> {
    let backends = Backends::from_config(config)?;
    run_with_backends(config, backends, message).await
}

/// Runs with injected backends (mocks in tests). Loads `config.catalog_json` first when set.
pub async fn run_with_backends(
    config: &RunConfig,
    backends: Backends,
    message: &str,
) -> Result<TurnOutput, Error> {
    if let Some(path) = &config.catalog_json {
        let loaded =
            load_catalog_file(path, backends.embedder.as_ref(), backends.catalog.as_ref()).await?;
        info!(path = %path.display(), items = loaded, "Loaded catalog file");
    }
    let runner = backends.into_runner(config);
    let thread_id = config
        .thread_id
        .clone()
        .unwrap_or_else(AgentRunner::new_thread_id);

    let reply = match runner.handle(&thread_id, message).await {
        Ok(reply) => {
            for e in &reply.persistence_errors {
                warn!(thread_id = %thread_id, error = %e, "Conversation may not resume fully");
            }
            Ok(reply)
        }
        Err(e) => {
            warn!(thread_id = %thread_id, error = %e, "Agent run failed");
            Err(UserFacingError::from(&e))
        }
    };
    Ok(TurnOutput { thread_id, reply })
}

/// Checkpoint history lines for the configured thread, newest first:
/// `<checkpoint_id> step=<n> source=<source> created=<rfc3339>`.
pub async fn history(options: &RunOptions) -> Result<Vec<String>, Error> {
    let config = load_config(options)?;
    let backends = Backends::from_config(&config)?;
    history_with_backends(&config, backends).await
}

/// [`history`] with injected backends.
pub async fn history_with_backends(
    config: &RunConfig,
    backends: Backends,
) -> Result<Vec<String>, Error> {
    let thread_id = config
        .thread_id
        .as_deref()
        .ok_or("--history needs a thread id (-t/--thread-id)")?;
    let runner = backends.into_runner(config);
    let items = runner.history(thread_id, None).await?;
    Ok(items
        .into_iter()
        .map(|item| {
            format!(
                "{} step={} source={} created={}",
                item.checkpoint_id,
                item.metadata.step,
                item.metadata.source.as_str(),
                item.metadata
                    .created_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string()),
            )
        })
        .collect())
}

fn load_config(options: &RunOptions) -> Result<RunConfig, Error> {
    dotenv::dotenv().ok();
    let mut config = RunConfig::from_env()?;
    config.apply_options(options);
    Ok(config)
}
