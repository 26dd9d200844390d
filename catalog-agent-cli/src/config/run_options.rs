//! Optional overrides for a run (CLI args or programmatic).
//!
//! Used by [`RunConfig::apply_options`](super::RunConfig::apply_options) and
//! [`run`](crate::run). Callers build a `RunOptions` and get env-based config with the
//! overrides applied.

use std::path::PathBuf;

/// Optional overrides: thread, catalog file, database paths, temperature, verbosity.
///
/// All fields are optional; only set fields override the base config (from env).
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Thread to continue. When unset a fresh time-derived id is used.
    pub thread_id: Option<String>,
    /// JSON file with catalog items to load (and embed) before running.
    pub catalog_json: Option<PathBuf>,
    /// Override checkpoint database path.
    pub db_path: Option<String>,
    /// Override catalog database path.
    pub catalog_db_path: Option<String>,
    /// Override sampling temperature (0–2).
    pub temperature: Option<f32>,
    /// Debug logging.
    pub verbose: bool,
}
