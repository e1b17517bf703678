//! `tracing` subscriber setup shared by simulation drivers and tests.
//!
//! Library crates in the workspace only emit events through `tracing` macros. Whatever runs them
//! decides where the events go by calling one of the functions below once per process.

use std::{
    env,
    io::{self, IsTerminal as _},
};

use anyhow::Result;
use tracing::debug;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt as _, reload, util::SubscriberInitExt as _,
    EnvFilter, Layer as _, Registry,
};

/// Directives in this variable are added on top of the defaults, e.g.
/// `BEACON_SIM_LOG=fork_choice_control=debug,ledger=trace`.
pub const LOG_ENV_VAR: &str = "BEACON_SIM_LOG";

const WORKSPACE_CRATES: &[&str] = &[
    "arithmetic",
    "execution_engine",
    "fork_choice_control",
    "fork_choice_store",
    "hashing",
    "helper_functions",
    "ledger",
    "transition_functions",
    "types",
];

pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Installs a compact stdout logger as the global default.
///
/// Only workspace crates and `module_path` log, at `info` and above, unless [`LOG_ENV_VAR`] says
/// otherwise. The returned handle can replace the filter while the process runs.
pub fn initialize_tracing_logger(module_path: &str, always_write_style: bool) -> Result<FilterHandle> {
    let mut filter = default_filter(module_path)?;

    if let Ok(directives) = env::var(LOG_ENV_VAR) {
        filter = add_directives(filter, &directives)?;
    }

    let filter_description = filter.to_string();
    let (filter_layer, handle) = reload::Layer::new(filter);

    let stdout_layer = fmt::layer::<Registry>()
        .compact()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(always_write_style || io::stdout().is_terminal());

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(filter_layer))
        .try_init()?;

    debug!("logger initialized with filter {filter_description}");

    Ok(handle)
}

/// Routes events through the test harness so that they are shown only for failing tests.
///
/// Safe to call from every test. Only the first call in a process has any effect.
pub fn initialize_test_logger() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("debug"));

    if let Err(error) = fmt().with_env_filter(filter).with_test_writer().try_init() {
        debug!("test logger not installed: {error}");
    }
}

/// `info` for every workspace crate and `module_path`. Everything else is off.
pub fn default_filter(module_path: &str) -> Result<EnvFilter> {
    WORKSPACE_CRATES
        .iter()
        .copied()
        .chain([module_path])
        .try_fold(
            EnvFilter::default().add_directive(LevelFilter::OFF.into()),
            |filter, target| Ok(filter.add_directive(format!("{target}=info").parse()?)),
        )
}

/// Adds comma-separated `directives` to `filter`. Later directives for the same target win.
pub fn add_directives(filter: EnvFilter, directives: &str) -> Result<EnvFilter> {
    directives
        .split(',')
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .try_fold(filter, |filter, directive| {
            Ok(filter.add_directive(directive.parse()?))
        })
}
