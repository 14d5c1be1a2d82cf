//! Logger bootstrap.

pub use log::{LevelFilter, debug, error, info, trace, warn};

/// Initialize the global logger.
///
/// `RUST_LOG` still overrides `level`, so individual modules can be turned
/// up without recompiling. The GPU allocator logs every block it touches at
/// debug; that stays capped at warn.
pub fn initialize(level: LevelFilter) -> Result<(), anyhow::Error> {
    env_logger::builder()
        .filter_level(level)
        .filter_module("gpu_allocator", LevelFilter::Warn)
        .parse_default_env()
        .try_init()?;

    Ok(())
}
