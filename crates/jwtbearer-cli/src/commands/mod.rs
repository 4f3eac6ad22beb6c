pub mod check_config;
pub mod exchange;
pub mod inspect;

use anyhow::{Context, Result};

/// Resolves an assertion argument; `@path` reads it from a file.
pub fn read_assertion(arg: &str) -> Result<String> {
    let raw = match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read assertion from {path}"))?,
        None => arg.to_string(),
    };
    Ok(raw.trim().to_string())
}
