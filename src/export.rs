use anyhow::{Context, Result};
use std::io::Write;
use tracing::debug;

use crate::state::StarStore;

/// Write every stored repository as a pretty-printed JSON array
pub fn export_json<S: StarStore, W: Write>(store: &S, mut writer: W) -> Result<usize> {
    let repos = store.all().context("Failed to read stored repositories")?;

    serde_json::to_writer_pretty(&mut writer, &repos).context("Failed to serialize repositories")?;
    writeln!(writer).context("Failed to write JSON export")?;
    writer.flush().context("Failed to write JSON export")?;

    debug!("Exported {} repositories", repos.len());
    Ok(repos.len())
}
