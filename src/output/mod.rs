pub mod markdown;

#[cfg(test)]
#[path = "markdown.test.rs"]
mod markdown_test;

pub use markdown::{render_code_generation_markdown, render_source_block};

use anyhow::{Context, Result};
use std::path::Path;

/// Save a rendered document, creating parent directories as needed.
pub async fn write_markdown(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
