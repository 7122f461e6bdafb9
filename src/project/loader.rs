//! Disk surfaces for the pipeline: scanning a directory of Terraform
//! documents for ingestion, and writing generated artifacts. Both are
//! IO-bound and run on the async runtime; parsing and generation stay
//! synchronous.

use crate::shared::logging;
use crate::terraform::generator::GeneratedArtifacts;
use std::path::{Path, PathBuf};

/// Read every `*.tf` file under the directory, sorted by file name so
/// ingestion order is deterministic.
pub async fn scan_directory(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read directory {}: {}", dir.display(), e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| anyhow::anyhow!("failed to list {}: {}", dir.display(), e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("tf") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
        logging::debug(&format!("loaded {}", path.display()));
        documents.push(content);
    }
    Ok(documents)
}

/// Write every generated artifact into the output directory. Artifacts are
/// fully rendered before this is called, so a failure here never leaves a
/// half-rendered file behind.
pub async fn write_artifacts(dir: &Path, artifacts: &GeneratedArtifacts) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create {}: {}", dir.display(), e))?;
    for file in &artifacts.files {
        let path = dir.join(&file.name);
        tokio::fs::write(&path, &file.content)
            .await
            .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
        logging::info(&format!("wrote {}", path.display()));
    }
    Ok(())
}
