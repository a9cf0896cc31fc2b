// Artifact copies for easy host access

use crate::error::ToolchainError;
use std::path::{Path, PathBuf};

/// Copy a produced file into the artifacts directory, creating the
/// directory on first use. Returns the copy's path.
pub async fn copy_to_artifacts(
    artifacts_dir: &Path,
    artifact: &Path,
) -> Result<PathBuf, ToolchainError> {
    let file_name = artifact.file_name().ok_or_else(|| {
        ToolchainError::Input(format!(
            "artifact path has no file name: {}",
            artifact.display()
        ))
    })?;

    tokio::fs::create_dir_all(artifacts_dir).await.map_err(|e| {
        ToolchainError::Execution(format!(
            "failed to create artifacts directory {}: {}",
            artifacts_dir.display(),
            e
        ))
    })?;

    let dest = artifacts_dir.join(file_name);
    tokio::fs::copy(artifact, &dest).await.map_err(|e| {
        ToolchainError::Execution(format!(
            "failed to copy {} to {}: {}",
            artifact.display(),
            dest.display(),
            e
        ))
    })?;

    Ok(dest)
}
