//! Dockerfile export.

use std::path::{Path, PathBuf};
use tracing::info;
use ursa_core::{ImageSet, Result};

/// Write the layered Dockerfile of every image in `set` into `directory`
/// as `{repository}.{tag}.dockerfile`, creating the directory if needed.
pub async fn write_dockerfiles(set: &ImageSet<'_>, directory: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(directory).await?;

    let mut written = Vec::with_capacity(set.len());
    for image in set.iter() {
        let resolved = set.collection().resolve(image.id())?;
        let tag = image.tag().unwrap_or("latest");
        let path = directory.join(format!("{}.{}.dockerfile", image.repository(), tag));

        tokio::fs::write(&path, resolved.dockerfile().to_string()).await?;
        written.push(path);
    }

    info!(
        count = written.len(),
        directory = %directory.display(),
        "Wrote Dockerfiles"
    );
    Ok(written)
}
