//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::cache::BuildManifest;
use crate::Blog;

/// Clean the public directory and the build manifest
pub fn run(blog: &Blog) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    }

    BuildManifest::clear(&blog.base_dir)?;

    Ok(())
}
