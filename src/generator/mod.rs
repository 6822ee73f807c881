//! Generator module - pre-builds every post page as static HTML

use anyhow::{Context as _, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::cache::{hash_content, BuildManifest, ChangeSet};
use crate::content::{load_post, static_paths, PageData};
use crate::helpers::{post_output_dir, post_output_path};
use crate::pages::{PageRenderer, PostView};
use crate::source::ContentSource;
use crate::Blog;

/// Pages of one build, rendered but not yet written
pub struct RenderedSite {
    pub posts: HashMap<String, String>,
    pub index: String,
    pub not_found: String,
}

/// Static site generator
pub struct Generator {
    blog: Blog,
    pages: PageRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            pages: PageRenderer::new(&blog.config)?,
        })
    }

    /// Render every page in memory. Any upstream failure aborts the whole
    /// build before a single file is touched.
    pub async fn render_all(&self, source: &dyn ContentSource) -> Result<RenderedSite> {
        let paths = static_paths(source)
            .await
            .context("Failed to enumerate post paths")?;
        tracing::info!("Found {} posts", paths.len());

        let mut posts = HashMap::with_capacity(paths.len());
        for params in paths {
            let data = load_post(source, &params.slug)
                .await
                .with_context(|| format!("Failed to load post {:?}", params.slug))?;

            match data {
                PageData::Found(post) => {
                    let html = self.pages.render_post(&post, &PostView::default())?;
                    posts.insert(params.slug, html);
                }
                PageData::NotFound => {
                    // Deleted between enumeration and loading
                    tracing::warn!("Post {:?} disappeared during the build", params.slug);
                }
            }
        }

        let summaries = source
            .post_summaries()
            .await
            .context("Failed to load the post listing")?;
        let index = self.pages.render_index(&summaries)?;
        let not_found = self.pages.render_not_found()?;

        Ok(RenderedSite {
            posts,
            index,
            not_found,
        })
    }

    /// Generate the site, writing only pages whose HTML changed since the
    /// last build (all of them when `force` is set). Pages of posts that
    /// no longer exist are removed either way.
    pub async fn generate(&self, source: &dyn ContentSource, force: bool) -> Result<ChangeSet> {
        let site = self.render_all(source).await?;
        let previous = BuildManifest::load(&self.blog.base_dir);

        let hashes: HashMap<String, u64> = site
            .posts
            .iter()
            .map(|(slug, html)| (slug.clone(), hash_content(html)))
            .collect();

        let mut changes = previous.diff(&hashes);
        let public_dir = &self.blog.public_dir;
        fs::create_dir_all(public_dir)?;

        // Forced builds and missing files are rewritten even when the manifest
        // says the page is current
        let (present, missing): (Vec<_>, Vec<_>) =
            changes.unchanged.drain(..).partition(|slug| {
                !force && post_output_path(public_dir, slug).is_some_and(|path| path.exists())
            });
        changes.unchanged = present;
        changes.changed.extend(missing);
        changes.changed.sort();

        for slug in &changes.changed {
            let Some(path) = post_output_path(public_dir, slug) else {
                anyhow::bail!("Refusing to write post with slug {:?}", slug);
            };
            write_page(&path, &site.posts[slug])?;
            tracing::debug!("Generated post: {}", slug);
        }

        for slug in &changes.deleted {
            let Some(dir) = post_output_dir(public_dir, slug) else {
                tracing::warn!("Not removing page for unusable slug {:?}", slug);
                continue;
            };
            if dir.exists() {
                fs::remove_dir_all(&dir)
                    .with_context(|| format!("Failed to remove {:?}", dir))?;
                tracing::debug!("Removed post: {}", slug);
            }
        }

        let index_hash = hash_content(&site.index);
        let index_path = public_dir.join("index.html");
        if force || index_hash != previous.index_hash || !index_path.exists() {
            write_page(&index_path, &site.index)?;
            tracing::info!("Generated index page");
        }
        write_page(&public_dir.join("404.html"), &site.not_found)?;

        let mut manifest = BuildManifest::new();
        manifest.pages = hashes;
        manifest.index_hash = index_hash;
        manifest.save(&self.blog.base_dir)?;

        Ok(changes)
    }
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, html).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    Ok(())
}
