//! Page data loading - which pages exist and what goes on each one

use serde::Serialize;

use super::Post;
use crate::error::Result;
use crate::helpers::is_safe_slug;
use crate::source::ContentSource;

/// Route parameters of one pre-built page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathParams {
    pub slug: String,
}

/// Result of loading the data for a post page
#[derive(Debug, Clone)]
pub enum PageData {
    Found(Box<Post>),
    NotFound,
}

/// List the route parameters of every post so its page can be pre-built.
///
/// Posts without a slug cannot be routed to and are skipped, as are slugs
/// that would escape the output directory. Any upstream
/// failure is returned as is; callers treat it as fatal for the build.
pub async fn static_paths(source: &dyn ContentSource) -> Result<Vec<PathParams>> {
    let slugs = source.post_slugs().await?;

    let mut paths = Vec::with_capacity(slugs.len());
    for slug in slugs {
        if slug.is_empty() {
            tracing::warn!("Skipping post without a slug");
            continue;
        }
        if !is_safe_slug(&slug.current) {
            tracing::warn!("Skipping post with unusable slug {:?}", slug.current);
            continue;
        }
        let params = PathParams {
            slug: slug.current,
        };
        if !paths.contains(&params) {
            paths.push(params);
        }
    }

    tracing::debug!("Enumerated {} post paths", paths.len());
    Ok(paths)
}

/// Fetch one post with its approved comments.
///
/// An empty slug or a slug with no matching document yields
/// [`PageData::NotFound`]; only upstream failures are errors.
pub async fn load_post(source: &dyn ContentSource, slug: &str) -> Result<PageData> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Ok(PageData::NotFound);
    }

    match source.post_by_slug(slug).await? {
        Some(mut post) => {
            post.retain_approved();
            Ok(PageData::Found(Box::new(post)))
        }
        None => {
            tracing::debug!("No post for slug {:?}", slug);
            Ok(PageData::NotFound)
        }
    }
}
