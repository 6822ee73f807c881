//! Content sources - where posts, authors and comments come from

mod memory;
mod sanity;

pub use memory::MemorySource;
pub use sanity::SanityClient;

use async_trait::async_trait;

use crate::content::{Post, PostSummary, Slug};
use crate::error::Result;

/// Read access to the document store
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Slugs of every post document
    async fn post_slugs(&self) -> Result<Vec<Slug>>;

    /// The post with this slug, its author expanded and its comments attached
    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>>;

    /// Every post, for the home page listing
    async fn post_summaries(&self) -> Result<Vec<PostSummary>>;
}
