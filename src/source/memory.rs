//! In-memory content source, used for offline builds and tests

use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use super::ContentSource;
use crate::content::{Post, PostSummary, Slug};
use crate::error::{Error, Result};

/// Holds posts in memory. Can be switched to "unreachable" to exercise
/// upstream failures.
#[derive(Default)]
pub struct MemorySource {
    posts: RwLock<Vec<Post>>,
    unavailable: AtomicBool,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: RwLock::new(posts),
            ..Default::default()
        }
    }

    /// Load posts from a JSON array of post documents
    pub fn from_json(json: &str) -> Result<Self> {
        let posts: Vec<Post> = serde_json::from_str(json)?;
        Ok(Self::new(posts))
    }

    /// Add or replace a post (matched by id)
    pub fn upsert(&self, post: Post) {
        let mut posts = self.posts.write().unwrap_or_else(|e| e.into_inner());
        match posts.iter_mut().find(|p| p.id == post.id) {
            Some(existing) => *existing = post,
            None => posts.push(post),
        }
    }

    /// Remove the post with this slug
    pub fn remove(&self, slug: &str) {
        let mut posts = self.posts.write().unwrap_or_else(|e| e.into_inner());
        posts.retain(|p| p.slug.current != slug);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of queries answered or refused so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "content source unavailable",
            )));
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<Post> {
        self.posts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn post_slugs(&self) -> Result<Vec<Slug>> {
        self.begin()?;
        Ok(self.snapshot().into_iter().map(|p| p.slug).collect())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.begin()?;
        Ok(self
            .snapshot()
            .into_iter()
            .find(|p| p.slug.current == slug))
    }

    async fn post_summaries(&self) -> Result<Vec<PostSummary>> {
        self.begin()?;
        let mut posts = self.snapshot();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts
            .into_iter()
            .map(|p| PostSummary {
                id: p.id,
                title: p.title,
                description: p.description,
                slug: p.slug,
                main_image: p.main_image,
                author: p.author,
            })
            .collect())
    }
}
