//! sanity-blog: a blog frontend for a Sanity content lake
//!
//! Posts, authors and approved comments are fetched from the content lake,
//! rendered with embedded Tera templates, and either written out as static
//! pages or served with periodic regeneration. Visitors can submit comments,
//! which are stored unapproved until an editor approves them.

pub mod cache;
pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pages;
pub mod server;
pub mod source;
pub mod templates;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use source::{ContentSource, MemorySource, SanityClient};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory, reading `_config.yml`
    /// when present and applying environment overrides
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);
        Self {
            config,
            base_dir,
            public_dir,
        }
    }

    /// Client for the configured content lake
    pub fn sanity_client(&self) -> Result<Arc<SanityClient>> {
        self.config.validate()?;
        Ok(Arc::new(SanityClient::new(&self.config.sanity)?))
    }

    /// Content source: the content lake, or a local JSON export of posts
    pub fn content_source(&self, export: Option<&Path>) -> Result<Arc<dyn ContentSource>> {
        match export {
            Some(path) => {
                let json = std::fs::read_to_string(path)?;
                tracing::info!("Reading posts from {:?}", path);
                Ok(Arc::new(MemorySource::from_json(&json)?))
            }
            None => Ok(self.sanity_client()?),
        }
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
