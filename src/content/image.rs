//! Image URL builder for content lake assets

use lazy_static::lazy_static;
use regex::Regex;

use super::post::ImageRef;
use crate::config::SanityConfig;
use crate::error::{Error, Result};

const CDN_BASE: &str = "https://cdn.sanity.io/images";

lazy_static! {
    /// `image-<id>-<width>x<height>-<format>`
    static ref ASSET_REF: Regex =
        Regex::new(r"^image-([A-Za-z0-9]+)-(\d+x\d+)-([a-z0-9]+)$").expect("valid asset regex");
}

/// Builds CDN URLs for image assets of one project/dataset
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl ImageUrlBuilder {
    pub fn new(config: &SanityConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            dataset: config.dataset.clone(),
        }
    }

    /// Resolve an image field to its full-size URL
    pub fn url(&self, image: &ImageRef) -> Result<String> {
        let asset = image
            .asset
            .as_ref()
            .ok_or_else(|| Error::InvalidImageRef(String::new()))?;

        if let Some(url) = &asset.url {
            return Ok(url.clone());
        }

        let reference = asset
            .reference
            .as_deref()
            .or(asset.id.as_deref())
            .unwrap_or_default();
        self.url_for_ref(reference)
    }

    /// Resolve an image field, asking the CDN for a resized variant
    pub fn url_with_width(&self, image: &ImageRef, width: u32) -> Result<String> {
        let url = self.url(image)?;
        let sep = if url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}w={}", url, sep, width))
    }

    /// Resolve a raw asset reference
    pub fn url_for_ref(&self, reference: &str) -> Result<String> {
        let caps = ASSET_REF
            .captures(reference)
            .ok_or_else(|| Error::InvalidImageRef(reference.to_string()))?;

        Ok(format!(
            "{}/{}/{}/{}-{}.{}",
            CDN_BASE, self.project_id, self.dataset, &caps[1], &caps[2], &caps[3]
        ))
    }
}
