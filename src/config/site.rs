//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Error;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub url: String,

    // Directory
    pub public_dir: String,

    // Date / Time format (strftime) and the zone the byline is shown in
    pub date_format: String,
    pub timezone: String,

    /// Seconds a rendered page is served before it is regenerated
    pub revalidate_secs: u64,

    // Content lake
    #[serde(default)]
    pub sanity: SanityConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Medium Blog".to_string(),
            description: "Stay curious.".to_string(),
            url: "http://localhost:4000".to_string(),

            public_dir: "public".to_string(),

            date_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
            timezone: "UTC".to_string(),

            revalidate_secs: 60,

            sanity: SanityConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `SANITY_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(project_id) = lookup("SANITY_PROJECT_ID") {
            self.sanity.project_id = project_id;
        }
        if let Some(dataset) = lookup("SANITY_DATASET") {
            self.sanity.dataset = dataset;
        }
        if let Some(api_version) = lookup("SANITY_API_VERSION") {
            self.sanity.api_version = api_version;
        }
        if let Some(token) = lookup("SANITY_API_TOKEN") {
            if !token.is_empty() {
                self.sanity.token = Some(token);
            }
        }
        if let Some(tz) = lookup("BLOG_TIMEZONE") {
            self.timezone = tz;
        }
    }

    /// Resolve the configured display timezone
    pub fn tz(&self) -> crate::error::Result<chrono_tz::Tz> {
        self.timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| Error::Config(format!("unknown timezone `{}`", self.timezone)))
    }

    /// Check the settings the content source cannot work without
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.sanity.project_id.trim().is_empty() {
            return Err(Error::Config(
                "sanity.project_id is not set (or SANITY_PROJECT_ID)".to_string(),
            ));
        }
        if self.sanity.dataset.trim().is_empty() {
            return Err(Error::Config("sanity.dataset is empty".to_string()));
        }
        self.tz()?;
        Ok(())
    }
}

/// Sanity project settings shared by the query client, the mutation
/// client and the image URL builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    /// Read from the edge cache instead of the live API
    pub use_cdn: bool,
    /// Write token, needed only for comment creation
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub request_timeout_secs: u64,
    /// Override of the API host, e.g. a local mock
    pub api_host: Option<String>,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: "production".to_string(),
            api_version: "2021-10-21".to_string(),
            use_cdn: true,
            token: None,
            request_timeout_secs: 30,
            api_host: None,
        }
    }
}

impl SanityConfig {
    /// Base URL for reads (`/data/query`)
    pub fn query_base(&self) -> String {
        if let Some(host) = &self.api_host {
            return format!("{}/v{}", host.trim_end_matches('/'), self.api_version);
        }
        let domain = if self.use_cdn { "apicdn" } else { "api" };
        format!(
            "https://{}.{}.sanity.io/v{}",
            self.project_id, domain, self.api_version
        )
    }

    /// Base URL for writes (`/data/mutate`), never the CDN
    pub fn mutate_base(&self) -> String {
        if let Some(host) = &self.api_host {
            return format!("{}/v{}", host.trim_end_matches('/'), self.api_version);
        }
        format!(
            "https://{}.api.sanity.io/v{}",
            self.project_id, self.api_version
        )
    }
}
