//! HTTP client for the Sanity query and mutation APIs

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::ContentSource;
use crate::config::SanityConfig;
use crate::content::{Post, PostSummary, Slug};
use crate::error::{Error, Result};

/// Every post id and slug
const SLUGS_QUERY: &str = r#"*[_type == "post"] {
  _id,
  slug {
    current
  }
}"#;

/// One post by slug, with the author expanded and approved comments joined
const POST_QUERY: &str = r#"*[_type == "post" && slug.current == $slug][0] {
  _id,
  _createdAt,
  title,
  author-> {
    name,
    image
  },
  'comments': *[
    _type == "comment" &&
    post._ref == ^._id &&
    approved == true
  ],
  description,
  mainImage,
  slug,
  body
}"#;

/// Home page listing
const SUMMARIES_QUERY: &str = r#"*[_type == "post"] | order(_createdAt desc) {
  _id,
  title,
  author-> {
    name,
    image
  },
  description,
  mainImage,
  slug
}"#;

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct SlugRow {
    #[serde(default)]
    slug: Option<Slug>,
}

/// Client for one project/dataset
#[derive(Clone)]
pub struct SanityClient {
    http: Client,
    query_base: String,
    mutate_base: String,
    dataset: String,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(config: &SanityConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            query_base: config.query_base(),
            mutate_base: config.mutate_base(),
            dataset: config.dataset.clone(),
            token: config.token.clone(),
        })
    }

    /// Run a GROQ query. Parameters are sent JSON-encoded as `$name`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &str,
        params: &[(&str, Value)],
    ) -> Result<T> {
        let url = format!("{}/data/query/{}", self.query_base, self.dataset);

        let mut pairs = vec![("query".to_string(), query.to_string())];
        for (name, value) in params {
            pairs.push((format!("${}", name), value.to_string()));
        }

        tracing::debug!("GROQ query against {}", url);

        let mut request = self.http.get(&url).query(&pairs);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }

        let bytes = response.bytes().await?;
        let parsed: QueryResponse<T> = serde_json::from_slice(&bytes)?;
        Ok(parsed.result)
    }

    /// Submit a mutation batch (`{ "mutations": [...] }`)
    pub async fn mutate(&self, mutations: Vec<Value>) -> Result<()> {
        let url = format!("{}/data/mutate/{}", self.mutate_base, self.dataset);

        let mut request = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "mutations": mutations }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl ContentSource for SanityClient {
    async fn post_slugs(&self) -> Result<Vec<Slug>> {
        let rows: Vec<SlugRow> = self.fetch(SLUGS_QUERY, &[]).await?;
        Ok(rows.into_iter().map(|r| r.slug.unwrap_or_default()).collect())
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        self.fetch(POST_QUERY, &[("slug", Value::String(slug.to_string()))])
            .await
    }

    async fn post_summaries(&self) -> Result<Vec<PostSummary>> {
        self.fetch(SUMMARIES_QUERY, &[]).await
    }
}
