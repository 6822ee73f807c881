//! Post, Author and Comment documents as the content lake returns them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::portable_text::Block;

/// A blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Document id
    #[serde(rename = "_id")]
    pub id: String,

    /// Creation timestamp
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,

    /// Post title
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,

    /// Short description shown under the title
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    /// Cover image
    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,

    /// Slug (URL-friendly name)
    #[serde(default, deserialize_with = "nullable")]
    pub slug: Slug,

    /// Rich-text body
    #[serde(default, deserialize_with = "nullable")]
    pub body: Vec<Block>,

    /// Expanded author reference
    #[serde(default, deserialize_with = "nullable")]
    pub author: Author,

    /// Comments attached at query time
    #[serde(default, deserialize_with = "nullable")]
    pub comments: Vec<Comment>,
}

impl Post {
    /// Comments that may be shown publicly
    pub fn approved_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| c.approved)
    }

    /// Drop every comment that has not been approved
    pub fn retain_approved(&mut self) {
        self.comments.retain(|c| c.approved);
    }
}

/// Slug object (`{ "current": "my-post" }`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    #[serde(default, deserialize_with = "nullable")]
    pub current: String,
}

impl Slug {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: current.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.trim().is_empty()
    }
}

/// Post author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(default)]
    pub image: Option<ImageRef>,
}

impl Default for Author {
    fn default() -> Self {
        Self {
            name: "Anonymous".to_string(),
            image: None,
        }
    }
}

/// A visitor comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id", default)]
    pub id: String,

    #[serde(rename = "_createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Reference to the post this comment belongs to
    #[serde(default)]
    pub post: Option<Reference>,

    #[serde(default, deserialize_with = "nullable")]
    pub name: String,

    #[serde(default, deserialize_with = "nullable")]
    pub email: String,

    #[serde(default, deserialize_with = "nullable")]
    pub comment: String,

    /// Set by an editor; absent means not approved
    #[serde(default, deserialize_with = "nullable")]
    pub approved: bool,
}

/// Document reference (`{ "_ref": "..." }`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref")]
    pub reference: String,

    #[serde(rename = "_type", default = "reference_type")]
    pub kind: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            reference: id.into(),
            kind: reference_type(),
        }
    }
}

fn reference_type() -> String {
    "reference".to_string()
}

/// Image field, either referencing an asset or carrying an expanded one
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<ImageAsset>,

    #[serde(default)]
    pub alt: Option<String>,
}

impl ImageRef {
    /// Image pointing at an asset id such as `image-abc-800x600-jpg`
    pub fn from_ref(asset_ref: impl Into<String>) -> Self {
        Self {
            asset: Some(ImageAsset {
                reference: Some(asset_ref.into()),
                ..Default::default()
            }),
            alt: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(rename = "_ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Post fields shown on the home page listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSummary {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default, deserialize_with = "nullable")]
    pub title: String,

    #[serde(default, deserialize_with = "nullable")]
    pub description: String,

    #[serde(default, deserialize_with = "nullable")]
    pub slug: Slug,

    #[serde(rename = "mainImage", default)]
    pub main_image: Option<ImageRef>,

    #[serde(default, deserialize_with = "nullable")]
    pub author: Author,
}

/// GROQ projections yield `null` for missing attributes
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_post() {
        let doc = json!({
            "_id": "post-1",
            "_createdAt": "2022-03-01T12:30:00Z",
            "title": "Hello",
            "description": null,
            "author": { "name": "Ada", "image": { "asset": { "_ref": "image-a1-10x10-png" } } },
            "mainImage": { "_type": "image", "asset": { "_ref": "image-b2-800x600-jpg", "_type": "reference" } },
            "slug": { "_type": "slug", "current": "hello" },
            "comments": [
                { "_id": "c1", "name": "Jo", "email": "jo@x.com", "comment": "hi", "approved": true,
                  "post": { "_ref": "post-1", "_type": "reference" } },
                { "_id": "c2", "name": "Al", "email": "al@x.com", "comment": "spam" }
            ],
            "body": []
        });

        let post: Post = serde_json::from_value(doc).unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.description, "");
        assert_eq!(post.author.name, "Ada");
        assert_eq!(post.slug.current, "hello");
        assert_eq!(post.comments.len(), 2);
        assert!(!post.comments[1].approved);
        assert_eq!(post.approved_comments().count(), 1);
        assert_eq!(
            post.comments[0].post,
            Some(Reference::to("post-1"))
        );
    }

    #[test]
    fn test_null_author_and_comments() {
        let doc = json!({
            "_id": "post-2",
            "_createdAt": "2022-03-01T12:30:00Z",
            "author": null,
            "comments": null,
            "slug": { "current": "two" }
        });

        let mut post: Post = serde_json::from_value(doc).unwrap();
        assert_eq!(post.author.name, "Anonymous");
        assert!(post.comments.is_empty());
        assert!(post.main_image.is_none());
        post.retain_approved();
        assert!(post.comments.is_empty());
    }

    #[test]
    fn test_slug_is_empty() {
        assert!(Slug::new("  ").is_empty());
        assert!(!Slug::new("a").is_empty());
    }
}
