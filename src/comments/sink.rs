//! Where accepted comments are persisted

use async_trait::async_trait;
use serde_json::json;

use super::CommentInput;
use crate::error::Result;
use crate::source::SanityClient;

/// Persistence endpoint for new comments
#[async_trait]
pub trait CommentSink: Send + Sync {
    /// Store a comment. New comments are never approved on creation.
    async fn create_comment(&self, input: &CommentInput) -> Result<()>;
}

#[async_trait]
impl CommentSink for SanityClient {
    async fn create_comment(&self, input: &CommentInput) -> Result<()> {
        let document = json!({
            "_type": "comment",
            "post": {
                "_type": "reference",
                "_ref": input.post_id,
            },
            "name": input.name,
            "email": input.email,
            "comment": input.comment,
        });
        self.mutate(vec![json!({ "create": document })]).await
    }
}
