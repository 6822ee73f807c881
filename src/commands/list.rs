//! List site content

use anyhow::Result;

use crate::content::static_paths;
use crate::helpers::post_path;
use crate::source::ContentSource;

/// List site content by type
pub async fn run(source: &dyn ContentSource, content_type: &str) -> Result<()> {
    match content_type {
        "post" | "posts" => {
            let posts = source.post_summaries().await?;
            println!("Posts ({}):", posts.len());
            for post in posts {
                println!(
                    "  {} - {} [{}]",
                    post.title, post.author.name, post.slug.current
                );
            }
        }
        "route" | "routes" => {
            let paths = static_paths(source).await?;
            println!("Routes ({}):", paths.len() + 1);
            println!("  /");
            for params in paths {
                println!("  {}", post_path(&params.slug));
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, route", content_type);
        }
    }

    Ok(())
}
