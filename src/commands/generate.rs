//! Generate static files

use anyhow::Result;

use crate::generator::Generator;
use crate::source::ContentSource;
use crate::Blog;

/// Generate the static site, rewriting every page when `force` is set
pub async fn run(blog: &Blog, source: &dyn ContentSource, force: bool) -> Result<()> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog)?;
    let changes = generator.generate(source, force).await?;

    tracing::info!("Changes: {}", changes.summary());
    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}
