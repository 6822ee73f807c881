//! CLI entry point for sanity-blog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sanity-blog")]
#[command(author = "Yukang Chen")]
#[command(version = "0.1.0")]
#[command(about = "A blog frontend for a Sanity content lake", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate static pages for every post
    #[command(alias = "g")]
    Generate {
        /// Rewrite every page, ignoring the build manifest
        #[arg(short, long)]
        force: bool,

        /// Read posts from a JSON export instead of the content lake
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Serve pages with periodic regeneration and comment submission
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Read posts from a JSON export instead of the content lake
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Clean the public folder and build manifest
    Clean,

    /// List site information
    List {
        /// Type of content to list (post, route)
        #[arg(default_value = "post")]
        r#type: String,

        /// Read posts from a JSON export instead of the content lake
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "sanity_blog=debug,info"
    } else {
        "sanity_blog=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Generate { force, source } => {
            let blog = sanity_blog::Blog::new(&base_dir)?;
            let source = blog.content_source(source.as_deref())?;
            tracing::info!("Generating static files...");

            sanity_blog::commands::generate::run(&blog, source.as_ref(), force)
                .await?;
            println!("Generated successfully!");
        }

        Commands::Server { port, ip, source } => {
            let blog = sanity_blog::Blog::new(&base_dir)?;
            let source = blog.content_source(source.as_deref())?;
            let sink = blog.sanity_client()?;

            tracing::info!("Starting server at http://{}:{}", ip, port);
            sanity_blog::server::start(&blog, &ip, port, source, sink).await?;
        }

        Commands::Clean => {
            let blog = sanity_blog::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { r#type, source } => {
            let blog = sanity_blog::Blog::new(&base_dir)?;
            let source = blog.content_source(source.as_deref())?;
            sanity_blog::commands::list::run(source.as_ref(), &r#type).await?;
        }

        Commands::Version => {
            println!("sanity-blog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
