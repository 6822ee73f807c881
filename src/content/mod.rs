//! Content module - documents, rich text, images, and page data loading

mod image;
pub mod loader;
pub mod portable_text;
mod post;

pub use image::ImageUrlBuilder;
pub use loader::{load_post, static_paths, PageData, PathParams};
pub use portable_text::{Block, PortableTextRenderer};
pub use post::{Author, Comment, ImageAsset, ImageRef, Post, PostSummary, Reference, Slug};
