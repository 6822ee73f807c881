//! Built-in blog templates using the Tera template engine
//!
//! All templates are embedded directly in the binary.

use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::error::Result;
use crate::helpers::{html_escape, truncate};

/// Template renderer with the embedded blog theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Visitor-supplied text ends up in these pages
        tera.autoescape_on(vec![".html"]);
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("blog/layout.html")),
            ("index.html", include_str!("blog/index.html")),
            ("post.html", include_str!("blog/post.html")),
            ("not_found.html", include_str!("blog/not_found.html")),
            ("error.html", include_str!("blog/error.html")),
            // Partials
            (
                "partials/head.html",
                include_str!("blog/partials/head.html"),
            ),
            (
                "partials/header.html",
                include_str!("blog/partials/header.html"),
            ),
            (
                "partials/comment_form.html",
                include_str!("blog/partials/comment_form.html"),
            ),
            (
                "partials/comments.html",
                include_str!("blog/partials/comments.html"),
            ),
            (
                "partials/thanks.html",
                include_str!("blog/partials/thanks.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => Some(tera::try_get_value!(
            "truncate_chars",
            "omission",
            String,
            val
        )),
        None => None,
    };

    Ok(tera::Value::String(truncate(
        &s,
        length,
        omission.as_deref(),
    )))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub generator: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub id: String,
    pub title: String,
    pub description: String,
    pub path: String,
    pub cover_url: Option<String>,
    pub author_name: String,
    pub author_image_url: Option<String>,
    /// `<time>` element with the formatted creation date
    pub published: String,
    pub body_html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCardData {
    pub title: String,
    pub description: String,
    pub path: String,
    pub cover_url: Option<String>,
    pub author_name: String,
    pub author_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentData {
    pub name: String,
    pub comment: String,
}
