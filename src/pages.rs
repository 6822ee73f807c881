//! Page rendering - turns loaded documents into complete HTML documents

use chrono_tz::Tz;
use tera::Context;

use crate::comments::{CommentForm, CommentInput, FieldErrors};
use crate::config::SiteConfig;
use crate::content::{ImageRef, ImageUrlBuilder, PortableTextRenderer, Post, PostSummary};
use crate::error::Result;
use crate::helpers::{full_url_for, is_safe_slug, meta_generator, post_path, time_tag};
use crate::templates::{CommentData, PostCardData, PostData, SiteData, TemplateRenderer};

/// Width requested for author avatars
const AVATAR_WIDTH: u32 = 80;

/// Comment-form state a post page is rendered with
#[derive(Debug, Clone, Default)]
pub struct PostView {
    /// A submission succeeded in this session; show the acknowledgment
    pub submitted: bool,
    /// Fields that were missing on the last attempt
    pub errors: FieldErrors,
    /// Values to re-fill the form with
    pub input: CommentInput,
}

impl PostView {
    /// View after a submit attempt
    pub fn after_submit(form: &CommentForm, input: CommentInput) -> Self {
        Self {
            submitted: form.is_submitted(),
            errors: form.errors(),
            input,
        }
    }
}

/// Renders post, home, 404 and error pages
pub struct PageRenderer {
    templates: TemplateRenderer,
    text: PortableTextRenderer,
    images: ImageUrlBuilder,
    site: SiteData,
    config: SiteConfig,
    tz: Tz,
}

impl PageRenderer {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let images = ImageUrlBuilder::new(&config.sanity);
        Ok(Self {
            templates: TemplateRenderer::new()?,
            text: PortableTextRenderer::new(images.clone()),
            images,
            site: SiteData {
                title: config.title.clone(),
                description: config.description.clone(),
                generator: meta_generator(),
            },
            config: config.clone(),
            tz: config.tz()?,
        })
    }

    /// Render the page of one post. Only approved comments are listed.
    pub fn render_post(&self, post: &Post, view: &PostView) -> Result<String> {
        let path = post_path(&post.slug.current);
        let data = PostData {
            id: post.id.clone(),
            title: post.title.clone(),
            description: post.description.clone(),
            path: path.clone(),
            cover_url: self.image_url(post.main_image.as_ref(), None),
            author_name: post.author.name.clone(),
            author_image_url: self.image_url(post.author.image.as_ref(), Some(AVATAR_WIDTH)),
            published: time_tag(&post.created_at, self.tz, &self.config.date_format),
            body_html: self.text.to_html(&post.body),
        };

        let comments: Vec<CommentData> = post
            .approved_comments()
            .map(|c| CommentData {
                name: c.name.clone(),
                comment: c.comment.clone(),
            })
            .collect();

        let mut context = self.base_context(&post.title, &post.description, Some(&path));
        context.insert("post", &data);
        context.insert("comments", &comments);
        context.insert("submitted", &view.submitted);
        context.insert("errors", &view.errors);
        context.insert("error_messages", &view.errors.messages());
        context.insert("input", &view.input);
        context.insert("form_action", &path);

        self.templates.render("post.html", &context)
    }

    /// Render the home page listing
    pub fn render_index(&self, posts: &[PostSummary]) -> Result<String> {
        let cards: Vec<PostCardData> = posts
            .iter()
            .filter(|p| is_safe_slug(&p.slug.current))
            .map(|p| PostCardData {
                title: p.title.clone(),
                description: p.description.clone(),
                path: post_path(&p.slug.current),
                cover_url: self.image_url(p.main_image.as_ref(), None),
                author_name: p.author.name.clone(),
                author_image_url: self.image_url(p.author.image.as_ref(), Some(AVATAR_WIDTH)),
            })
            .collect();

        let mut context = self.base_context("", "", Some("/"));
        context.insert("posts", &cards);
        self.templates.render("index.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        let context = self.base_context("Not found", "", None);
        self.templates.render("not_found.html", &context)
    }

    pub fn render_error(&self) -> Result<String> {
        let context = self.base_context("Error", "", None);
        self.templates.render("error.html", &context)
    }

    fn base_context(&self, title: &str, description: &str, path: Option<&str>) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("page_title", title);
        context.insert("page_description", description);
        context.insert(
            "canonical_url",
            &path.map(|p| full_url_for(&self.config, p)).unwrap_or_default(),
        );
        context
    }

    /// Resolve an optional image; unresolvable images are left out
    fn image_url(&self, image: Option<&ImageRef>, width: Option<u32>) -> Option<String> {
        let image = image?;
        let url = match width {
            Some(w) => self.images.url_with_width(image, w),
            None => self.images.url(image),
        };
        match url {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Skipping image: {}", e);
                None
            }
        }
    }
}
