//! Portable Text (rich-text body) model and HTML renderer
//!
//! A post body is a list of blocks. Text blocks carry a style (`normal`,
//! `h1`..`h6`, `blockquote`), an optional list item kind, inline spans with
//! decorator marks, and mark definitions for annotations such as links.
//! Every block type that is not understood is kept as [`Block::Unknown`] and
//! rendered through a fallback paragraph.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::image::ImageUrlBuilder;
use super::post::ImageRef;
use crate::helpers::html_escape;

/// One unit of body content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Block {
    Text(TextBlock),
    Image(ImageRef),
    Unknown { kind: String, raw: Value },
}

impl Block {
    /// The `_type` tag this block was stored with
    pub fn kind(&self) -> &str {
        match self {
            Block::Text(_) => "block",
            Block::Image(_) => "image",
            Block::Unknown { kind, .. } => kind,
        }
    }
}

impl From<Value> for Block {
    fn from(raw: Value) -> Self {
        let kind = raw
            .get("_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let parsed = match kind.as_str() {
            "block" => serde_json::from_value(raw.clone()).map(Block::Text).ok(),
            "image" => serde_json::from_value(raw.clone()).map(Block::Image).ok(),
            _ => None,
        };

        parsed.unwrap_or(Block::Unknown { kind, raw })
    }
}

impl From<Block> for Value {
    fn from(block: Block) -> Self {
        let (kind, mut value) = match block {
            Block::Text(text) => ("block", serde_json::to_value(text).unwrap_or(Value::Null)),
            Block::Image(image) => ("image", serde_json::to_value(image).unwrap_or(Value::Null)),
            Block::Unknown { raw, .. } => return raw,
        };
        if let Value::Object(map) = &mut value {
            map.insert("_type".to_string(), Value::String(kind.to_string()));
        }
        value
    }
}

/// A paragraph, heading, quote or list item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(rename = "_key", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default = "normal_style")]
    pub style: String,

    #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,

    #[serde(default)]
    pub children: Vec<Span>,

    #[serde(rename = "markDefs", default)]
    pub mark_defs: Vec<MarkDef>,
}

fn normal_style() -> String {
    "normal".to_string()
}

impl TextBlock {
    /// Plain text block with a single unmarked span
    pub fn plain(style: &str, text: &str) -> Self {
        Self {
            style: style.to_string(),
            children: vec![Span::text(text)],
            ..Default::default()
        }
    }

    /// Bulleted list item
    pub fn bullet(text: &str) -> Self {
        Self {
            list_item: Some("bullet".to_string()),
            level: Some(1),
            ..Self::plain("normal", text)
        }
    }

    fn block_style(&self) -> BlockStyle {
        BlockStyle::parse(&self.style)
    }
}

/// Inline run of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "_type", default = "span_type")]
    pub kind: String,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub marks: Vec<String>,
}

fn span_type() -> String {
    "span".to_string()
}

impl Span {
    pub fn text(text: &str) -> Self {
        Self {
            kind: span_type(),
            text: text.to_string(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: &str, marks: &[&str]) -> Self {
        Self {
            marks: marks.iter().map(|m| m.to_string()).collect(),
            ..Self::text(text)
        }
    }
}

/// Annotation definition referenced from span marks by key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,

    #[serde(rename = "_type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl MarkDef {
    pub fn link(key: &str, href: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: "link".to_string(),
            href: Some(href.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockStyle {
    Normal,
    Heading(u8),
    Blockquote,
}

impl BlockStyle {
    fn parse(style: &str) -> Self {
        match style {
            "h1" => BlockStyle::Heading(1),
            "h2" => BlockStyle::Heading(2),
            "h3" => BlockStyle::Heading(3),
            "h4" => BlockStyle::Heading(4),
            "h5" => BlockStyle::Heading(5),
            "h6" => BlockStyle::Heading(6),
            "blockquote" => BlockStyle::Blockquote,
            _ => BlockStyle::Normal,
        }
    }

    /// Opening tag; the top three heading levels get decreasing visual weight
    fn open_tag(self) -> String {
        match self {
            BlockStyle::Heading(1) => r#"<h1 class="my-5 text-2xl font-bold">"#.to_string(),
            BlockStyle::Heading(2) => r#"<h2 class="my-5 text-xl font-bold">"#.to_string(),
            BlockStyle::Heading(3) => r#"<h3 class="my-5 text-lg font-bold">"#.to_string(),
            BlockStyle::Heading(n) => format!("<h{}>", n),
            BlockStyle::Blockquote => "<blockquote>".to_string(),
            BlockStyle::Normal => "<p>".to_string(),
        }
    }

    fn close_tag(self) -> String {
        match self {
            BlockStyle::Heading(n) => format!("</h{}>", n),
            BlockStyle::Blockquote => "</blockquote>".to_string(),
            BlockStyle::Normal => "</p>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Number,
}

impl ListKind {
    fn parse(item: &str) -> Self {
        match item {
            "number" => ListKind::Number,
            _ => ListKind::Bullet,
        }
    }

    fn open_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "<ul>",
            ListKind::Number => "<ol>",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "</ul>",
            ListKind::Number => "</ol>",
        }
    }

    fn item_class(self) -> &'static str {
        match self {
            ListKind::Bullet => "ml-4 list-disc",
            ListKind::Number => "ml-4 list-decimal",
        }
    }
}

/// Renders Portable Text bodies to HTML
#[derive(Debug, Clone)]
pub struct PortableTextRenderer {
    images: ImageUrlBuilder,
}

impl PortableTextRenderer {
    pub fn new(images: ImageUrlBuilder) -> Self {
        Self { images }
    }

    /// Render a whole body. Consecutive list items are grouped into one list.
    pub fn to_html(&self, blocks: &[Block]) -> String {
        let mut html = String::new();
        let mut open_list: Option<ListKind> = None;

        for block in blocks {
            let item_kind = match block {
                Block::Text(text) => text.list_item.as_deref().map(ListKind::parse),
                _ => None,
            };

            if open_list.is_some() && open_list != item_kind {
                if let Some(kind) = open_list.take() {
                    html.push_str(kind.close_tag());
                }
            }
            if let Some(kind) = item_kind {
                if open_list.is_none() {
                    html.push_str(kind.open_tag());
                    open_list = Some(kind);
                }
            }

            match block {
                Block::Text(text) => match item_kind {
                    Some(kind) => self.render_list_item(&mut html, text, kind),
                    None => self.render_text_block(&mut html, text),
                },
                Block::Image(image) => self.render_image(&mut html, image),
                Block::Unknown { kind, raw } => render_fallback(&mut html, kind, raw),
            }
        }

        if let Some(kind) = open_list {
            html.push_str(kind.close_tag());
        }

        html
    }

    fn render_text_block(&self, html: &mut String, block: &TextBlock) {
        let style = block.block_style();
        html.push_str(&style.open_tag());
        render_spans(html, block);
        html.push_str(&style.close_tag());
    }

    fn render_list_item(&self, html: &mut String, block: &TextBlock, kind: ListKind) {
        let level = block.level.unwrap_or(1).max(1);
        if level > 1 {
            html.push_str(&format!(
                r#"<li class="{}" data-level="{}">"#,
                kind.item_class(),
                level
            ));
        } else {
            html.push_str(&format!(r#"<li class="{}">"#, kind.item_class()));
        }
        render_spans(html, block);
        html.push_str("</li>");
    }

    fn render_image(&self, html: &mut String, image: &ImageRef) {
        match self.images.url(image) {
            Ok(src) => {
                let alt = image.alt.as_deref().unwrap_or("");
                html.push_str(&format!(
                    r#"<figure><img src="{}" alt="{}"></figure>"#,
                    html_escape(&src),
                    html_escape(alt)
                ));
            }
            Err(e) => {
                tracing::debug!("Unresolvable image block: {}", e);
                html.push_str(r#"<p data-block-type="image"></p>"#);
            }
        }
    }
}

/// Render the spans of a text block, applying decorators and annotations
fn render_spans(html: &mut String, block: &TextBlock) {
    for span in &block.children {
        let mut open = String::new();
        let mut close: Vec<String> = Vec::new();

        for mark in &span.marks {
            if let Some(def) = block.mark_defs.iter().find(|d| &d.key == mark) {
                // Annotations other than links render their text unwrapped
                if let ("link", Some(href)) = (def.kind.as_str(), def.href.as_deref()) {
                    open.push_str(&format!(
                        r#"<a href="{}" class="text-blue-500 hover:underline">"#,
                        html_escape(href)
                    ));
                    close.push("</a>".to_string());
                }
                continue;
            }

            let tag = match mark.as_str() {
                "strong" => "strong",
                "em" => "em",
                "code" => "code",
                "underline" => "u",
                "strike-through" => "s",
                _ => continue,
            };
            open.push_str(&format!("<{}>", tag));
            close.push(format!("</{}>", tag));
        }

        html.push_str(&open);
        html.push_str(&html_escape(&span.text).replace('\n', "<br/>"));
        for tag in close.iter().rev() {
            html.push_str(tag);
        }
    }
}

/// Default rendering for a block type the renderer does not know
fn render_fallback(html: &mut String, kind: &str, raw: &Value) {
    let text = fallback_text(raw);
    html.push_str(&format!(
        r#"<p data-block-type="{}">{}</p>"#,
        html_escape(kind),
        html_escape(&text)
    ));
}

fn fallback_text(raw: &Value) -> String {
    if let Some(text) = raw.get("text").and_then(Value::as_str) {
        return text.to_string();
    }
    raw.get("children")
        .and_then(Value::as_array)
        .map(|children| {
            children
                .iter()
                .filter_map(|c| c.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
