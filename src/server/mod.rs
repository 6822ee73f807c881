//! HTTP server with incremental page regeneration and comment submission
//!
//! Post pages are rendered on first request and cached. Once a page is older
//! than the revalidation window, the cached copy is still served while one
//! background task regenerates it. Requests for slugs that were never built
//! wait for generation ("blocking" fallback).

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{Lookup, PageCache};
use crate::comments::{
    Claim, CommentForm, CommentInput, CommentSink, DuplicateGuard, SubmitOutcome,
};
use crate::content::{load_post, PageData};
use crate::helpers::post_path;
use crate::pages::{PageRenderer, PostView};
use crate::source::ContentSource;
use crate::Blog;

/// How long an identical comment submission is treated as a duplicate
const DUPLICATE_WINDOW: Duration = Duration::from_secs(30);

/// Server state
pub struct AppState {
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn CommentSink>,
    pages: PageRenderer,
    cache: PageCache,
    guard: DuplicateGuard,
    public_dir: PathBuf,
}

impl AppState {
    pub fn new(
        blog: &Blog,
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn CommentSink>,
    ) -> Result<Self> {
        Ok(Self {
            source,
            sink,
            pages: PageRenderer::new(&blog.config)?,
            cache: PageCache::new(Duration::from_secs(blog.config.revalidate_secs)),
            guard: DuplicateGuard::new(DUPLICATE_WINDOW),
            public_dir: blog.public_dir.clone(),
        })
    }
}

/// A page the server can generate on demand
#[derive(Debug, Clone)]
enum PageKey {
    Index,
    Post(String),
}

impl PageKey {
    fn cache_key(&self) -> String {
        match self {
            PageKey::Index => "/".to_string(),
            PageKey::Post(slug) => post_path(slug),
        }
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/post/:slug", get(post_handler).post(comment_form_handler))
        .route("/api/createComment", post(create_comment_handler))
        .fallback(static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(
    blog: &Blog,
    ip: &str,
    port: u16,
    source: Arc<dyn ContentSource>,
    sink: Arc<dyn CommentSink>,
) -> Result<()> {
    let state = Arc::new(AppState::new(blog, source, sink)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!(
        "Pages are regenerated at most every {}s.",
        blog.config.revalidate_secs
    );
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    serve_page(state, PageKey::Index).await
}

async fn post_handler(State(state): State<Arc<AppState>>, Path(slug): Path<String>) -> Response {
    serve_page(state, PageKey::Post(slug)).await
}

/// Serve from cache, regenerating stale pages in the background and
/// generating missing ones on demand
async fn serve_page(state: Arc<AppState>, key: PageKey) -> Response {
    let cache_key = key.cache_key();

    match state.cache.get(&cache_key).await {
        Lookup::Fresh(html) => Html(html.to_string()).into_response(),
        Lookup::Stale(html) => {
            spawn_revalidation(state.clone(), key);
            Html(html.to_string()).into_response()
        }
        Lookup::Miss => match regenerate(&state, &key).await {
            Ok(Some(html)) => {
                let html = state.cache.insert(&cache_key, html).await;
                Html(html.to_string()).into_response()
            }
            Ok(None) => not_found(&state),
            Err(e) => {
                tracing::error!("Failed to generate {}: {}", cache_key, e);
                server_error(&state)
            }
        },
    }
}

/// Render a page from fresh data. `None` when the post does not exist.
async fn regenerate(state: &AppState, key: &PageKey) -> crate::error::Result<Option<String>> {
    match key {
        PageKey::Index => {
            let posts = state.source.post_summaries().await?;
            state.pages.render_index(&posts).map(Some)
        }
        PageKey::Post(slug) => match load_post(state.source.as_ref(), slug).await? {
            PageData::Found(post) => state.pages.render_post(&post, &PostView::default()).map(Some),
            PageData::NotFound => Ok(None),
        },
    }
}

fn spawn_revalidation(state: Arc<AppState>, key: PageKey) {
    let cache_key = key.cache_key();
    if !state.cache.try_begin_revalidation(&cache_key) {
        return;
    }

    tokio::spawn(async move {
        match regenerate(&state, &key).await {
            Ok(Some(html)) => {
                state.cache.insert(&cache_key, html).await;
                tracing::debug!("Regenerated {}", cache_key);
            }
            Ok(None) => {
                state.cache.remove(&cache_key).await;
                tracing::info!("{} no longer exists, evicted", cache_key);
            }
            Err(e) => {
                tracing::error!("Regenerating {} failed, keeping stale page: {}", cache_key, e);
            }
        }
        state.cache.end_revalidation(&cache_key);
    });
}

/// Comment form posted from a post page
async fn comment_form_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Form(mut input): Form<CommentInput>,
) -> Response {
    let post = match load_post(state.source.as_ref(), &slug).await {
        Ok(PageData::Found(post)) => post,
        Ok(PageData::NotFound) => return not_found(&state),
        Err(e) => {
            tracing::error!("Failed to load {} for comment: {}", slug, e);
            return server_error(&state);
        }
    };

    // The comment belongs to the page it was posted from
    input.post_id = post.id.clone();

    let mut form = CommentForm::new();
    let view = match deliver(&state, &mut form, &input).await {
        SubmitOutcome::Submitted | SubmitOutcome::Ignored => PostView {
            submitted: true,
            ..Default::default()
        },
        SubmitOutcome::Invalid(_) | SubmitOutcome::Failed | SubmitOutcome::Busy => {
            PostView::after_submit(&form, input)
        }
    };

    match state.pages.render_post(&post, &view) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render {}: {}", slug, e);
            server_error(&state)
        }
    }
}

/// JSON comment endpoint (`{ _id, name, email, comment }`)
async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CommentInput>,
) -> Response {
    if input.post_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Missing post id" })),
        )
            .into_response();
    }

    let mut form = CommentForm::new();
    match deliver(&state, &mut form, &input).await {
        SubmitOutcome::Invalid(errors) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": errors.messages() })),
        )
            .into_response(),
        SubmitOutcome::Submitted | SubmitOutcome::Ignored => (
            StatusCode::OK,
            Json(json!({ "message": "Comment submitted" })),
        )
            .into_response(),
        SubmitOutcome::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Couldn't submit comment" })),
        )
            .into_response(),
        SubmitOutcome::Busy => (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Comment is already being submitted" })),
        )
            .into_response(),
    }
}

/// Run one submission through the form state machine. An identical
/// submission that was recently accepted is acknowledged without a second
/// delivery; one that is still in flight is turned away.
async fn deliver(state: &AppState, form: &mut CommentForm, input: &CommentInput) -> SubmitOutcome {
    if let Err(outcome) = form.begin(input) {
        return outcome;
    }

    match state.guard.try_claim(input) {
        Claim::Granted => {}
        Claim::Accepted => {
            tracing::info!("Ignoring duplicate comment for post {}", input.post_id);
            return SubmitOutcome::Ignored;
        }
        Claim::Pending => {
            tracing::info!("Identical comment for post {} still in flight", input.post_id);
            form.cancel();
            return SubmitOutcome::Busy;
        }
    }

    let result = state.sink.create_comment(input).await;
    let outcome = form.finish(input, result);
    match outcome {
        SubmitOutcome::Submitted => state.guard.accept(input),
        _ => state.guard.release(input),
    }
    outcome
}

/// Static files from the public directory, 404 page otherwise
async fn static_handler(State(state): State<Arc<AppState>>, request: Request<Body>) -> Response {
    let mut service = ServeDir::new(&state.public_dir);
    match service.try_call(request).await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => not_found(&state),
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!("Static file error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

fn not_found(state: &AppState) -> Response {
    match state.pages.render_not_found() {
        Ok(html) => (StatusCode::NOT_FOUND, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render 404 page: {}", e);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

fn server_error(state: &AppState) -> Response {
    match state.pages.render_error() {
        Ok(html) => (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{Author, Comment, Post, Slug};
    use crate::error::Error;
    use crate::source::MemorySource;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
    use tower::ServiceExt;

    #[derive(Default)]
    struct RecordingSink {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay_ms: AtomicU64,
    }

    #[async_trait]
    impl CommentSink for RecordingSink {
        async fn create_comment(&self, _input: &CommentInput) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Io(io::Error::new(io::ErrorKind::Other, "down")));
            }
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        source: Arc<MemorySource>,
        sink: Arc<RecordingSink>,
        app: Router,
    }

    fn post(title: &str) -> Post {
        Post {
            id: "post-1".to_string(),
            created_at: Utc.with_ymd_and_hms(2022, 1, 15, 10, 30, 0).unwrap(),
            title: title.to_string(),
            description: "About things".to_string(),
            main_image: None,
            slug: Slug::new("hello"),
            body: Vec::new(),
            author: Author {
                name: "Ada".to_string(),
                image: None,
            },
            comments: vec![
                Comment {
                    id: "c1".to_string(),
                    created_at: None,
                    post: None,
                    name: "Grace".to_string(),
                    email: "grace@x.com".to_string(),
                    comment: "Lovely".to_string(),
                    approved: true,
                },
                Comment {
                    id: "c2".to_string(),
                    created_at: None,
                    post: None,
                    name: "Mallory".to_string(),
                    email: "m@x.com".to_string(),
                    comment: "Spam".to_string(),
                    approved: false,
                },
            ],
        }
    }

    fn harness(revalidate_secs: u64) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SiteConfig::default();
        config.sanity.project_id = "p1".to_string();
        config.revalidate_secs = revalidate_secs;
        let blog = Blog::with_config(dir.path(), config);

        let source = Arc::new(MemorySource::new(vec![post("Hello World")]));
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::new(&blog, source.clone(), sink.clone()).unwrap();

        Harness {
            _dir: dir,
            source,
            sink,
            app: router(Arc::new(state)),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    const JANE: &str = "_id=ignored&name=Jane&email=jane%40x.com&comment=Great+post%21";

    #[tokio::test]
    async fn test_unknown_slug_is_404() {
        let h = harness(60);
        let (status, body) = send(&h.app, get("/post/missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("This page could not be found."));

        let (status, _) = send(&h.app, get("/no/such/file.css")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_page_and_fresh_cache() {
        let h = harness(60);
        let (status, body) = send(&h.app, get("/post/hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Hello World"));
        assert!(body.contains("Blog post by"));
        assert!(body.contains("1/15/2022, 10:30:00 AM"));
        assert!(body.contains("Grace"));
        assert!(!body.contains("Mallory"));

        h.source.upsert(post("Changed"));
        let (_, body) = send(&h.app, get("/post/hello")).await;
        assert!(body.contains("Hello World"));
        assert_eq!(h.source.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_page_served_while_regenerating() {
        let h = harness(0);
        let (_, body) = send(&h.app, get("/post/hello")).await;
        assert!(body.contains("Hello World"));

        h.source.upsert(post("Second Edition"));
        let (status, body) = send(&h.app, get("/post/hello")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Hello World"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let (_, body) = send(&h.app, get("/post/hello")).await;
        assert!(body.contains("Second Edition"));
    }

    #[tokio::test]
    async fn test_deleted_post_is_evicted() {
        let h = harness(0);
        send(&h.app, get("/post/hello")).await;

        h.source.remove("hello");
        let (status, _) = send(&h.app, get("/post/hello")).await;
        assert_eq!(status, StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let (status, _) = send(&h.app, get("/post/hello")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upstream_failure_on_miss() {
        let h = harness(60);
        h.source.set_unavailable(true);
        let (status, body) = send(&h.app, get("/post/hello")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("could not be generated"));
    }

    #[tokio::test]
    async fn test_index_lists_posts() {
        let h = harness(60);
        let (status, body) = send(&h.app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"href="/post/hello""#));
    }

    #[tokio::test]
    async fn test_form_validation_makes_no_call() {
        let h = harness(60);
        let (status, body) = send(
            &h.app,
            form("/post/hello", "name=&email=jane%40x.com&comment=Hi"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("The Name Field is required"));
        assert!(!body.contains("The Email Field is required"));
        assert!(!body.contains("The Comment Field is required"));
        assert!(body.contains(r#"id="comment-form""#));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_submission_shows_acknowledgment() {
        let h = harness(60);
        let (status, body) = send(&h.app, form("/post/hello", JANE)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Thank you for submitting your comment!"));
        assert!(!body.contains(r#"id="comment-form""#));
        assert!(!body.contains("Jane"));
        assert!(body.contains("Grace"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);

        // Pressing submit again does not create a second comment
        let (_, body) = send(&h.app, form("/post/hello", JANE)).await;
        assert!(body.contains("Thank you for submitting your comment!"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_form() {
        let h = harness(60);
        h.sink.fail.store(true, Ordering::SeqCst);

        let (status, body) = send(&h.app, form("/post/hello", JANE)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"id="comment-form""#));
        assert!(body.contains(r#"value="Jane""#));
        assert!(!body.contains("Thank you"));
        assert!(!body.contains("required"));

        // Failed deliveries may be retried by hand
        h.sink.fail.store(false, Ordering::SeqCst);
        let (_, body) = send(&h.app, form("/post/hello", JANE)).await;
        assert!(body.contains("Thank you for submitting your comment!"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_comment_on_unknown_post() {
        let h = harness(60);
        let (status, _) = send(&h.app, form("/post/missing", JANE)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_comment_api() {
        let h = harness(60);

        let (status, body) = send(
            &h.app,
            json_post(
                "/api/createComment",
                json!({ "_id": "post-1", "name": "", "email": "", "comment": "x" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let errors: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            errors["errors"],
            json!(["The Name Field is required", "The Email Field is required"])
        );

        let (status, body) = send(
            &h.app,
            json_post(
                "/api/createComment",
                json!({ "_id": "post-1", "name": "Jane", "email": "jane@x.com", "comment": "Great post!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Comment submitted"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);

        let (status, _) = send(
            &h.app,
            json_post("/api/createComment", json!({ "name": "Jane" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_comment_api_failure() {
        let h = harness(60);
        h.sink.fail.store(true, Ordering::SeqCst);
        let (status, body) = send(
            &h.app,
            json_post(
                "/api/createComment",
                json!({ "_id": "post-1", "name": "Jane", "email": "jane@x.com", "comment": "Great post!" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("Couldn't submit comment"));
    }

    fn jane_json() -> serde_json::Value {
        json!({ "_id": "post-1", "name": "Jane", "email": "jane@x.com", "comment": "Great post!" })
    }

    #[tokio::test]
    async fn test_duplicate_during_failing_delivery_is_not_acknowledged() {
        let h = harness(60);
        h.sink.fail.store(true, Ordering::SeqCst);
        h.sink.delay_ms.store(200, Ordering::SeqCst);

        let first = send(&h.app, json_post("/api/createComment", jane_json()));
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            send(&h.app, json_post("/api/createComment", jane_json())).await
        };
        let ((first, _), (second, body)) = tokio::join!(first, second);

        assert_eq!(first, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(second, StatusCode::CONFLICT);
        assert!(!body.contains("Comment submitted"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);

        // Nothing was stored, so the visitor can send it again
        h.sink.fail.store(false, Ordering::SeqCst);
        h.sink.delay_ms.store(0, Ordering::SeqCst);
        let (status, _) = send(&h.app, json_post("/api/createComment", jane_json())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_form_duplicate_during_delivery_keeps_form() {
        let h = harness(60);
        h.sink.fail.store(true, Ordering::SeqCst);
        h.sink.delay_ms.store(200, Ordering::SeqCst);

        let first = send(&h.app, form("/post/hello", JANE));
        let second = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            send(&h.app, form("/post/hello", JANE)).await
        };
        let ((_, first), (_, second)) = tokio::join!(first, second);

        for body in [first, second] {
            assert!(body.contains(r#"id="comment-form""#));
            assert!(!body.contains("Thank you"));
        }
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_accepted_duplicate_is_acknowledged_once() {
        let h = harness(60);
        let (first, _) = send(&h.app, json_post("/api/createComment", jane_json())).await;
        let (second, body) = send(&h.app, json_post("/api/createComment", jane_json())).await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::OK);
        assert!(body.contains("Comment submitted"));
        assert_eq!(h.sink.calls.load(Ordering::SeqCst), 1);
    }
}
