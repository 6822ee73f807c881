//! URL helper functions

use std::path::{Path, PathBuf};

use crate::config::SiteConfig;

/// Route of a post page
///
/// # Examples
/// ```ignore
/// post_path("hello-world") // -> "/post/hello-world"
/// ```
pub fn post_path(slug: &str) -> String {
    format!("/post/{}", slug.trim_matches('/'))
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/post/a") // -> "https://example.com/post/a"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    format!(
        "{}/{}",
        config.url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Whether a slug can name exactly one directory under `public/post/`
pub fn is_safe_slug(slug: &str) -> bool {
    !slug.trim().is_empty()
        && !slug.contains("..")
        && !slug.contains(['/', '\\', '\0'])
}

/// Directory holding a post page. `None` for slugs that are not safe to
/// join onto the public directory.
pub fn post_output_dir(public_dir: &Path, slug: &str) -> Option<PathBuf> {
    if !is_safe_slug(slug) {
        return None;
    }
    Some(public_dir.join("post").join(slug))
}

/// File a post page is written to
pub fn post_output_path(public_dir: &Path, slug: &str) -> Option<PathBuf> {
    post_output_dir(public_dir, slug).map(|dir| dir.join("index.html"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_path() {
        assert_eq!(post_path("hello"), "/post/hello");
        assert_eq!(post_path("/hello/"), "/post/hello");
    }

    #[test]
    fn test_full_url_for() {
        let mut config = SiteConfig::default();
        config.url = "https://example.com/".to_string();
        assert_eq!(
            full_url_for(&config, "/post/a"),
            "https://example.com/post/a"
        );
    }

    #[test]
    fn test_post_output_path() {
        assert_eq!(
            post_output_path(Path::new("public"), "a"),
            Some(PathBuf::from("public/post/a/index.html"))
        );
        assert_eq!(post_output_path(Path::new("public"), ".."), None);
        assert_eq!(post_output_path(Path::new("public"), "../../x"), None);
        assert_eq!(post_output_dir(Path::new("public"), "a/b"), None);
    }

    #[test]
    fn test_is_safe_slug() {
        assert!(is_safe_slug("hello-world"));
        assert!(is_safe_slug("v1.2"));
        assert!(!is_safe_slug(""));
        assert!(!is_safe_slug(".."));
        assert!(!is_safe_slug("a..b"));
        assert!(!is_safe_slug("a/b"));
        assert!(!is_safe_slug("a\\b"));
        assert!(!is_safe_slug("a\0b"));
    }
}
