//! Static asset detection. Asset requests skip the gate entirely.

use crate::classify::is_api_path;

/// Default prefixes served by the build pipeline.
pub const DEFAULT_STATIC_PREFIXES: [&str; 3] = ["/_static/", "/_image", "/favicon.ico"];

#[derive(Debug, Clone)]
pub struct StaticAssets {
    prefixes: Vec<String>,
}

impl Default for StaticAssets {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_PREFIXES.iter().map(|p| (*p).to_string()))
    }
}

impl StaticAssets {
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes.into_iter().filter(|p| !p.is_empty()).collect(),
        }
    }

    /// True for paths under a static prefix or whose last segment has a file
    /// extension (`/logo.svg`, `/docs/guide.pdf`). API routes are never
    /// assets, whatever their last segment looks like.
    pub fn is_static(&self, path: &str) -> bool {
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return true;
        }
        !is_api_path(path) && has_extension(path)
    }
}

fn has_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rfind('.') {
        // Dotfiles (`/.well-known`) and trailing dots are not extensions.
        Some(0) | None => false,
        Some(idx) => {
            let ext = &segment[idx + 1..];
            !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}
