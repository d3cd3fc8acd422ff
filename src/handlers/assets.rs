use axum::{
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};

const INDEX_HTML: &str = include_str!("../../static/index.html");
const MANIFEST: &str = include_str!("../../static/manifest.json");
const ICON_192: &[u8] = include_bytes!("../../static/icon-192x192.png");
const ICON_512: &[u8] = include_bytes!("../../static/icon-512x512.png");

/// The app shell and the files the offline cache precaches.
/// `/dashboard` and `/admin` are the post-sign-in landing routes and serve the same shell.
pub fn asset_routes() -> Router {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(index))
        .route("/admin", get(index))
        .route("/manifest.json", get(manifest))
        .route("/icon-192x192.png", get(icon_192))
        .route("/icon-512x512.png", get(icon_512))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn manifest() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/manifest+json")], MANIFEST)
}

async fn icon_192() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], ICON_192)
}

async fn icon_512() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], ICON_512)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_lists_both_icons() {
        let manifest: serde_json::Value = serde_json::from_str(MANIFEST).unwrap();
        let icons: Vec<&str> = manifest["icons"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|icon| icon["src"].as_str())
            .collect();
        assert_eq!(icons, vec!["/icon-192x192.png", "/icon-512x512.png"]);
    }

    #[test]
    fn test_icons_are_png() {
        for icon in [ICON_192, ICON_512] {
            assert_eq!(&icon[..8], b"\x89PNG\r\n\x1a\n");
        }
    }
}
