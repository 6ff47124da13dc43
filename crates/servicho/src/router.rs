//! HTTP entry point of the development server.
//!
//! Every request lands in [`handle_request`], which decides between:
//!
//! - an HTML file from the root, with the reload client injected
//! - a preview page for a `.js`/`.jsx` component module
//! - any other file as raw bytes
//! - 404 `Not Found` / 500 `Internal Server Error`
//!
//! Only `GET` is served; other methods get a 404.

use crate::preview;
use crate::resolver::{self, AssetFs, ContentKind, ResolvedAsset};
use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// `Sec-Fetch-Dest` value browsers send when loading a module script.
const SCRIPT_DESTINATION: &str = "script";

const BODY_CLOSE: &[u8] = b"</body>";

/// Served pages keep their own encoding; the browser reads it from the page.
const SERVED_HTML_TYPE: &str = "text/html";

/// State shared by all requests of one session.
#[derive(Debug)]
pub struct AppState {
    /// Absolute root directory being served
    pub root: PathBuf,
    /// Filesystem used to resolve assets
    pub fs: Arc<dyn AssetFs>,
    /// Inline `<script>` element appended to HTML pages
    pub reload_script: String,
}

/// Shared state handle for the router.
pub type SharedState = Arc<AppState>;

/// Build the HTTP router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(
            // CORS: Allow all origins for dev (standard practice)
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Handle every HTTP request.
async fn handle_request(
    State(state): State<SharedState>,
    method: Method,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    if method != Method::GET {
        return not_found();
    }

    let Ok(decoded) = urlencoding::decode(uri.path()) else {
        return not_found();
    };
    let path = if decoded == "/" {
        "/index.html".to_string()
    } else {
        decoded.into_owned()
    };

    let asset = match resolver::resolve(state.fs.as_ref(), &path, &state.root).await {
        Ok(asset) => asset,
        Err(e) => {
            crate::ui::error(&format!("Failed to serve {}: {}", path, e));
            return internal_error();
        }
    };

    match asset {
        ResolvedAsset::Found {
            kind: ContentKind::Html,
            content,
            ..
        } => response(
            StatusCode::OK,
            SERVED_HTML_TYPE,
            Body::from(inject_reload_script(&content, &state.reload_script)),
        ),
        _ if preview::is_component_module(&path) && !is_module_fetch(&headers) => {
            match resolver::normalize_request_path(&path) {
                Some(relative) => {
                    let document = preview::synthesize(&state.root.join(relative), &state.root);
                    tracing::debug!(module = %document.import_path, "serving component preview");
                    html_response(document.into_bytes())
                }
                None => not_found(),
            }
        }
        ResolvedAsset::Found { path: file, content, .. } => {
            let content_type = mime_guess::from_path(&file).first_or_octet_stream();
            response(StatusCode::OK, content_type.as_ref(), Body::from(content))
        }
        ResolvedAsset::NotFound => not_found(),
    }
}

/// The preview page itself imports the module; that fetch wants the file.
fn is_module_fetch(headers: &HeaderMap) -> bool {
    headers
        .get("sec-fetch-dest")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|dest| dest.eq_ignore_ascii_case(SCRIPT_DESTINATION))
}

/// Inject the reload script into HTML content.
///
/// Adds the script before the last closing </body> tag, or at the end when
/// the document has none. Exactly one script is added per call and the
/// document bytes are copied unchanged, whatever their encoding.
pub fn inject_reload_script(content: &[u8], script_tag: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(content.len() + script_tag.len() + 1);

    match content
        .windows(BODY_CLOSE.len())
        .rposition(|window| window == BODY_CLOSE)
    {
        Some(pos) => {
            result.extend_from_slice(&content[..pos]);
            result.extend_from_slice(script_tag.as_bytes());
            result.push(b'\n');
            result.extend_from_slice(&content[pos..]);
        }
        None => {
            result.extend_from_slice(content);
            result.push(b'\n');
            result.extend_from_slice(script_tag.as_bytes());
        }
    }

    result
}

fn html_response(body: Vec<u8>) -> Response {
    response(StatusCode::OK, "text/html; charset=utf-8", Body::from(body))
}

fn not_found() -> Response {
    response(StatusCode::NOT_FOUND, "text/plain", Body::from("Not Found"))
}

fn internal_error() -> Response {
    response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "text/plain",
        Body::from("Internal Server Error"),
    )
}

fn response(status: StatusCode, content_type: &str, body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let headers = response.headers_mut();
    if let Ok(value) = header::HeaderValue::from_str(content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "<script>reload()</script>";

    #[test]
    fn test_inject_reload_script_with_body() {
        let html = b"<html><body><h1>Test</h1></body></html>";
        let result = String::from_utf8(inject_reload_script(html, SCRIPT)).unwrap();

        let script_pos = result.find(SCRIPT).unwrap();
        let body_pos = result.find("</body>").unwrap();
        assert!(script_pos < body_pos);
        assert!(result.starts_with("<html><body><h1>Test</h1>"));
    }

    #[test]
    fn test_inject_reload_script_without_body() {
        let html = b"<h1>Fragment</h1>";
        let result = String::from_utf8(inject_reload_script(html, SCRIPT)).unwrap();
        assert_eq!(result, format!("<h1>Fragment</h1>\n{}", SCRIPT));
    }

    #[test]
    fn test_inject_uses_last_body_tag() {
        let html = b"<body><pre>&lt;/body&gt; </body></pre></body>";
        let result = String::from_utf8(inject_reload_script(html, SCRIPT)).unwrap();
        assert!(result.ends_with(&format!("{}\n</body>", SCRIPT)));
        assert_eq!(result.matches(SCRIPT).count(), 1);
    }

    #[test]
    fn test_inject_keeps_non_utf8_bytes() {
        let html = b"<body>caf\xe9</body>";
        let result = inject_reload_script(html, SCRIPT);

        assert!(result.starts_with(b"<body>caf\xe9"));
        assert!(result.ends_with(b"\n</body>"));
        assert_eq!(result.len(), html.len() + SCRIPT.len() + 1);
    }

    #[test]
    fn test_is_module_fetch() {
        let mut headers = HeaderMap::new();
        assert!(!is_module_fetch(&headers));

        headers.insert("sec-fetch-dest", "document".parse().unwrap());
        assert!(!is_module_fetch(&headers));

        headers.insert("sec-fetch-dest", "script".parse().unwrap());
        assert!(is_module_fetch(&headers));
    }

    #[test]
    fn test_not_found_response() {
        let response = not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }
}
