//! Static file server with a live reload WebSocket.
//!
//! Serves the build output directory as-is. HTML documents get the reload
//! client injected; the client connects back to `/__kiln/ws` and receives the
//! reload vocabulary as text frames.

use crate::dev::hub::ClientRegistrar;
use crate::dev::SharedStatus;
use crate::error::{KilnError, Result};
use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use rust_embed::RustEmbed;
use std::future::Future;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// WebSocket endpoint for live reload clients.
pub const WS_PATH: &str = "/__kiln/ws";
/// Embedded reload client script.
pub const RELOAD_SCRIPT_PATH: &str = "/__kiln/reload.js";
/// JSON session status.
pub const STATUS_PATH: &str = "/__kiln/status";

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(RustEmbed)]
#[folder = "assets/dev"]
struct DevAssets;

/// Everything request handlers need.
#[derive(Clone)]
pub struct ServerState {
    /// Output directory being served
    pub root: PathBuf,
    pub default_document: String,
    pub live_reload: bool,
    /// Registers sockets with the session loop
    pub clients: ClientRegistrar,
    pub status: SharedStatus,
}

/// Development server bound to its address.
pub struct DevServer {
    listener: TcpListener,
    state: ServerState,
}

impl DevServer {
    /// Bind the listener.
    ///
    /// # Errors
    ///
    /// Returns error if the address is unavailable
    pub async fn bind(addr: SocketAddr, state: ServerState) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| KilnError::Server(format!("Failed to bind to {}: {}", addr, e)))?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Build the axum router with all routes.
    pub fn router(state: ServerState) -> Router {
        Router::new()
            .route(WS_PATH, get(handle_ws))
            .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
            .route(STATUS_PATH, get(handle_status))
            .fallback(handle_static)
            .layer(middleware::from_fn(access_log))
            .layer(
                // CORS: Allow all origins for dev
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }

    /// Serve until `shutdown` resolves, then drain open requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = Self::router(self.state);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| KilnError::Server(format!("Server error: {}", e)))
    }
}

async fn access_log(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    tracing::debug!(%method, path, status = response.status().as_u16(), "request");
    response
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| client_connection(socket, state.clients))
}

/// Pump hub messages into one socket until either side goes away.
async fn client_connection(socket: WebSocket, clients: ClientRegistrar) {
    let Some((id, mut rx)) = clients.connect().await else {
        // Session is gone
        return;
    };

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outgoing = rx.recv() => match outgoing {
                Some(message) => {
                    if sink.send(Message::Text(message.as_str().into())).await.is_err() {
                        break;
                    }
                }
                // Hub dropped the client
                None => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sink.close().await;
    clients.disconnect(id).await;
}

async fn handle_reload_script() -> Response {
    match DevAssets::get("reload-client.js") {
        Some(asset) => (
            [
                (header::CONTENT_TYPE, "application/javascript"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            asset.data.into_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn handle_status(State(state): State<ServerState>) -> Response {
    Json(state.status.snapshot()).into_response()
}

async fn handle_static(State(state): State<ServerState>, method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, HEAD")],
        )
            .into_response();
    }

    serve_path(
        &state.root,
        uri.path(),
        &state.default_document,
        state.live_reload,
    )
    .await
}

/// Map a request path onto a regular file under `root`.
///
/// `/` maps to `default_document`. Each segment is percent-decoded first;
/// decoded segments that are `..` or carry a separator, a drive colon or NUL
/// are rejected, and the canonical result must stay inside the canonical root
/// so symlinks cannot escape it either.
pub async fn resolve_request(
    root: &Path,
    request_path: &str,
    default_document: &str,
) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for raw in request_path.split('/') {
        let segment = urlencoding::decode(raw).ok()?;
        match segment.as_ref() {
            "" | "." => continue,
            ".." => return None,
            s if s.contains(|c: char| matches!(c, '/' | '\\' | ':' | '\0')) => return None,
            s => relative.push(s),
        }
    }

    if relative.as_os_str().is_empty() {
        relative.push(default_document);
    }

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let root = tokio::fs::canonicalize(root).await.ok()?;
    let candidate = tokio::fs::canonicalize(root.join(&relative)).await.ok()?;
    if !candidate.starts_with(&root) {
        return None;
    }
    let metadata = tokio::fs::metadata(&candidate).await.ok()?;
    metadata.is_file().then_some(candidate)
}

/// Respond to a GET for `request_path` from the files under `root`.
pub async fn serve_path(
    root: &Path,
    request_path: &str,
    default_document: &str,
    live_reload: bool,
) -> Response {
    let Some(file) = resolve_request(root, request_path, default_document).await else {
        return not_found();
    };

    match file_response(&file, live_reload).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(path = %file.display(), error = %e, "cannot read file");
            not_found()
        }
    }
}

async fn file_response(path: &Path, live_reload: bool) -> std::io::Result<Response> {
    let content_type = content_type_for(path);
    let is_html = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("html") | Some("htm")
    );

    if is_html && live_reload {
        let content = tokio::fs::read(path).await?;
        let body = inject_reload_script(&content);
        let length = body.len() as u64;
        return Ok(ok_response(Body::from(body), length, content_type));
    }

    let mut file = tokio::fs::File::open(path).await?;
    let length = file.metadata().await?.len();

    let stream = async_stream::stream! {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok::<Bytes, std::io::Error>(Bytes::copy_from_slice(&buf[..n])),
                Err(e) => {
                    yield Err(e);
                    break;
                }
            }
        }
    };

    Ok(ok_response(Body::from_stream(stream), length, content_type))
}

fn ok_response(body: Body, length: u64, content_type: Option<&'static str>) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Some(content_type) = content_type {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Body::empty()).into_response()
}

/// Inject reload script into HTML content.
///
/// Adds the reload client script before the closing `</body>` tag, or at the
/// end of documents without one.
pub fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let script_tag = format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH);

    if let Some(pos) = html.rfind("</body>") {
        let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
        result.push_str(&html[..pos]);
        result.push_str(&script_tag);
        result.push('\n');
        result.push_str(&html[pos..]);
        return result.into_bytes();
    }

    let mut result = html.into_owned();
    result.push('\n');
    result.push_str(&script_tag);
    result.into_bytes()
}

/// Determine content type from file extension. Unknown extensions get no
/// `Content-Type` header at all.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();

    let content_type = match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" | "cjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "bmp" => "image/bmp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => return None,
    };
    Some(content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_reload_script_with_body() {
        let html = b"<html><body><h1>Test</h1></body></html>";
        let result = String::from_utf8(inject_reload_script(html)).unwrap();

        let script_pos = result
            .find(r#"<script src="/__kiln/reload.js"></script>"#)
            .unwrap();
        let body_pos = result.find("</body>").unwrap();
        assert!(script_pos < body_pos);
    }

    #[test]
    fn test_inject_reload_script_without_body() {
        let html = b"<html><h1>Test</h1></html>";
        let result = String::from_utf8(inject_reload_script(html)).unwrap();
        assert!(result.ends_with(r#"<script src="/__kiln/reload.js"></script>"#));
    }

    #[test]
    fn test_content_type_table() {
        assert_eq!(
            content_type_for(Path::new("a/index.HTML")),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(content_type_for(Path::new("app.mjs")), Some("application/javascript; charset=utf-8"));
        assert_eq!(content_type_for(Path::new("font.woff2")), Some("font/woff2"));
        assert_eq!(content_type_for(Path::new("README")), None);
        assert_eq!(content_type_for(Path::new("data.bin")), None);
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dist");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("index.html"), "<html></html>").unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();

        for path in [
            "/../secret.txt",
            "/a/../../secret.txt",
            "/..\\secret.txt",
            "/C:/secret.txt",
            "/%2e%2e/secret.txt",
            "/%2E%2E%2Fsecret.txt",
            "/..%5csecret.txt",
            "/index.html%00.js",
        ] {
            assert!(
                resolve_request(&root, path, "index.html").await.is_none(),
                "{} should not resolve",
                path
            );
        }

        let index = root.canonicalize().unwrap().join("index.html");
        assert_eq!(resolve_request(&root, "/", "index.html").await, Some(index.clone()));
        assert_eq!(resolve_request(&root, "//index.html", "index.html").await, Some(index));
    }

    #[tokio::test]
    async fn test_resolve_decodes_segments() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("fonts")).unwrap();
        std::fs::write(dir.path().join("my file.css"), "body {}").unwrap();
        std::fs::write(dir.path().join("fonts/Open Sans.woff2"), "font").unwrap();
        std::fs::write(dir.path().join("caf\u{e9}.js"), "1").unwrap();
        let root = dir.path().canonicalize().unwrap();

        assert_eq!(
            resolve_request(dir.path(), "/my%20file.css", "index.html").await,
            Some(root.join("my file.css"))
        );
        assert_eq!(
            resolve_request(dir.path(), "/fonts/Open%20Sans.woff2", "index.html").await,
            Some(root.join("fonts/Open Sans.woff2"))
        );
        assert_eq!(
            resolve_request(dir.path(), "/caf%C3%A9.js", "index.html").await,
            Some(root.join("caf\u{e9}.js"))
        );
        // Invalid UTF-8 after decoding
        assert!(resolve_request(dir.path(), "/%FF.js", "index.html").await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_rejects_symlink_escape() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dist");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(dir.path().join("secret.txt"), "nope").unwrap();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), root.join("link.txt")).unwrap();

        assert!(resolve_request(&root, "/link.txt", "index.html").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_directories_are_not_served() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("assets")).unwrap();
        assert!(resolve_request(dir.path(), "/assets", "index.html").await.is_none());
        assert!(resolve_request(dir.path(), "/missing.js", "index.html").await.is_none());
    }

    #[tokio::test]
    async fn test_static_rejects_other_methods() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let state = ServerState {
            root: dir.path().to_path_buf(),
            default_document: "index.html".to_string(),
            live_reload: false,
            clients: ClientRegistrar::new(tx),
            status: std::sync::Arc::new(crate::dev::StatusBoard::new()),
        };

        let uri: Uri = "/index.html".parse().unwrap();
        let response = handle_static(State(state.clone()), Method::POST, uri.clone()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");

        let response = handle_static(State(state), Method::GET, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reload_script_is_embedded() {
        let response = handle_reload_script().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript"
        );
    }
}
