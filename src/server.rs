//! HTTP front-end for KPI logs and dashboard assets.
//!
//! Requests are served one at a time on a single background thread; each
//! CSV request maps the log, answers from that snapshot and drops the
//! mapping before the next request is taken.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Route, RouteKind, ServerConfig};
use crate::core::{read_window, Error, LogView, MmapFile, Result, WindowQuery};

/// Headers sent with every response.
const NO_CACHE_HEADERS: [(&str, &str); 3] = [
    ("Cache-Control", "no-store, must-revalidate"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
];

const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// Failure to host the feed.
#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("Could not parse address: {0}")]
    AddrParseFailed(#[from] std::net::AddrParseError),

    #[error("Failed to create server at address {0}: {1}")]
    CreateServerFailed(String, Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Failed to spawn server thread: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

/// A response before it is put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn ok(content_type: &'static str, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn error(status: u16, message: String) -> Self {
        Self {
            status,
            content_type: "text/plain; charset=utf-8",
            body: message.into_bytes(),
        }
    }
}

impl From<Error> for Reply {
    fn from(err: Error) -> Self {
        Reply::error(err.status_code(), err.to_string())
    }
}

/// Socket-free request handling.
pub struct FeedHandler {
    config: ServerConfig,
}

impl FeedHandler {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Answer a GET for `url` (path plus optional query string).
    pub fn handle(&self, url: &str) -> Reply {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let name = path.trim_start_matches('/');

        let Some(route) = self.config.route(name) else {
            warn!("404 path: {path}");
            return Reply::error(404, format!("File not found: {path}"));
        };

        let result = match route.kind {
            RouteKind::Csv => self.serve_csv(route, query),
            RouteKind::Static => serve_static(route),
        };

        match result {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    Error::Io(_) => error!("Failed to serve {}: {err}", route.file.display()),
                    _ => warn!("{name}: {err}"),
                }
                err.into()
            }
        }
    }

    /// Headers added to every response, in order.
    pub fn common_headers(&self) -> Vec<(&'static str, &'static str)> {
        let mut headers = NO_CACHE_HEADERS.to_vec();
        if self.config.cors {
            headers.extend_from_slice(&CORS_HEADERS);
        }
        headers
    }

    fn serve_csv(&self, route: &Route, query: &str) -> Result<Reply> {
        let map = MmapFile::open(&route.file)?;
        let query = WindowQuery::parse(query)?;
        let view = LogView::new(map.as_slice());

        let mut rng = StdRng::seed_from_u64(request_seed(&query, map.len()));
        let (body, stats) = read_window(&view, &query, &self.config.window, &mut rng);
        debug!(
            "{}: start={} scanned={} emitted={} bytes={}",
            route.path,
            stats.start_offset,
            stats.rows_scanned,
            stats.rows_emitted,
            body.len()
        );
        Ok(Reply::ok("text/csv", body))
    }
}

/// Sampling seed for a request: the same query against the same snapshot
/// length always draws the same coins.
fn request_seed(query: &WindowQuery, log_len: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    log_len.hash(&mut hasher);
    hasher.finish()
}

fn serve_static(route: &Route) -> Result<Reply> {
    let body = match std::fs::read(&route.file) {
        Ok(body) => body,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(route.file.display().to_string()));
        }
        Err(err) => return Err(Error::Io(err)),
    };
    debug!("Serving file: {}", route.path);
    Ok(Reply::ok(guess_mime(&route.file), body))
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => "text/csv",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

// ----------------------------------------------------------------------------

/// HTTP host for the configured routes.
#[must_use = "Dropping this means stopping the server"]
pub struct FeedServer {
    inner: Arc<FeedServerInner>,
    thread_handle: Option<std::thread::JoinHandle<()>>,
}

struct FeedServerInner {
    server: tiny_http::Server,
    shutdown: AtomicBool,
    num_served: AtomicU64,
    handler: FeedHandler,
}

impl FeedServer {
    /// Bind and start serving on a background thread.
    ///
    /// Port `0` lets the OS pick a free port; see [`Self::server_url`].
    pub fn new(config: ServerConfig) -> std::result::Result<Self, ServerError> {
        let bind_addr = std::net::SocketAddr::new(config.bind.parse()?, config.port);

        let server = tiny_http::Server::http(bind_addr)
            .map_err(|err| ServerError::CreateServerFailed(bind_addr.to_string(), err))?;

        let inner = Arc::new(FeedServerInner {
            server,
            shutdown: AtomicBool::new(false),
            num_served: AtomicU64::new(0),
            handler: FeedHandler::new(config),
        });

        let url = format_server_url(&inner.server);
        info!("Serving the following routes:");
        for route in &inner.handler.config().routes {
            match route.kind {
                RouteKind::Csv => info!(
                    "    {url}/{}?from=<start_ms>&to=<end_ms>&approx_num_samples=<number_of_rows>&filter=<column1,column2,...>",
                    route.path
                ),
                RouteKind::Static => info!("    {url}/{}", route.path),
            }
        }

        let inner_copy = inner.clone();
        let thread_handle = std::thread::Builder::new()
            .name("kpi_feed_server".to_owned())
            .spawn(move || inner_copy.serve())
            .map_err(ServerError::SpawnFailed)?;

        Ok(Self {
            inner,
            thread_handle: Some(thread_handle),
        })
    }

    /// Includes `http://` prefix
    pub fn server_url(&self) -> String {
        format_server_url(&self.inner.server)
    }

    /// Blocks execution as long as the server is running.
    pub fn block(mut self) {
        if let Some(thread_handle) = self.thread_handle.take() {
            thread_handle.join().ok();
        }
    }
}

impl Drop for FeedServer {
    fn drop(&mut self) {
        if let Some(thread_handle) = self.thread_handle.take() {
            let num_served = self.inner.num_served.load(Ordering::Relaxed);
            debug!("Shutting down feed server after {num_served} request(s)");

            self.inner.shutdown.store(true, Ordering::Release);
            self.inner.server.unblock();
            thread_handle.join().ok();
        }
    }
}

fn format_server_url(server: &tiny_http::Server) -> String {
    match server.server_addr().to_ip() {
        Some(addr) if addr.ip().is_unspecified() => format!("http://127.0.0.1:{}", addr.port()),
        Some(addr) => format!("http://{addr}"),
        None => "http://localhost".to_owned(),
    }
}

impl FeedServerInner {
    fn serve(&self) {
        loop {
            let request = self.server.recv();
            if self.shutdown.load(Ordering::Acquire) {
                return;
            }

            let request = match request {
                Ok(request) => request,
                Err(err) => {
                    error!("Failed to receive http request: {err}");
                    continue;
                }
            };

            if let Err(err) = self.send_response(request) {
                error!("Failed to send http response: {err}");
            }
        }
    }

    fn send_response(&self, request: tiny_http::Request) -> std::result::Result<(), std::io::Error> {
        self.num_served.fetch_add(1, Ordering::Relaxed);

        let reply = match request.method() {
            tiny_http::Method::Get | tiny_http::Method::Head => self.handler.handle(request.url()),
            method => {
                warn!("405 method: {method}");
                Reply::error(405, format!("Method not allowed: {method}"))
            }
        };

        info!("{} {} -> {} ({} bytes)", request.method(), request.url(), reply.status, reply.body.len());

        let mut response = tiny_http::Response::from_data(reply.body)
            .with_status_code(reply.status)
            // Keep an exact Content-Length instead of chunked transfer for large windows.
            .with_chunked_threshold(usize::MAX);
        let headers = std::iter::once(("Content-Type", reply.content_type))
            .chain(self.handler.common_headers());
        for (name, value) in headers {
            if let Ok(header) = tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                response.add_header(header);
            }
        }

        request.respond(response)
    }
}
