//! Documentation server.
//!
//! Serves the rendered output under `[serve.prefix]` with conditional
//! caching, built on `tiny_http`:
//!
//! - `GET {prefix}` and directories resolve to `index.html`
//! - `Last-Modified` from the file mtime, `ETag` from a blake3 hash
//! - `304 Not Modified` for matching `If-None-Match` / `If-Modified-Since`
//! - Ctrl+C unblocks the request loop

use crate::{config::DocConfig, debug, log};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// Format of `Last-Modified` and `If-Modified-Since` values.
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Start the server and block until Ctrl+C.
pub fn serve(config: &DocConfig) -> Result<()> {
    let interface: IpAddr = config
        .serve
        .interface
        .parse()
        .with_context(|| format!("Invalid [serve.interface]: {}", config.serve.interface))?;
    let root = &config.build.output;
    if !root.is_dir() {
        log!("serve"; "{} does not exist yet, every page will be 404", root.display());
    }

    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    let prefix = config.serve.prefix.trim_end_matches('/');
    log!("serve"; "http://{}{}", addr, if prefix.is_empty() { "/" } else { prefix });

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, root, prefix, config.serve.max_age) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        max_retries,
        base_port,
        base_port.saturating_add(max_retries.saturating_sub(1)),
        last_error.map_or_else(|| "no attempt made".to_owned(), |e| e.to_string())
    ))
}

// ============================================================================
// Request Handling
// ============================================================================

fn handle_request(request: Request, root: &Path, prefix: &str, max_age: u32) -> Result<()> {
    let Some(path) = resolve_path(root, prefix, request.url()) else {
        debug!("serve"; "404 {}", request.url());
        return request
            .respond(Response::from_string("404 Not Found").with_status_code(StatusCode(404)))
            .context("Failed to send response");
    };

    let content = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let modified = fs::metadata(&path)
        .and_then(|meta| meta.modified())
        .unwrap_or_else(|_| SystemTime::now());
    let validators = Validators::new(&content, modified);

    let headers = [
        header("Last-Modified", &validators.last_modified_header())?,
        header("ETag", &validators.etag)?,
        header("Cache-Control", &format!("must-revalidate, max-age={max_age}"))?,
    ];

    let if_none_match = request_header(&request, "If-None-Match");
    let if_modified_since = request_header(&request, "If-Modified-Since");
    if validators.is_fresh(if_none_match.as_deref(), if_modified_since.as_deref()) {
        let mut response = Response::empty(StatusCode(304));
        for h in headers {
            response.add_header(h);
        }
        return request.respond(response).context("Failed to send response");
    }

    let mut response =
        Response::from_data(content).with_header(header("Content-Type", guess_content_type(&path))?);
    for h in headers {
        response.add_header(h);
    }
    request.respond(response).context("Failed to send response")
}

/// Map a request URL to a file under `root`, `None` for a 404.
///
/// The URL must be `prefix` itself or lie below it; `..` segments are
/// rejected. Directories resolve to their `index.html`.
fn resolve_path(root: &Path, prefix: &str, url: &str) -> Option<PathBuf> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = urlencoding::decode(path).ok()?;

    let rest = path.strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }

    let relative = Path::new(rest.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let mut local = root.join(relative);
    if local.is_dir() {
        local.push("index.html");
    }
    local.is_file().then_some(local)
}

fn request_header(request: &Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_owned())
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("Invalid header {name}: {value}"))
}

// ============================================================================
// Conditional Requests
// ============================================================================

/// Cache validators of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Validators {
    /// Quoted blake3 hex digest of the content.
    etag: String,
    last_modified: DateTime<Utc>,
}

impl Validators {
    fn new(content: &[u8], modified: SystemTime) -> Self {
        Self {
            etag: format!("\"{}\"", blake3::hash(content).to_hex()),
            last_modified: DateTime::<Utc>::from(modified),
        }
    }

    fn last_modified_header(&self) -> String {
        self.last_modified.format(HTTP_DATE).to_string()
    }

    /// Whether the client copy is current. `If-None-Match` wins when both
    /// headers are sent.
    fn is_fresh(&self, if_none_match: Option<&str>, if_modified_since: Option<&str>) -> bool {
        if let Some(tags) = if_none_match {
            return tags
                .split(',')
                .map(str::trim)
                .any(|tag| tag == "*" || tag.trim_start_matches("W/") == self.etag);
        }
        let Some(since) = if_modified_since else {
            return false;
        };
        // HTTP dates have second precision
        DateTime::parse_from_rfc2822(since.trim())
            .is_ok_and(|since| since.timestamp() >= self.last_modified.timestamp())
    }
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",

        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",

        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("eot") => "application/vnd.ms-fontobject",

        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
