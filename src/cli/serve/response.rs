//! HTTP response handlers.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::embed::serve::{LIVERELOAD_JS, LivereloadVars, script_tag};
use crate::utils::html::{escape, inject_before_body_close};
use crate::utils::mime::{self, types};

/// Inject the reload client into HTML bodies.
pub fn maybe_inject_reload(body: Vec<u8>, content_type: &str) -> Vec<u8> {
    if mime::is_html(content_type) {
        inject_before_body_close(&body, &script_tag())
    } else {
        body
    }
}

/// Respond with a file from the destination root.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type);
    }

    if let Some(range) = get_range_header(&request) {
        return respond_range(request, path, content_type, &range);
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let body = maybe_inject_reload(body, content_type);
    send_body(request, 200, content_type, body)
}

/// Stream a byte range (video seeking).
fn respond_range(
    request: Request,
    path: &Path,
    content_type: &'static str,
    range: &str,
) -> Result<()> {
    use std::io::{Read, Seek, SeekFrom};

    let file_size = fs::metadata(path)?.len();
    if file_size == 0 {
        return send_body(request, 200, content_type, Vec::new());
    }

    let range = range.strip_prefix("bytes=").unwrap_or(range);
    let (start, end) = parse_range(range, file_size);
    let length = end - start + 1;

    let mut file = fs::File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let reader = file.take(length);

    let mut headers = vec![
        make_header("Content-Type", content_type),
        make_header("Accept-Ranges", "bytes"),
    ];
    headers.extend(owned_header(
        "Content-Range",
        &format!("bytes {start}-{end}/{file_size}"),
    ));
    let response = Response::new(
        StatusCode(206),
        headers,
        reader,
        usize::try_from(length).ok(),
        None,
    );

    request.respond(response)?;
    Ok(())
}

/// Parse `start-end`, `start-` or `-suffix` into inclusive bounds.
/// `file_size` must be non-zero.
fn parse_range(range: &str, file_size: u64) -> (u64, u64) {
    let last = file_size - 1;
    let (start, end) = match range.trim().split_once('-') {
        Some((s, e)) if !s.is_empty() && !e.is_empty() => {
            let start = s.trim().parse().unwrap_or(0);
            let end: u64 = e.trim().parse().unwrap_or(last);
            (start, end.min(last))
        }
        Some((s, "")) if !s.is_empty() => (s.trim().parse().unwrap_or(0), last),
        Some(("", e)) if !e.is_empty() => {
            let suffix: u64 = e.trim().parse().unwrap_or(0);
            (file_size.saturating_sub(suffix), last)
        }
        _ => (0, last),
    };
    (start.min(end), end)
}

fn get_range_header(request: &Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Range"))
        .map(|h| h.value.to_string())
}

/// Respond with `404.html` from the destination root, or plain text.
pub fn respond_not_found(request: Request, dist: &Path) -> Result<()> {
    let custom_404 = dist.join("404.html");
    let has_custom = custom_404.is_file();

    if is_head_request(&request) {
        let mime = if has_custom { types::HTML } else { types::PLAIN };
        return send_head(request, 404, mime);
    }

    if has_custom && let Ok(body) = fs::read(&custom_404) {
        let body = maybe_inject_reload(body, types::HTML);
        return send_body(request, 404, types::HTML, body);
    }

    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, types::PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with 502 naming why the proxy target failed.
pub fn respond_bad_gateway(request: Request, target: &str, cause: &str) -> Result<()> {
    let page = format!(
        "<!DOCTYPE html><html><head><title>502 Bad Gateway</title></head>\
         <body><h1>502 Bad Gateway</h1><pre>{}: {}</pre></body></html>",
        escape(target),
        escape(cause)
    );
    // The reload client brings the page back once the target is up again.
    let body = maybe_inject_reload(page.into_bytes(), types::HTML);
    send_body(request, 502, types::HTML, body)
}

/// Respond with the reload client from memory.
pub fn respond_livereload_js(request: Request, ws_port: u16) -> Result<()> {
    let body = LIVERELOAD_JS.render(&LivereloadVars { ws_port });
    send_body(request, 200, types::JAVASCRIPT, body.into_bytes())
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(request: Request, status: u16, content_type: &'static str) -> Result<()> {
    let response =
        Response::empty(StatusCode(status)).with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type))
        .with_header(make_header("Cache-Control", "no-store"));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}

/// Header from runtime text, `None` when it is not valid ASCII.
pub fn owned_header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_only_html() {
        let html = maybe_inject_reload(b"<html><body></body></html>".to_vec(), types::HTML);
        let html = String::from_utf8(html).unwrap();
        assert!(html.contains(&format!("{}</body>", script_tag())));

        let css = maybe_inject_reload(b"a{}".to_vec(), types::CSS);
        assert_eq!(css, b"a{}");
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0-499", 1000), (0, 499));
        assert_eq!(parse_range("500-", 1000), (500, 999));
        assert_eq!(parse_range("-100", 1000), (900, 999));
        assert_eq!(parse_range("0-5000", 1000), (0, 999));
        assert_eq!(parse_range("junk", 1000), (0, 999));
    }

    #[test]
    fn test_owned_header() {
        let header = owned_header("Content-Range", "bytes 0-1/2").unwrap();
        assert!(header.field.equiv("content-range"));
        assert!(owned_header("X-Name", "caf\u{e9}").is_none());
    }
}
