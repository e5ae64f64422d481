//! Reverse proxy to the `localhost` target.
//!
//! Requests are forwarded with their method, headers and body. Hop-by-hop
//! headers and `Accept-Encoding` are dropped so HTML arrives uncompressed and
//! the reload client can be injected. Redirects are relayed, not followed.

use std::time::Duration;

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tiny_http::{Request, Response, StatusCode};

use super::ServeError;
use super::response::{maybe_inject_reload, owned_header, respond_bad_gateway};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Headers that describe one connection, never forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Request headers dropped on the way to the target.
fn skip_request_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    HOP_BY_HOP.contains(&name.as_str())
        || matches!(name.as_str(), "host" | "accept-encoding" | "content-length")
}

/// Response headers dropped on the way back.
fn skip_response_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    HOP_BY_HOP.contains(&name.as_str()) || name == "content-length"
}

/// Response from the proxy target, fully buffered.
#[derive(Debug)]
pub struct Upstream {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Upstream {
    fn content_type(&self) -> &str {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map_or("", |(_, value)| value.as_str())
    }
}

pub struct Proxy {
    target: String,
    client: Client,
}

impl Proxy {
    pub fn new(target: &str) -> Result<Self, ServeError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServeError::ProxyUnreachable {
                url: target.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            target: target.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Any HTTP answer counts as reachable; only transport failures do not.
    pub fn check_reachable(&self) -> Result<(), ServeError> {
        self.client
            .get(&self.target)
            .timeout(STARTUP_TIMEOUT)
            .send()
            .map(|_| ())
            .map_err(|e| ServeError::ProxyUnreachable {
                url: self.target.clone(),
                message: error_chain(&e),
            })
    }

    /// Forward one request and buffer the answer.
    pub fn fetch(
        &self,
        method: &str,
        path_and_query: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> Result<Upstream, String> {
        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| e.to_string())?;
        let url = format!("{}{}", self.target, path_and_query);

        let mut forwarded = HeaderMap::new();
        for (name, value) in headers {
            if skip_request_header(name) {
                continue;
            }
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                forwarded.append(name, value);
            }
        }

        let response = self
            .client
            .request(method, &url)
            .headers(forwarded)
            .body(body)
            .send()
            .map_err(|e| error_chain(&e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !skip_response_header(name.as_str()))
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let body = response.bytes().map_err(|e| error_chain(&e))?.to_vec();

        Ok(Upstream {
            status,
            headers,
            body,
        })
    }

    /// Relay `request` to the target. Transport failures answer 502.
    pub fn forward(&self, mut request: Request) -> Result<()> {
        let method = request.method().as_str().to_string();
        let url = request.url().to_string();
        let headers: Vec<(String, String)> = request
            .headers()
            .iter()
            .map(|h| (h.field.as_str().as_str().to_string(), h.value.as_str().to_string()))
            .collect();

        let mut body = Vec::new();
        request.as_reader().read_to_end(&mut body)?;

        match self.fetch(&method, &url, &headers, body) {
            Ok(upstream) => {
                crate::debug!("proxy"; "{} {} -> {}", method, url, upstream.status);
                let content_type = upstream.content_type().to_string();
                let body = maybe_inject_reload(upstream.body, &content_type);
                let mut response =
                    Response::from_data(body).with_status_code(StatusCode(upstream.status));
                for (name, value) in &upstream.headers {
                    if let Some(header) = owned_header(name, value) {
                        response.add_header(header);
                    }
                }
                request.respond(response)?;
                Ok(())
            }
            Err(cause) => {
                crate::log!("proxy"; "{} {}: {}", method, url, cause);
                respond_bad_gateway(request, &self.target, &cause)
            }
        }
    }
}

/// Error text including its sources (reqwest keeps the cause there).
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
