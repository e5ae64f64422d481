//! Development server with live reload support.
//!
//! Serves the destination root, or forwards every request to the `localhost`
//! proxy target. HTML responses get the reload client injected either way.

mod lifecycle;
mod path;
mod proxy;
mod response;

use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use anyhow::Result;
use crossbeam::channel;
use thiserror::Error;
use tiny_http::{Request, Server};

use crate::config::ProjectConfig;
use crate::embed::serve::LIVERELOAD_URL;
use crate::{debug, log};

use proxy::Proxy;

/// Dev server startup errors. Both are fatal for the `default` command.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("cannot bind {addr}: {message}")]
    Bind { addr: SocketAddr, message: String },

    #[error("proxy target {url} is unreachable: {message}")]
    ProxyUnreachable { url: String, message: String },
}

/// Bound server ready to accept requests
pub struct DevServer {
    server: Arc<Server>,
    ws_listener: TcpListener,
    ws_port: u16,
    proxy: Option<Arc<Proxy>>,
    shutdown_rx: channel::Receiver<()>,
}

impl DevServer {
    /// Bind the HTTP and reload ports and check the proxy target.
    ///
    /// Nothing is built yet, so a port conflict fails before any work.
    /// Without `proxy_target` the destination root is served.
    pub fn start(config: &ProjectConfig, proxy_target: Option<&str>) -> Result<Self, ServeError> {
        let serve = &config.serve;
        let (server, addr) = lifecycle::bind_http(serve.interface, serve.port)?;
        let ws_listener = lifecycle::bind_ws(serve.interface, serve.ws_port)?;

        let proxy = match proxy_target {
            Some(target) => {
                let proxy = Proxy::new(target)?;
                proxy.check_reachable()?;
                Some(Arc::new(proxy))
            }
            None => None,
        };

        let server = Arc::new(server);
        let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
        crate::core::register_server(Arc::clone(&server), shutdown_tx);

        log!("serve"; "http://{}", addr);
        if let Some(proxy) = &proxy {
            log!("proxy"; "forwarding to {}", proxy.target());
        }
        debug!("reload"; "ws://{}:{}", serve.interface, serve.ws_port);

        Ok(Self {
            server,
            ws_listener,
            ws_port: serve.ws_port,
            proxy,
            shutdown_rx,
        })
    }

    /// Start watching and serve until Ctrl+C (blocking).
    pub fn run(self, config: Arc<ProjectConfig>) -> Result<()> {
        let actor_handle =
            lifecycle::spawn_actors(Arc::clone(&config), self.ws_listener, self.shutdown_rx);

        let context = Arc::new(RequestContext {
            config,
            proxy: self.proxy,
            ws_port: self.ws_port,
        });
        lifecycle::run_request_loop(&self.server, context)?;
        lifecycle::wait_for_shutdown(actor_handle);
        Ok(())
    }
}

/// Everything a request handler needs.
struct RequestContext {
    config: Arc<ProjectConfig>,
    proxy: Option<Arc<Proxy>>,
    ws_port: u16,
}

/// Handle a single HTTP request
fn handle_request(request: Request, ctx: &RequestContext) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    // The reload client is served locally even in proxy mode.
    let url_path = request.url().split(['?', '#']).next().unwrap_or_default();
    if url_path == LIVERELOAD_URL {
        return response::respond_livereload_js(request, ctx.ws_port);
    }

    if let Some(proxy) = &ctx.proxy {
        return proxy.forward(request);
    }

    let dist = ctx.config.dist();
    match path::resolve_path(request.url(), dist) {
        Some(path) => response::respond_file(request, &path),
        None => response::respond_not_found(request, dist),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_project_config;
    use std::fs;
    use tempfile::TempDir;

    /// Run `handle_request` on an ephemeral port; returns the base URL.
    fn serve(ctx: RequestContext) -> String {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let ctx = Arc::new(ctx);
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let _ = handle_request(request, &ctx);
            }
        });
        format!("http://{addr}")
    }

    fn context(dir: &TempDir, proxy: Option<&str>) -> RequestContext {
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        RequestContext {
            config: Arc::new(test_project_config(dir.path(), "")),
            proxy: proxy.map(|target| Arc::new(Proxy::new(target).unwrap())),
            ws_port: 35729,
        }
    }

    /// Upstream answering every request with one HTML page.
    fn html_upstream() -> String {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let page = "<html><body>upstream</body></html>";
                let header =
                    tiny_http::Header::from_bytes("Content-Type", "text/html; charset=utf-8")
                        .unwrap();
                let response = tiny_http::Response::from_string(page).with_header(header);
                let _ = request.respond(response);
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_static_html_gets_reload_client() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, None);
        fs::write(dir.path().join("dist/index.html"), "<html><body>hi</body></html>").unwrap();
        let url = serve(ctx);

        let body = reqwest::blocking::get(format!("{url}/")).unwrap().text().unwrap();
        let script = body.find(LIVERELOAD_URL).unwrap();
        assert!(script < body.find("</body>").unwrap());
    }

    #[test]
    fn test_static_css_untouched() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir, None);
        fs::create_dir_all(dir.path().join("dist/css")).unwrap();
        fs::write(dir.path().join("dist/css/a.css"), "a{color:red}").unwrap();
        let url = serve(ctx);

        let body = reqwest::blocking::get(format!("{url}/css/a.css")).unwrap().text().unwrap();
        assert_eq!(body, "a{color:red}");
    }

    #[test]
    fn test_missing_file_is_404() {
        let dir = TempDir::new().unwrap();
        let url = serve(context(&dir, None));

        let response = reqwest::blocking::get(format!("{url}/nope.html")).unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    #[test]
    fn test_livereload_client_ignores_query() {
        let dir = TempDir::new().unwrap();
        let url = serve(context(&dir, None));

        let response = reqwest::blocking::get(format!("{url}{LIVERELOAD_URL}?t=1")).unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert!(response.text().unwrap().contains("35729"));
    }

    #[test]
    fn test_proxy_mode_injects_into_upstream_html() {
        let dir = TempDir::new().unwrap();
        let upstream = html_upstream();
        let url = serve(context(&dir, Some(&upstream)));

        let body = reqwest::blocking::get(format!("{url}/any/page")).unwrap().text().unwrap();
        assert!(body.contains("upstream"));
        assert!(body.contains(LIVERELOAD_URL));
    }

    #[test]
    fn test_proxy_unreachable_is_bad_gateway() {
        let dir = TempDir::new().unwrap();
        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let target = format!("http://{}", closed.local_addr().unwrap());
        drop(closed);
        let url = serve(context(&dir, Some(&target)));

        let response = reqwest::blocking::get(format!("{url}/")).unwrap();
        assert_eq!(response.status().as_u16(), 502);
        assert!(response.text().unwrap().contains(&target));
    }
}
