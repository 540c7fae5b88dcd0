//! Request dispatch.
//!
//! The per-request pipeline: load configuration, match a stub, rewrite and
//! delegate to static serving, or fall back to the about endpoint / 404.
//! Configuration is read fresh for every request and passed down as a
//! value; nothing is cached or shared across requests.

use crate::config::{Config, Stub};
use crate::matcher::StubMatcher;
use crate::static_files::StaticFiles;
use async_trait::async_trait;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use hyper::{Method, Request, Response, StatusCode};
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

pub const APP_NAME: &str = "Jessica Mock Tool";
pub const APP_CODENAME: &str = "Llamas in Pajamas";
pub const APP_COPYRIGHT: &str = "Copyright (c) 2019 iDesoft Systems. All Rights Reserved.";

/// Handler consulted when no stub matches a request.
#[async_trait]
pub trait FallbackHandler: Send + Sync {
    /// Produce a response for the request, or `None` to decline it.
    async fn handle(&self, method: &Method, path: &str) -> Option<Response<Full<Bytes>>>;
}

/// The about endpoint: answers `GET /jessica` with the application identity.
pub struct AboutHandler;

#[async_trait]
impl FallbackHandler for AboutHandler {
    async fn handle(&self, method: &Method, path: &str) -> Option<Response<Full<Bytes>>> {
        if method != Method::GET || path != "/jessica" {
            return None;
        }
        let payload = json!({
            "name": APP_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "codename": APP_CODENAME,
            "copyright": APP_COPYRIGHT,
        });
        Some(json_response(StatusCode::OK, &payload))
    }
}

/// Orchestrates one request from configuration load to response.
pub struct Dispatcher {
    config_path: PathBuf,
    assets: StaticFiles,
    matcher: StubMatcher,
    fallback: Option<Box<dyn FallbackHandler>>,
}

impl Dispatcher {
    /// Dispatcher with the about endpoint registered as fallback.
    pub fn new(config_path: impl Into<PathBuf>, static_root: impl Into<PathBuf>) -> Self {
        let static_root = static_root.into();
        Self {
            config_path: config_path.into(),
            assets: StaticFiles::new(static_root.clone()),
            matcher: StubMatcher::new(static_root),
            fallback: Some(Box::new(AboutHandler)),
        }
    }

    /// Replace (or remove) the fallback handler.
    pub fn with_fallback(mut self, fallback: Option<Box<dyn FallbackHandler>>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Handle one buffered request end to end.
    ///
    /// Configuration errors are terminal for the request, never the
    /// process: they come back as the JSON `{"message": ...}` envelope with
    /// HTTP 200, matching the long-observed behavior of this tool.
    pub async fn dispatch(&self, req: Request<Bytes>) -> Response<Full<Bytes>> {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        info!(method = %method, path = %path, "Started request");

        let config = match Config::from_file(&self.config_path) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "ConfigurationError");
                return message_response(format!("ConfigurationError: {err}"));
            }
        };

        let mut response = if method == Method::OPTIONS {
            preflight_response(&config)
        } else {
            self.route(&config, &method, &path, req.body()).await
        };
        apply_cors_headers(&config, &mut response);

        info!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completed request"
        );
        response
    }

    async fn route(
        &self,
        config: &Config,
        method: &Method,
        path: &str,
        body: &Bytes,
    ) -> Response<Full<Bytes>> {
        match self
            .matcher
            .find_match(&config.stubs, method.as_str(), path, body)
        {
            Some(stub) => self.serve_stub(stub, path).await,
            None => {
                warn!(method = %method, path = %path, "No stub matches request");
                if let Some(fallback) = &self.fallback {
                    if let Some(response) = fallback.handle(method, path).await {
                        return response;
                    }
                }
                not_found_response()
            }
        }
    }

    /// Serve a matched stub: resolve the effective asset path, then apply
    /// the stub's status and content-type directives around static serving.
    async fn serve_stub(&self, stub: &Stub, request_path: &str) -> Response<Full<Bytes>> {
        let effective = resolve_effective_path(request_path, stub);
        info!(asset = %effective, "Processing by static asset");

        match self.assets.load(effective).await {
            Ok((bytes, detected)) => {
                let mut builder = Response::builder().status(stub.response.effective_status());
                if let Some(override_type) = stub.response.content_type_override() {
                    // Appended, not overwritten: the detected type follows.
                    builder = builder.header(CONTENT_TYPE, override_type);
                }
                builder = builder.header(CONTENT_TYPE, detected);
                match builder.body(Full::new(Bytes::from(bytes))) {
                    Ok(response) => response,
                    Err(err) => {
                        warn!(error = %err, "Invalid response directive on stub");
                        not_found_response()
                    }
                }
            }
            Err(err) => {
                warn!(asset = %effective, error = %err, "Static asset unavailable");
                not_found_response()
            }
        }
    }
}

/// The path ultimately used to resolve a static asset: the stub's asset
/// path when set, otherwise the original request path.
pub fn resolve_effective_path<'a>(original_path: &'a str, stub: &'a Stub) -> &'a str {
    stub.response
        .asset_path_override()
        .unwrap_or(original_path)
}

/// Fixed pass-through CORS policy, sourced from configuration fields.
fn apply_cors_headers(config: &Config, response: &mut Response<Full<Bytes>>) {
    let headers = response.headers_mut();
    if let Ok(origin) = HeaderValue::from_str(&config.allowed_origins) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}

/// OPTIONS preflight: advertise the configured methods and headers and
/// short-circuit the underlying handler.
fn preflight_response(config: &Config) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    if let Ok(methods) = HeaderValue::from_str(&config.allowed_methods) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    if let Ok(allowed) = HeaderValue::from_str(&config.allowed_headers) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed);
    }
    response
}

fn json_response(status: StatusCode, payload: &serde_json::Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(payload.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// The `{"message": ...}` envelope used for configuration errors.
fn message_response(message: String) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &json!({ "message": message }))
}

fn not_found_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(b"Page Not Found")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
