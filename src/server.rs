//! HTTP transport.
//!
//! Owns the listening socket and hands buffered requests to the
//! dispatcher. Each connection runs on its own task; requests share
//! nothing but the read-only filesystem.

use crate::handler::Dispatcher;
use anyhow::Context;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

/// The listening HTTP server.
pub struct MockServer {
    dispatcher: Arc<Dispatcher>,
}

impl MockServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Bind the listener and serve until Ctrl-C.
    pub async fn run(&self, port: u16) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind {addr}"))?;

        info!("* Listening on tcp://{addr}");
        info!("Use Ctrl-C to stop");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _peer)) => {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            tokio::spawn(async move {
                                serve_connection(stream, dispatcher).await;
                            });
                        }
                        Err(err) => {
                            error!(error = %err, "Failed to accept connection");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req: Request<Incoming>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { handle(req, dispatcher).await }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        error!(error = %err, "Connection error");
    }
}

/// Buffer the request body, then dispatch. Dropped connections simply
/// abandon their in-flight dispatch.
async fn handle(
    req: Request<Incoming>,
    dispatcher: Arc<Dispatcher>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(dispatcher.dispatch(Request::from_parts(parts, body)).await)
}
