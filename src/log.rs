//! Access and error log sinks
//!
//! The server never logs on its own: it calls the sinks passed to
//! [`ServerBuilder::access_log`](crate::ServerBuilder::access_log) and
//! [`ServerBuilder::error_log`](crate::ServerBuilder::error_log). Closures
//! work as sinks, and [`TracingLog`] forwards both kinds of events to
//! [`tracing`].
//!
//! # Examples
//! ```no_run
//! use plain_http::{log::TracingLog, Request, Response, Server};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), plain_http::Error> {
//! Server::builder()
//!     .bind("127.0.0.1:8080")
//!     .handler(|_: &Request| Response::text("ok"))
//!     .access_log(|req: &Request, resp: &Response| {
//!         println!("{} {} -> {}", req.method(), req.path(), resp.code().as_u16())
//!     })
//!     .error_log(TracingLog)
//!     .build()?
//!     .launch()
//!     .await
//! # }
//! ```

use crate::{Error, Request, Response};
use std::{net::SocketAddr, sync::Arc};

/// Receives one event per answered request.
pub trait AccessLog: Send + Sync + 'static {
    fn log_access(&self, request: &Request, response: &Response);
}

/// Receives failures: unparseable requests, I/O errors, handler panics and
/// accept errors. `peer` is `None` when no connection was established.
pub trait ErrorLog: Send + Sync + 'static {
    fn log_error(&self, peer: Option<SocketAddr>, error: &Error);
}

impl<F> AccessLog for F
where
    F: Fn(&Request, &Response) + Send + Sync + 'static,
{
    #[inline]
    fn log_access(&self, request: &Request, response: &Response) {
        self(request, response)
    }
}

impl<F> ErrorLog for F
where
    F: Fn(Option<SocketAddr>, &Error) + Send + Sync + 'static,
{
    #[inline]
    fn log_error(&self, peer: Option<SocketAddr>, error: &Error) {
        self(peer, error)
    }
}

/// Forwards log events to [`tracing`].
///
/// Access events go to target `plain_http::access` at `INFO`, formatted as
/// `<remote> - <METHOD> <path> - <code>`. Errors go to `plain_http::error`:
/// client errors (4xx) at `WARN`, everything else at `ERROR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl AccessLog for TracingLog {
    fn log_access(&self, request: &Request, response: &Response) {
        tracing::info!(
            target: "plain_http::access",
            remote = %request.remote_addr(),
            method = %request.method(),
            path = request.path(),
            code = response.code().as_u16(),
            "{} - {} {} - {}",
            request.remote_addr(),
            request.method(),
            request.path(),
            response.code().as_u16(),
        );
    }
}

impl ErrorLog for TracingLog {
    fn log_error(&self, peer: Option<SocketAddr>, error: &Error) {
        let peer = peer.map(|addr| addr.to_string());
        let peer = peer.as_deref().unwrap_or("-");

        if error.status().as_u16() < 500 {
            tracing::warn!(target: "plain_http::error", peer, "{peer} - {error}");
        } else {
            tracing::error!(target: "plain_http::error", peer, "{peer} - {error}");
        }
    }
}

/// Sinks shared by every connection of one server.
#[derive(Clone, Default)]
pub(crate) struct Logs {
    access: Option<Arc<dyn AccessLog>>,
    error: Option<Arc<dyn ErrorLog>>,
}

impl Logs {
    pub(crate) fn with_access(mut self, sink: Arc<dyn AccessLog>) -> Self {
        self.access = Some(sink);
        self
    }

    pub(crate) fn with_error(mut self, sink: Arc<dyn ErrorLog>) -> Self {
        self.error = Some(sink);
        self
    }

    #[inline]
    pub(crate) fn access(&self, request: &Request, response: &Response) {
        if let Some(sink) = &self.access {
            sink.log_access(request, response);
        }
    }

    #[inline]
    pub(crate) fn error(&self, peer: Option<SocketAddr>, error: &Error) {
        if let Some(sink) = &self.error {
            sink.log_error(peer, error);
        }
    }
}
