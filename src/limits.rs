//! Server configuration limits and timeouts
//!
//! Every struct implements [`Default`]; override single fields with struct
//! update syntax and pass the result to the matching
//! [`ServerBuilder`](crate::ServerBuilder) method.
//!
//! # Examples
//!
//! ```no_run
//! use plain_http::{Response, Server, limits::{ConnLimits, ReqLimits, ServerLimits}};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plain_http::Error> {
//!     Server::builder()
//!         .bind("127.0.0.1:8080")
//!         .handler(|_: &plain_http::Request| Response::text("hi"))
//!         .server_limits(ServerLimits {
//!             listen_backlog: 4096,
//!             ..ServerLimits::default()
//!         })
//!         .connection_limits(ConnLimits {
//!             socket_read_timeout: Some(Duration::from_secs(5)),
//!             ..ConnLimits::default()
//!         })
//!         .request_limits(ReqLimits {
//!             body_size: 1024 * 1024, // 1 MiB uploads
//!             ..ReqLimits::default()
//!         })
//!         .build()?
//!         .launch()
//!         .await
//! }
//! ```

use std::time::Duration;

/// Listener-level settings.
///
/// `listen_backlog` and `reuse_address` only apply when the server binds the
/// socket itself through [`ServerBuilder::bind`](crate::ServerBuilder::bind).
/// A listener passed to [`ServerBuilder::listener`](crate::ServerBuilder::listener)
/// is used as is.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Length of the kernel accept queue (default: `1024`).
    pub listen_backlog: u32,

    /// Sets `SO_REUSEADDR` before binding (default: `true`).
    ///
    /// Lets a restarted server bind while old connections sit in `TIME_WAIT`.
    pub reuse_address: bool,

    /// Pause after a failed accept (default: `10ms`).
    ///
    /// Applies to every accept error that leaves the listener usable, such
    /// as aborted handshakes or file descriptor exhaustion (`EMFILE`/`ENFILE`).
    /// Without a pause, running out of descriptors turns the accept loop into
    /// a busy spin.
    pub accept_backoff: Duration,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            listen_backlog: 1024,
            reuse_address: true,
            accept_backoff: Duration::from_millis(10),

            _priv: (),
        }
    }
}

/// Connection-level timeouts
///
/// Both timeouts are disabled by default: a connection lives until the client
/// sends a full request or closes the socket.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum time to receive the whole request (default: `None`)
    ///
    /// When it expires the client gets `408 Request Timeout` and the
    /// connection is closed.
    pub socket_read_timeout: Option<Duration>,

    /// Maximum time to write the whole response (default: `None`)
    ///
    /// When it expires the connection is dropped and the failure is reported
    /// to the error log.
    pub socket_write_timeout: Option<Duration>,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: None,
            socket_write_timeout: None,

            _priv: (),
        }
    }
}

/// Request parsing limits
///
/// | Field       | Default  | Error when exceeded                              |
/// |-------------|----------|--------------------------------------------------|
/// | `line_size` | `64 KiB` | [`InvalidRequest`](crate::ErrorKind::InvalidRequest) |
/// | `body_size` | `16 MiB` | [`BodyTooLong`](crate::ErrorKind::BodyTooLong)   |
#[derive(Debug, Clone)]
pub struct ReqLimits {
    /// Maximum length of the request line or a header line, terminator excluded.
    pub line_size: usize,

    /// Maximum `Content-Length` accepted for a `POST` body.
    ///
    /// Checked before any body byte is read.
    pub body_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ReqLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            line_size: 64 * 1024,
            body_size: 16 * 1024 * 1024,

            _priv: (),
        }
    }
}
