use crate::{
    errors::Error,
    http::{request::Request, response::Response},
    limits::{ConnLimits, ReqLimits, ServerLimits},
    log::{AccessLog, ErrorLog, Logs},
    server::connection::HttpConnection,
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{
    future::{self, Future},
    io,
    net::{SocketAddr, ToSocketAddrs},
    sync::Arc,
};
use tokio::{net::TcpListener, time::sleep};

/// Turns a [`Request`] into a [`Response`].
///
/// Handlers are synchronous. The server runs each call on Tokio's blocking
/// thread pool, so a slow handler (file I/O, a database call) doesn't stall
/// other connections. A handler that panics produces
/// `500 Internal Server Error`.
///
/// Any `Fn(&Request) -> Response` closure or function is a handler.
///
/// # Examples
///
/// ```
/// use plain_http::{Handler, Request, Response};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Counter(AtomicUsize);
///
/// impl Handler for Counter {
///     fn handle(&self, _: &Request) -> Response {
///         let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
///         Response::text(format!("request #{n}"))
///     }
/// }
///
/// fn echo_path(req: &Request) -> Response {
///     Response::text(req.path())
/// }
///
/// fn assert_handler<H: Handler>(_: H) {}
/// assert_handler(Counter(AtomicUsize::new(0)));
/// assert_handler(echo_path);
/// assert_handler(|req: &Request| Response::html(format!("<p>{}</p>", req.path())));
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Response + Send + Sync + 'static,
{
    #[inline]
    fn handle(&self, request: &Request) -> Response {
        self(request)
    }
}

/// An HTTP/1.0 server: one request per connection, one task per connection.
///
/// # Examples
///
/// ```no_run
/// use plain_http::{Muxer, Request, Response, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), plain_http::Error> {
///     let mux = Muxer::new();
///     mux.set_handler("/hello", |_: &Request| Response::text("Hello world!"));
///
///     Server::builder()
///         .bind("127.0.0.1:8080")
///         .handler(mux)
///         .build()?
///         .launch()
///         .await
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    connection: Arc<HttpConnection>,
    logs: Logs,
    server_limits: ServerLimits,
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            listener: None,
            bind_addr: None,
            handler: None,
            logs: Logs::default(),

            server_limits: None,
            connection_limits: None,
            request_limits: None,
        }
    }

    /// Address the server listens on.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the listener fails.
    ///
    /// Each connection is served on its own task. Accept errors are reported
    /// to the error log. Errors that leave the listener unusable (`EBADF`,
    /// `EINVAL`, `ENOTSOCK`) are returned; after any other one (aborted
    /// handshakes, running out of file descriptors or buffers) the loop
    /// pauses for [`accept_backoff`](ServerLimits::accept_backoff) and
    /// carries on.
    #[inline]
    pub async fn launch(self) -> Result<(), Error> {
        self.launch_with_shutdown(future::pending()).await
    }

    /// Like [`launch`](Self::launch), but also stops once `signal` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use plain_http::{Request, Response, Server};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), plain_http::Error> {
    /// let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    ///
    /// let server = Server::builder()
    ///     .bind("127.0.0.1:0")
    ///     .handler(|_: &Request| Response::text("bye"))
    ///     .build()?;
    ///
    /// let task = tokio::spawn(server.launch_with_shutdown(async {
    ///     let _ = stopped.await;
    /// }));
    ///
    /// stop.send(()).unwrap();
    /// task.await.unwrap()?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn launch_with_shutdown<F>(self, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => return Ok(()),
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let connection = self.connection.clone();
                        tokio::spawn(async move { connection.run(stream, remote_addr).await });
                    }
                    Err(err) => self.accept_failed(err).await?,
                },
            }
        }
    }

    /// Accepts a single connection and serves it before returning.
    pub async fn accept_one(&self) -> Result<(), Error> {
        let (stream, remote_addr) = self.listener.accept().await?;
        self.connection.run(stream, remote_addr).await;
        Ok(())
    }

    async fn accept_failed(&self, err: io::Error) -> Result<(), Error> {
        let fatal = is_listener_error(&err);

        let err = Error::Io(err);
        self.logs.error(None, &err);

        match fatal {
            true => Err(err),
            false => {
                sleep(self.server_limits.accept_backoff).await;
                Ok(())
            }
        }
    }
}

#[cfg(unix)]
mod errno {
    pub(super) const EBADF: i32 = 9;
    pub(super) const EINVAL: i32 = 22;
    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub(super) const ENOTSOCK: i32 = 88;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub(super) const ENOTSOCK: i32 = 38;
}

#[cfg(windows)]
mod errno {
    pub(super) const EBADF: i32 = 10009; // WSAEBADF
    pub(super) const EINVAL: i32 = 10022; // WSAEINVAL
    pub(super) const ENOTSOCK: i32 = 10038; // WSAENOTSOCK
}

// Accept errors that say the listening socket itself is broken.
fn is_listener_error(err: &io::Error) -> bool {
    #[cfg(any(unix, windows))]
    if let Some(code) = err.raw_os_error() {
        return [errno::EBADF, errno::EINVAL, errno::ENOTSOCK].contains(&code);
    }

    err.kind() == io::ErrorKind::InvalidInput
}

/// Builder for configuring and creating [`Server`] instances.
pub struct ServerBuilder {
    listener: Option<TcpListener>,
    bind_addr: Option<io::Result<SocketAddr>>,
    handler: Option<Arc<dyn Handler>>,
    logs: Logs,

    server_limits: Option<ServerLimits>,
    connection_limits: Option<ConnLimits>,
    request_limits: Option<ReqLimits>,
}

impl ServerBuilder {
    /// Uses an already bound listener. Takes precedence over [`bind`](Self::bind).
    ///
    /// ```no_run
    /// # use plain_http::{Request, Response, Server};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), plain_http::Error> {
    /// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    ///
    /// let server = Server::builder()
    ///     .listener(listener)
    ///     .handler(|_: &Request| Response::text("hi"))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[inline(always)]
    pub fn listener(mut self, listener: TcpListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Binds to `addr` when [`build`](Self::build) is called.
    ///
    /// The first address `addr` resolves to is used; the socket is set up
    /// according to [`ServerLimits`].
    #[inline]
    pub fn bind<A: ToSocketAddrs>(mut self, addr: A) -> Self {
        let resolved = addr.to_socket_addrs().and_then(|mut addrs| {
            addrs.next().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing")
            })
        });

        self.bind_addr = Some(resolved);
        self
    }

    /// Sets the root handler, usually a [`Muxer`](crate::Muxer).
    ///
    /// **This is a required component.**
    #[inline(always)]
    pub fn handler<H: Handler>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Sink called once per answered request.
    #[inline]
    pub fn access_log<L: AccessLog>(mut self, sink: L) -> Self {
        self.logs = self.logs.with_access(Arc::new(sink));
        self
    }

    /// Sink called for every failure.
    #[inline]
    pub fn error_log<L: ErrorLog>(mut self, sink: L) -> Self {
        self.logs = self.logs.with_error(Arc::new(sink));
        self
    }

    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    #[inline(always)]
    pub fn request_limits(mut self, limits: ReqLimits) -> Self {
        self.request_limits = Some(limits);
        self
    }

    /// Finalizes the builder and constructs a [`Server`] instance.
    ///
    /// # Errors
    ///
    /// Resolving or binding the [`bind`](Self::bind) address failed.
    ///
    /// # Panics
    ///
    /// Error messages:
    /// - ``The `listener` or `bind` method must be called to create``
    /// - ``The `handler` method must be called to create``
    ///
    /// Binding also panics outside of a Tokio runtime.
    #[track_caller]
    pub fn build(self) -> Result<Server, Error> {
        let server_limits = self.server_limits.unwrap_or_default();

        let listener = match (self.listener, self.bind_addr) {
            (Some(listener), _) => listener,
            (None, Some(addr)) => bind(addr?, &server_limits)?,
            (None, None) => panic!("The `listener` or `bind` method must be called to create"),
        };

        let handler = self
            .handler
            .expect("The `handler` method must be called to create");

        let connection = HttpConnection::new(
            handler,
            self.logs.clone(),
            self.connection_limits.unwrap_or_default(),
            self.request_limits.unwrap_or_default(),
        );

        Ok(Server {
            listener,
            connection: Arc::new(connection),
            logs: self.logs,
            server_limits,
        })
    }
}

fn bind(addr: SocketAddr, limits: &ServerLimits) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    if limits.reuse_address {
        socket.set_reuse_address(true)?;
    }
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(limits.listen_backlog.min(i32::MAX as u32) as i32)?;

    TcpListener::from_std(socket.into())
}
