use crate::{
    errors::Error,
    http::{request::Request, response::Response},
    limits::{ConnLimits, ReqLimits},
    log::Logs,
    Handler,
};
use std::{any::Any, net::SocketAddr, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    task::{self, JoinError},
    time::timeout,
};

/// Everything a connection task needs; shared by all tasks of one server.
pub(crate) struct HttpConnection {
    handler: Arc<dyn Handler>,
    logs: Logs,

    conn_limits: ConnLimits,
    req_limits: ReqLimits,
}

impl HttpConnection {
    #[inline]
    pub(crate) fn new(
        handler: Arc<dyn Handler>,
        logs: Logs,
        conn_limits: ConnLimits,
        req_limits: ReqLimits,
    ) -> Self {
        Self {
            handler,
            logs,
            conn_limits,
            req_limits,
        }
    }

    /// Runs one request/response exchange on `stream` and closes it.
    pub(crate) async fn run(&self, mut stream: TcpStream, remote_addr: SocketAddr) {
        let local_addr = match stream.local_addr() {
            Ok(addr) => addr,
            Err(err) => return self.logs.error(Some(remote_addr), &err.into()),
        };

        self.exchange(&mut stream, local_addr, remote_addr).await;

        // The peer may already be gone; nothing left to report.
        let _ = stream.shutdown().await;
    }

    pub(crate) async fn exchange<S>(
        &self,
        stream: &mut S,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = match self.read_request(&mut *stream, local_addr, remote_addr).await {
            Ok(request) => Arc::new(request),
            Err(err) => return self.fail(stream, remote_addr, err, true).await,
        };
        let include_body = !request.is_head();

        let response = match self.dispatch(request.clone()).await {
            Ok(response) => response,
            Err(err) => return self.fail(stream, remote_addr, err, include_body).await,
        };

        self.logs.access(&request, &response);

        if let Err(err) = writer::write_response(stream, &response, include_body, &self.conn_limits).await
        {
            self.logs.error(Some(remote_addr), &err);
        }
    }

    async fn read_request<S>(
        &self,
        stream: S,
        local_addr: SocketAddr,
        remote_addr: SocketAddr,
    ) -> Result<Request, Error>
    where
        S: AsyncRead + Unpin,
    {
        let reader = BufReader::new(stream);
        let parse = Request::read_from(reader, local_addr, remote_addr, &self.req_limits);

        match self.conn_limits.socket_read_timeout {
            Some(limit) => timeout(limit, parse)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => parse.await,
        }
    }

    // Handlers are synchronous and may block, so they run on the blocking pool.
    async fn dispatch(&self, request: Arc<Request>) -> Result<Response, Error> {
        let handler = self.handler.clone();

        task::spawn_blocking(move || handler.handle(&request))
            .await
            .map_err(|err| Error::Handler(join_error_message(err)))
    }

    async fn fail<S>(&self, stream: &mut S, remote_addr: SocketAddr, err: Error, include_body: bool)
    where
        S: AsyncWrite + Unpin,
    {
        self.logs.error(Some(remote_addr), &err);

        let response = err.into_response();
        if let Err(err) = writer::write_response(stream, &response, include_body, &self.conn_limits).await
        {
            self.logs.error(Some(remote_addr), &err);
        }
    }
}

fn join_error_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => panic_message(payload.as_ref()),
        Err(err) => err.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "handler panicked".to_owned()
    }
}

pub(crate) mod writer {
    use crate::{errors::Error, http::response::Response, limits::ConnLimits};
    use tokio::{io::AsyncWrite, time::timeout};

    #[inline]
    pub(crate) async fn write_response<W>(
        stream: &mut W,
        response: &Response,
        include_body: bool,
        limits: &ConnLimits,
    ) -> Result<(), Error>
    where
        W: AsyncWrite + Unpin,
    {
        let write = response.write_to(stream, include_body);

        match limits.socket_write_timeout {
            Some(limit) => timeout(limit, write)
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => write.await?,
        }

        Ok(())
    }
}
