//! plain_http - a small HTTP/1.0 server toolkit on Tokio
//!
//! Reads raw bytes from a TCP connection into a [`Request`], hands it to a
//! [`Handler`] picked by path, and writes the returned [`Response`] back.
//! Every connection carries exactly one request/response exchange and is
//! closed afterwards.
//!
//! # Protocol
//!
//! - **Requests**: `GET`, `HEAD` and `POST`; the request line must end in
//!   `HTTP/<digits and dots>`. Lines may end in `\r\n` or a bare `\n`.
//!   `POST` bodies need `Content-Length`. See [`Request`] for the details.
//! - **Responses**: always `HTTP/1.0`, with `Content-Length` whenever there is
//!   a body. `HEAD` requests get the same headers and no body.
//! - **Errors**: malformed requests get `400 Bad Request`, handler panics and
//!   I/O failures `500 Internal Server Error`, both with a plaintext body
//!   `<code> <reason>: <detail>`.
//!
//! Not supported: keep-alive, pipelining, chunked transfer encoding, TLS and
//! compression.
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use plain_http::{Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plain_http::Error> {
//!     Server::builder()
//!         .bind("127.0.0.1:8080")
//!         .handler(|_: &Request| Response::text("Hello World!"))
//!         .build()?
//!         .launch()
//!         .await
//! }
//! ```
//! Routing, forms, cookies and logging:
//! ```no_run
//! use plain_http::{log::TracingLog, Cookie, FileHandler, Muxer, Request, Response, Server};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), plain_http::Error> {
//!     let mux = Muxer::new();
//!
//!     mux.set_handler("/greet", |req: &Request| {
//!         let name = req.query_form().get("name").unwrap_or("stranger").to_owned();
//!         let mut resp = Response::text(format!("Hello, {name}!"));
//!         resp.add_cookie(&Cookie::expires_after("last", name, Duration::from_secs(3600)));
//!         resp
//!     });
//!     mux.set_handler("/login", |req: &Request| match req.is_post() {
//!         true => Response::redirect_to("/greet"),
//!         false => Response::html("<form method=post><button>Go</button></form>"),
//!     });
//!     mux.set_handler("/static/", FileHandler::dir("/static/", "./public"));
//!
//!     Server::builder()
//!         .bind("127.0.0.1:8080")
//!         .handler(mux)
//!         .access_log(TracingLog)
//!         .error_log(TracingLog)
//!         .build()?
//!         .launch()
//!         .await
//! }
//! ```

pub(crate) mod http {
    pub(crate) mod cookie;
    pub(crate) mod form;
    pub(crate) mod reader;
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod handlers;
    pub(crate) mod muxer;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;
pub mod log;

pub use crate::{
    errors::{Error, ErrorKind, HttpError},
    http::{
        cookie::Cookie,
        form::{Form, Pair},
        request::Request,
        response::Response,
        types::{normalize_key, Header, Method, StatusCode},
    },
    server::{
        handlers::{status_handler, FileHandler, NotFound, StatusHandler},
        muxer::Muxer,
        server_impl::{Handler, Server, ServerBuilder},
    },
};
