//! Ready-made handlers

use crate::{Handler, Request, Response, StatusCode};
use std::path::{Component, Path, PathBuf};

/// Answers every request with `code` and the body `<code> <reason>`.
///
/// # Examples
/// ```
/// use plain_http::{status_handler, Handler, Method, Request, StatusCode};
///
/// let handler = status_handler(StatusCode::IM_A_TEAPOT);
/// let request = Request::new(
///     "127.0.0.1:80".parse().unwrap(),
///     "127.0.0.1:5000".parse().unwrap(),
///     Method::Get,
///     "/coffee",
///     Vec::new(),
///     None,
/// );
///
/// let resp = handler.handle(&request);
/// assert_eq!(resp.code(), StatusCode::IM_A_TEAPOT);
/// assert_eq!(resp.body(), Some(&b"418 I'm a teapot"[..]));
/// ```
pub fn status_handler<C: Into<StatusCode>>(code: C) -> StatusHandler {
    StatusHandler(code.into())
}

/// See [`status_handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusHandler(StatusCode);

impl Handler for StatusHandler {
    fn handle(&self, _: &Request) -> Response {
        Response::simple(self.0, None, self.0.summary())
    }
}

/// The default not-found handler: `404 Not Found: <path>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl Handler for NotFound {
    fn handle(&self, request: &Request) -> Response {
        Response::not_found(request.path())
    }
}

/// Serves files from disk, read anew on every request.
///
/// A handler built with [`FileHandler::file`] always answers with that one
/// file. One built with [`FileHandler::dir`] maps the part of the request
/// path after `prefix` onto a directory; it is meant to be registered on a
/// [`Muxer`](crate::Muxer) under the same prefix:
///
/// ```
/// use plain_http::{FileHandler, Muxer};
///
/// let mux = Muxer::new();
/// mux.set_handler("/favicon.ico", FileHandler::file("assets/favicon.ico"));
/// mux.set_handler("/static/", FileHandler::dir("/static/", "assets/public"));
/// ```
///
/// Paths that try to leave the directory (`..`) get `404 Not Found`, as do
/// missing files. See [`Response::file`] for content types and read errors.
#[derive(Debug, Clone)]
pub struct FileHandler {
    target: Target,
}

#[derive(Debug, Clone)]
enum Target {
    File(PathBuf),
    Dir { prefix: String, root: PathBuf },
}

impl FileHandler {
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        FileHandler {
            target: Target::File(path.into()),
        }
    }

    pub fn dir<S: Into<String>, P: Into<PathBuf>>(prefix: S, root: P) -> Self {
        FileHandler {
            target: Target::Dir {
                prefix: prefix.into(),
                root: root.into(),
            },
        }
    }

    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        match &self.target {
            Target::File(path) => Some(path.clone()),
            Target::Dir { prefix, root } => {
                let rest = request_path.strip_prefix(prefix.as_str())?;
                let rest = crate::http::form::decode_component(rest);

                let relative = Path::new(rest.trim_start_matches('/'));
                if relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)))
                {
                    return None;
                }

                Some(root.join(relative))
            }
        }
    }
}

impl Handler for FileHandler {
    fn handle(&self, request: &Request) -> Response {
        match self.resolve(request.path()) {
            Some(path) => Response::file(path),
            None => Response::not_found(request.path()),
        }
    }
}
