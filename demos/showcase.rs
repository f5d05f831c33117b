//! Try it with curl:
//!
//! ```text
//! curl 'http://127.0.0.1:8080/query?name=Ferris&lang=rust&lang=c'
//! curl -d 'user=ferris&pass=crab' http://127.0.0.1:8080/post
//! curl -b 'a=1; b=2' http://127.0.0.1:8080/cookies
//! curl -H 'X-Demo: yes' http://127.0.0.1:8080/headers
//! curl http://127.0.0.1:8080/ip
//! curl -I http://127.0.0.1:8080/hello
//! ```

use plain_http::{
    log::TracingLog, status_handler, Cookie, Form, Muxer, Request, Response, Server, StatusCode,
};
use std::{fmt::Write, time::Duration};
use tracing_subscriber::EnvFilter;

fn dump_form(title: &str, form: &Form) -> String {
    let mut out = format!("{title} ({} pairs)\n", form.len());
    for pair in form {
        let _ = writeln!(out, "  {} = {:?}", pair.key(), pair.value());
    }
    out
}

fn query(req: &Request) -> Response {
    Response::text(dump_form("query", &req.query_form()))
}

fn post(req: &Request) -> Response {
    if !req.is_post() {
        return Response::html(
            "<form method=post><input name=user><input name=pass><button>Send</button></form>",
        );
    }
    Response::text(dump_form("post", &req.post_form()))
}

fn cookies(req: &Request) -> Response {
    let mut body = String::from("cookies\n");
    for cookie in req.cookies() {
        let _ = writeln!(body, "  {} = {:?}", cookie.key(), cookie.value());
    }

    let visits = req
        .cookie("visits")
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(0)
        + 1;

    let mut resp = Response::text(body);
    resp.add_cookie(&Cookie::expires_after(
        "visits",
        visits.to_string(),
        Duration::from_secs(24 * 60 * 60),
    ));
    resp
}

fn headers(req: &Request) -> Response {
    let mut body = format!("{} {}\n", req.method(), req.url());
    for header in req.headers() {
        let _ = writeln!(body, "  {header}");
    }
    Response::text(body)
}

fn ip(req: &Request) -> Response {
    Response::text(format!(
        "you are {}, this is {}",
        req.remote_addr(),
        req.local_addr()
    ))
}

#[tokio::main]
async fn main() -> Result<(), plain_http::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mux = Muxer::new();
    mux.set_handler("/query", query)
        .set_handler("/post", post)
        .set_handler("/cookies", cookies)
        .set_handler("/headers", headers)
        .set_handler("/ip", ip)
        .set_handler("/hello", |_: &Request| Response::text("Hello!"))
        .set_handler("/teapot", status_handler(StatusCode::IM_A_TEAPOT))
        .set_handler("/home", |_: &Request| Response::redirect_to("/hello"));

    let server = Server::builder()
        .bind("127.0.0.1:8080")
        .handler(mux)
        .access_log(TracingLog)
        .error_log(TracingLog)
        .build()?;

    tracing::info!("listening on http://{}", server.local_addr()?);

    server
        .launch_with_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
