//! Serves `./public` under `/static/`; run with `cargo run --example static_files [DIR]`.

use plain_http::{log::TracingLog, FileHandler, Muxer, Request, Response, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), plain_http::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let root = std::env::args().nth(1).unwrap_or_else(|| "./public".to_owned());

    let mux = Muxer::new();
    mux.set_handler("/static/", FileHandler::dir("/static/", &root))
        .set_handler("/", |_: &Request| Response::redirect_to("/static/index.html"));

    let server = Server::builder()
        .bind("127.0.0.1:8080")
        .handler(mux)
        .access_log(TracingLog)
        .error_log(TracingLog)
        .build()?;

    tracing::info!("serving {root} on http://{}/static/", server.local_addr()?);
    server.launch().await
}
