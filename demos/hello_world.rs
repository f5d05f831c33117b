use plain_http::{Request, Response, Server};

fn hello_world(_: &Request) -> Response {
    Response::text("Hello, world!")
}

#[tokio::main]
async fn main() -> Result<(), plain_http::Error> {
    Server::builder()
        .bind("127.0.0.1:8080")
        .handler(hello_world)
        .build()?
        .launch()
        .await
}
