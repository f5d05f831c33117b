use plain_http::{
    limits::ConnLimits, status_handler, Cookie, Error, Muxer, Request, Response, Server,
    StatusCode,
};
use std::{
    net::SocketAddr,
    sync::{mpsc, Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::oneshot,
    task::JoinHandle,
    time::timeout,
};

struct Running {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
    errors: Arc<Mutex<Vec<String>>>,
}

impl Running {
    async fn shutdown(self) {
        self.stop.send(()).unwrap();
        self.task.await.unwrap().unwrap();
    }
}

fn routes() -> Muxer {
    let mux = Muxer::new();

    mux.set_handler("/hello", |req: &Request| {
        Response::text(format!("hello {}", req.query_form().get("name").unwrap_or("world")))
    })
    .set_handler("/post", |req: &Request| {
        let form = req.post_form();
        Response::text(format!(
            "{}:{}",
            form.get("user").unwrap_or("-"),
            form.get("pass").unwrap_or("-")
        ))
    })
    .set_handler("/cookies", |req: &Request| {
        let mut resp = Response::text(
            req.cookies()
                .iter()
                .map(|c| format!("{}={}", c.key(), c.value().unwrap_or("")))
                .collect::<Vec<_>>()
                .join(","),
        );
        resp.add_cookie(&Cookie::session("seen", "yes"));
        resp
    })
    .set_handler("/ip", |req: &Request| Response::text(req.remote_addr().ip().to_string()))
    .set_handler("/static/", |req: &Request| Response::text(req.path()))
    .set_handler("/gone", status_handler(StatusCode::GONE))
    .set_handler("/panic", |_: &Request| -> Response { panic!("on purpose") });

    mux
}

async fn start(conn_limits: ConnLimits) -> Running {
    start_with(routes(), conn_limits).await
}

async fn start_with(mux: Muxer, conn_limits: ConnLimits) -> Running {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = errors.clone();

    let server = Server::builder()
        .bind("127.0.0.1:0")
        .handler(mux)
        .connection_limits(conn_limits)
        .error_log(move |_: Option<SocketAddr>, err: &Error| {
            sink.lock().unwrap().push(err.to_string());
        })
        .build()
        .unwrap();

    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel();
    let task = tokio::spawn(server.launch_with_shutdown(async {
        let _ = stopped.await;
    }));

    Running {
        addr,
        stop,
        task,
        errors,
    }
}

async fn send(addr: SocketAddr, request: &[u8]) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut output = Vec::new();
    stream.read_to_end(&mut output).await.unwrap();

    let output = String::from_utf8(output).unwrap();
    let (head, body) = output.split_once("\r\n\r\n").unwrap();
    (head.to_owned(), body.to_owned())
}

fn header<'a>(head: &'a str, key: &str) -> Option<&'a str> {
    head.split("\r\n")
        .skip(1)
        .filter_map(|line| line.split_once(": "))
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

#[tokio::test]
async fn answers_routes() {
    let server = start(ConnLimits::default()).await;

    #[rustfmt::skip]
    let cases: [(&[u8], &str, &str); 7] = [
        (b"GET /hello HTTP/1.0\r\n\r\n",              "HTTP/1.0 200 OK",        "hello world"),
        (b"GET /hello?name=Ferris%20C HTTP/1.0\n\n",  "HTTP/1.0 200 OK",        "hello Ferris C"),
        (b"get /static/a/b.css HTTP/1.1\r\n\r\n",     "HTTP/1.0 200 OK",        "/static/a/b.css"),
        (b"GET /ip HTTP/1.0\r\n\r\n",                 "HTTP/1.0 200 OK",        "127.0.0.1"),
        (b"GET /gone HTTP/1.0\r\n\r\n",               "HTTP/1.0 410 Gone",      "410 Gone"),
        (b"GET /nope?x=1 HTTP/1.0\r\n\r\n",           "HTTP/1.0 404 Not Found", "404 Not Found: /nope"),
        (b"GET /hello/x HTTP/1.0\r\n\r\n",            "HTTP/1.0 404 Not Found", "404 Not Found: /hello/x"),
    ];

    for (request, status, body) in cases {
        let (head, got) = send(server.addr, request).await;
        assert!(head.starts_with(status), "{head}");
        assert_eq!(got, body);
        assert_eq!(
            header(&head, "Content-Length"),
            Some(body.len().to_string().as_str())
        );
        assert!(header(&head, "Date").is_some());
        assert!(header(&head, "Server").unwrap().starts_with("plain_http/"));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn head_matches_get_without_body() {
    let server = start(ConnLimits::default()).await;

    let (get_head, get_body) = send(server.addr, b"GET /hello HTTP/1.0\r\n\r\n").await;
    let (head_head, head_body) = send(server.addr, b"HEAD /hello HTTP/1.0\r\n\r\n").await;

    assert_eq!(get_body, "hello world");
    assert_eq!(head_body, "");
    assert_eq!(
        header(&get_head, "Content-Length"),
        header(&head_head, "Content-Length")
    );
    assert_eq!(
        header(&get_head, "Content-Type"),
        header(&head_head, "Content-Type")
    );

    server.shutdown().await;
}

#[tokio::test]
async fn post_form_and_cookies() {
    let server = start(ConnLimits::default()).await;

    let (head, body) = send(
        server.addr,
        b"POST /post HTTP/1.0\r\nContent-Length: 24\r\n\r\nuser=ferris&pass=a+b%21c",
    )
    .await;
    assert!(head.starts_with("HTTP/1.0 200 OK"));
    assert_eq!(body, "ferris:a b!c");

    let (head, body) = send(
        server.addr,
        b"GET /cookies HTTP/1.0\r\nCookie: a=1; b=2\r\n\r\n",
    )
    .await;
    assert_eq!(body, "a=1,b=2");
    assert_eq!(header(&head, "Set-Cookie"), Some("seen=yes"));

    server.shutdown().await;
}

#[tokio::test]
async fn bad_requests_get_400() {
    let server = start(ConnLimits::default()).await;

    #[rustfmt::skip]
    let cases: [(&[u8], &str); 5] = [
        (b"GET /\r\n\r\n",                                     "400 Bad Request: INVALID_METHOD: "),
        (b"PUT / HTTP/1.0\r\n\r\n",                            "400 Bad Request: INVALID_METHOD: "),
        (b"GET / HTTP/1.0\r\nNoColon\r\n\r\n",                 "400 Bad Request: INVALID_HEADER: "),
        (b"POST /post HTTP/1.0\r\n\r\n",                       "400 Bad Request: INVALID_REQUEST: "),
        (b"POST /post HTTP/1.0\r\nContent-Length: x\r\n\r\n", "400 Bad Request: INVALID_REQUEST: "),
    ];

    for (request, prefix) in cases {
        let (head, body) = send(server.addr, request).await;
        assert!(head.starts_with("HTTP/1.0 400 Bad Request"), "{head}");
        assert!(body.starts_with(prefix), "{body}");
    }

    assert_eq!(server.errors.lock().unwrap().len(), cases.len());
    server.shutdown().await;
}

#[tokio::test]
async fn handler_panic_keeps_server_alive() {
    let server = start(ConnLimits::default()).await;

    let (head, body) = send(server.addr, b"GET /panic HTTP/1.0\r\n\r\n").await;
    assert!(head.starts_with("HTTP/1.0 500 Internal Server Error"));
    assert_eq!(body, "500 Internal Server Error: handler failed: on purpose");

    let (head, _) = send(server.addr, b"GET /hello HTTP/1.0\r\n\r\n").await;
    assert!(head.starts_with("HTTP/1.0 200 OK"));

    server.shutdown().await;
}

#[tokio::test]
async fn slow_client_gets_408() {
    let server = start(ConnLimits {
        socket_read_timeout: Some(Duration::from_millis(100)),
        ..ConnLimits::default()
    })
    .await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"GET /hello HTTP/1.0\r\n").await.unwrap();

    let mut output = String::new();
    stream.read_to_string(&mut output).await.unwrap();
    assert!(output.starts_with("HTTP/1.0 408 Request Timeout\r\n"), "{output}");

    server.shutdown().await;
}

#[tokio::test]
async fn idle_client_does_not_block_others() {
    let server = start(ConnLimits::default()).await;

    // Connected, but never sends a byte.
    let idle = TcpStream::connect(server.addr).await.unwrap();

    let (head, body) = timeout(
        Duration::from_secs(5),
        send(server.addr, b"GET /hello HTTP/1.0\r\n\r\n"),
    )
    .await
    .expect("second client was blocked by the idle one");
    assert!(head.starts_with("HTTP/1.0 200 OK"));
    assert_eq!(body, "hello world");

    drop(idle);
    server.shutdown().await;
}

#[tokio::test]
async fn blocking_handler_does_not_block_others() {
    let (release, released) = mpsc::channel::<()>();
    let release = Mutex::new(release);
    let released = Mutex::new(released);

    let mux = Muxer::new();
    mux.set_handler("/wait", move |_: &Request| {
        match released.lock().unwrap().recv_timeout(Duration::from_secs(5)) {
            Ok(()) => Response::text("released"),
            Err(_) => Response::text("never released"),
        }
    })
    .set_handler("/release", move |_: &Request| {
        release.lock().unwrap().send(()).unwrap();
        Response::text("ok")
    });

    let server = start_with(mux, ConnLimits::default()).await;

    let waiting = tokio::spawn(send(server.addr, b"GET /wait HTTP/1.0\r\n\r\n"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (_, body) = send(server.addr, b"GET /release HTTP/1.0\r\n\r\n").await;
    assert_eq!(body, "ok");

    let (_, body) = waiting.await.unwrap();
    assert_eq!(body, "released");

    server.shutdown().await;
}

#[tokio::test]
async fn accept_one_serves_single_connection() {
    let server = Server::builder()
        .bind("127.0.0.1:0")
        .handler(routes())
        .build()
        .unwrap();
    let addr = server.local_addr().unwrap();

    let client = tokio::spawn(send(addr, b"GET /hello HTTP/1.0\r\n\r\n"));
    server.accept_one().await.unwrap();

    let (head, body) = client.await.unwrap();
    assert!(head.starts_with("HTTP/1.0 200 OK"));
    assert_eq!(body, "hello world");
}
