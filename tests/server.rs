use std::sync::Arc;
use std::time::Duration;

use strata::log::{Level, SharedLogger};
use strata::middleware::{compose, Recovery, Wrapper};
use strata::{Request, Response, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

fn quiet() -> SharedLogger {
    Arc::new(|_: Level, _: &str| {})
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

async fn echo(req: Request) -> Response {
    let id = req.resources("/api/").id_of("items").unwrap_or("none").to_owned();
    Response::text(format!("{} item={id} body={}", req.method(), String::from_utf8_lossy(req.body())))
}

async fn send(port: u16, raw: &str) -> String {
    let mut stream = loop {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(s) => break s,
            Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    };
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn serves_composed_router_until_shutdown() {
    let router = Router::new("/api/", quiet());
    router.register("items", echo).unwrap();
    let app = compose(router, [Box::new(Recovery::new(quiet())) as Box<dyn Wrapper>]);

    let port = free_port();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        Server::bind(&format!("127.0.0.1:{port}"))
            .unwrap()
            .request_timeout(Duration::from_secs(1))
            .serve_with_shutdown(app, async {
                let _ = stopped.await;
            })
            .await
    });

    let res = send(
        port,
        "POST /api/items/7 HTTP/1.1\r\nhost: localhost\r\ncontent-length: 5\r\nconnection: close\r\n\r\nhello",
    )
    .await;
    assert!(res.starts_with("HTTP/1.1 200 OK"), "{res}");
    assert!(res.ends_with("POST item=7 body=hello"), "{res}");

    let res = send(port, "GET /elsewhere HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n").await;
    assert!(res.starts_with("HTTP/1.1 404 Not Found"), "{res}");
    assert!(res.ends_with("no resource registered for /elsewhere\n"), "{res}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
