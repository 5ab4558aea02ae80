//! Listener lifecycle tests: dual listeners, graceful stop, failures, rerun.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::net::TcpStream;

use teller_proxy::config::ServerConfig;
use teller_proxy::{HttpGateway, HttpServer, ServerError};

mod common;

fn static_site(config: &mut ServerConfig, dir: &std::path::Path) {
    std::fs::write(dir.join("index.html"), "<h1>teller</h1>").unwrap();
    config.api.enabled = false;
    config.web.html_interface = true;
    config.web.static_dir = dir.to_path_buf();
}

#[tokio::test]
async fn dual_listeners_serve_and_stop_together() {
    let plain_addr: SocketAddr = "127.0.0.1:28201".parse().unwrap();
    let secure_addr: SocketAddr = "127.0.0.1:28202".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::self_signed_cert(dir.path());

    let mut config = common::plain_config(28201);
    config.listener.https_addr = secure_addr.to_string();
    config.tls.cert_path = Some(cert);
    config.tls.key_path = Some(key);
    static_site(&mut config, dir.path());

    let server = Arc::new(HttpServer::new(config));
    let running = common::spawn_server(server.clone(), plain_addr).await;
    common::wait_for_port(secure_addr).await;
    let client = common::client();

    // Plain requests are sent to the secure listener.
    let res = client
        .get(format!("http://{}/index.html?x=1", plain_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(
        res.headers()["location"],
        format!("https://{}/index.html?x=1", secure_addr).as_str()
    );

    let res = client
        .get(format!("https://{}/index.html", secure_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["strict-transport-security"], "max-age=31536000");
    assert_eq!(res.text().await.unwrap(), "<h1>teller</h1>");

    tokio::time::timeout(Duration::from_secs(3), server.shutdown())
        .await
        .expect("shutdown should finish within the grace period");
    tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("run should return after shutdown")
        .unwrap()
        .unwrap();

    assert!(TcpStream::connect(plain_addr).await.is_err());
    assert!(TcpStream::connect(secure_addr).await.is_err());
}

#[tokio::test]
async fn shutdown_lets_inflight_request_finish() {
    let teller_addr: SocketAddr = "127.0.0.1:28203".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28204".parse().unwrap();

    common::start_mock_teller(teller_addr, |_| async {
        (
            200,
            json!({ "statuses": [] }).to_string(),
            Duration::from_millis(500),
        )
    })
    .await;

    let gateway = HttpGateway::new(&format!("http://{}", teller_addr), Duration::from_secs(5)).unwrap();
    let server = Arc::new(HttpServer::new(common::plain_config(28204)).with_gateway(Arc::new(gateway)));
    let running = common::spawn_server(server.clone(), proxy_addr).await;

    let inflight = tokio::spawn(async move {
        common::client()
            .get(format!("http://{}/api/status", proxy_addr))
            .query(&[("skyaddr", common::sky_address())])
            .send()
            .await
            .map(|res| res.status().as_u16())
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    server.shutdown().await;

    assert_eq!(inflight.await.unwrap().unwrap(), 200);
    running.await.unwrap().unwrap();
    assert!(!server.is_running());
}

#[tokio::test]
async fn listener_failure_is_returned() {
    let taken: SocketAddr = "127.0.0.1:28205".parse().unwrap();
    let _occupied = std::net::TcpListener::bind(taken).unwrap();

    let server = HttpServer::new(common::plain_config(28205));
    let result = tokio::time::timeout(Duration::from_secs(2), server.run())
        .await
        .expect("run should fail promptly");

    assert!(matches!(
        result,
        Err(ServerError::Listener { protocol: "HTTP", .. })
    ));
    assert!(!server.is_running());
}

#[tokio::test]
async fn failing_secure_listener_stops_plain_listener() {
    let plain_addr: SocketAddr = "127.0.0.1:28206".parse().unwrap();
    let secure_taken: SocketAddr = "127.0.0.1:28207".parse().unwrap();
    let _occupied = std::net::TcpListener::bind(secure_taken).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::self_signed_cert(dir.path());

    let mut config = common::plain_config(28206);
    config.listener.https_addr = secure_taken.to_string();
    config.tls.cert_path = Some(cert);
    config.tls.key_path = Some(key);

    let server = HttpServer::new(config);
    let result = tokio::time::timeout(Duration::from_secs(3), server.run())
        .await
        .expect("run should fail promptly");

    assert!(matches!(
        result,
        Err(ServerError::Listener { protocol: "HTTPS", .. })
    ));

    // The surviving plain listener is closed by the time run returns.
    assert!(TcpStream::connect(plain_addr).await.is_err());
}

#[tokio::test]
async fn run_again_after_shutdown() {
    let proxy_addr: SocketAddr = "127.0.0.1:28208".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::plain_config(28208);
    static_site(&mut config, dir.path());
    let server = Arc::new(HttpServer::new(config));

    for _ in 0..2 {
        let running = common::spawn_server(server.clone(), proxy_addr).await;
        let res = common::client()
            .get(format!("http://{}/index.html", proxy_addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        server.shutdown().await;
        server.shutdown().await;
        running.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn immediate_rerun_rebinds_the_same_port() {
    let proxy_addr: SocketAddr = "127.0.0.1:28209".parse().unwrap();
    let server = Arc::new(HttpServer::new(common::plain_config(28209)));

    for round in 0..50 {
        let running = common::spawn_server(server.clone(), proxy_addr).await;
        server.shutdown().await;
        let result = tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .expect("run should return after shutdown")
            .unwrap();
        assert!(result.is_ok(), "round {round}: {result:?}");
    }
}

#[tokio::test]
async fn request_outliving_grace_is_cut_off() {
    let teller_addr: SocketAddr = "127.0.0.1:28210".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28211".parse().unwrap();

    common::start_mock_teller(teller_addr, |_| async {
        (200, json!({ "statuses": [] }).to_string(), Duration::from_secs(10))
    })
    .await;

    let gateway = HttpGateway::new(&format!("http://{}", teller_addr), Duration::from_secs(20)).unwrap();
    let server = Arc::new(HttpServer::new(common::plain_config(28211)).with_gateway(Arc::new(gateway)));
    let running = common::spawn_server(server.clone(), proxy_addr).await;

    let inflight = tokio::spawn(async move {
        common::client()
            .get(format!("http://{}/api/status", proxy_addr))
            .query(&[("skyaddr", common::sky_address())])
            .send()
            .await
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    // Grace is one second in the shared config.
    let started = Instant::now();
    server.shutdown().await;
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(2), "shutdown took {elapsed:?}");

    assert!(inflight.await.unwrap().is_err());
    running.await.unwrap().unwrap();
    assert!(TcpStream::connect(proxy_addr).await.is_err());
}

#[tokio::test]
async fn dual_listeners_finish_inflight_request_on_shutdown() {
    let teller_addr: SocketAddr = "127.0.0.1:28212".parse().unwrap();
    let plain_addr: SocketAddr = "127.0.0.1:28213".parse().unwrap();
    let secure_addr: SocketAddr = "127.0.0.1:28214".parse().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let (cert, key) = common::self_signed_cert(dir.path());

    common::start_mock_teller(teller_addr, |_| async {
        (
            200,
            json!({ "statuses": [] }).to_string(),
            Duration::from_millis(500),
        )
    })
    .await;

    let mut config = common::plain_config(28213);
    config.listener.https_addr = secure_addr.to_string();
    config.tls.cert_path = Some(cert);
    config.tls.key_path = Some(key);

    let gateway = HttpGateway::new(&format!("http://{}", teller_addr), Duration::from_secs(5)).unwrap();
    let server = Arc::new(HttpServer::new(config).with_gateway(Arc::new(gateway)));
    let running = common::spawn_server(server.clone(), plain_addr).await;
    common::wait_for_port(secure_addr).await;

    let inflight = tokio::spawn(async move {
        common::client()
            .get(format!("https://{}/api/status", secure_addr))
            .query(&[("skyaddr", common::sky_address())])
            .send()
            .await
            .map(|res| res.status().as_u16())
    });

    tokio::time::sleep(Duration::from_millis(150)).await;
    server.shutdown().await;

    assert_eq!(inflight.await.unwrap().unwrap(), 200);
    tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("run should return after shutdown")
        .unwrap()
        .unwrap();
    assert!(!server.is_running());
    assert!(TcpStream::connect(plain_addr).await.is_err());
    assert!(TcpStream::connect(secure_addr).await.is_err());
}
