//! End-to-end API tests.
//!
//! A local axum server plays the file host; the API runs on its own port with
//! the HTTP renderer and is exercised over real sockets.

use std::net::SocketAddr;

use axum::{http::StatusCode, response::Html, routing::get, Router};
use serde_json::Value;

use gdscrape::config::Settings;
use gdscrape::scrapers::browser::{BrowserEngineConfig, RendererKind};
use gdscrape::server::{create_router, AppState};

const LANDING_PAGE: &str = r##"<!DOCTYPE html>
<html>
  <head><title>GDFlix | Big.Buck.Bunny.2008.1080p.mkv</title></head>
  <body>
    <nav><a href="/">Home</a> <a href="/login">Login</a></nav>
    <h3 class="text-center">Big.Buck.Bunny.2008.1080p.mkv</h3>
    <ul class="list-group">
      <li class="list-group-item">Size : 1.2 GB</li>
      <li class="list-group-item">Type : video/x-matroska</li>
    </ul>
    <a class="btn btn-success" href="https://instant.example/dl/1">Instant DL [10GBPS]</a>
    <a class="btn btn-primary" href="https://cloud.example/dl/1">Fast Cloud Download</a>
    <a class="btn btn-info" href="https://t.me/gdflixbot?start=abc">Telegram File</a>
    <a class="btn btn-warning" href="https://gofile.example/d/1">GoFile [Multiup]</a>
    <a class="btn btn-secondary" href="https://drive.example/1">G-Drive Link</a>
    <a class="btn btn-dark" href="https://s9.example/f">Download [Server 9]</a>
    <a class="btn" href="#">Copy All Links</a>
  </body>
</html>"##;

const RELATIVE_LINKS_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <body>
    <h3>Sintel.2010.720p.mkv</h3>
    <p>Size : 700 MB</p>
    <a class="btn" href="/dl/1">Instant DL [10GBPS]</a>
    <a class="btn" href="mirror/2">GoFile [Multiup]</a>
  </body>
</html>"#;

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// File host fixture: `/file/abc` is a landing page, `/file/rel` one with
/// relative links, `/file/missing` a 404.
async fn spawn_file_host() -> SocketAddr {
    let app = Router::new()
        .route("/file/abc", get(|| async { Html(LANDING_PAGE) }))
        .route("/file/rel", get(|| async { Html(RELATIVE_LINKS_PAGE) }))
        .route(
            "/file/missing",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        );
    spawn(app).await
}

async fn spawn_api(settings: Settings) -> SocketAddr {
    let state = AppState::new(&settings).unwrap();
    spawn(create_router(state)).await
}

fn settings() -> Settings {
    Settings {
        allowed_domains: vec!["127.0.0.1".to_string()],
        ready_timeout_secs: 1,
        browser: BrowserEngineConfig {
            engine: RendererKind::Http,
            ..Default::default()
        },
        ..Settings::default()
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn get_json(url: &str) -> (u16, Value) {
    let response = client().get(url).send().await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn scrapes_landing_page() {
    let host = spawn_file_host().await;
    let api = spawn_api(settings()).await;

    let (status, body) = get_json(&format!(
        "http://{}/scrape?url=http://{}/file/abc",
        api, host
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "file");
    assert_eq!(body["fileName"], "Big.Buck.Bunny.2008.1080p.mkv");
    assert_eq!(body["fileSize"], "1.2 GB");
    assert_eq!(body["totalServers"], 5);

    let servers: Vec<&str> = body["downloads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["server"].as_str().unwrap())
        .collect();
    assert_eq!(
        servers,
        vec![
            "Instant Download [10GBPS]",
            "Fast Cloud / ZipDisk",
            "Telegram Bot",
            "GoFile Mirror",
            "Download [Server 9]",
        ]
    );
    assert_eq!(body["downloads"][2]["buttonText"], "Telegram File");
    assert_eq!(body["downloads"][2]["url"], "https://t.me/gdflixbot?start=abc");
}

#[tokio::test]
async fn relative_links_are_absolute() {
    let host = spawn_file_host().await;
    let api = spawn_api(settings()).await;

    let (status, body) = get_json(&format!(
        "http://{}/scrape?url=http://{}/file/rel",
        api, host
    ))
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["totalServers"], 2);
    assert_eq!(body["downloads"][0]["server"], "Instant Download [10GBPS]");
    assert_eq!(
        body["downloads"][0]["url"],
        format!("http://{}/dl/1", host)
    );
    assert_eq!(
        body["downloads"][1]["url"],
        format!("http://{}/file/mirror/2", host)
    );
}

#[tokio::test]
async fn upstream_error_is_extraction_failure() {
    let host = spawn_file_host().await;
    let api = spawn_api(settings()).await;

    let (status, body) = get_json(&format!(
        "http://{}/?url=http://{}/file/missing",
        api, host
    ))
    .await;

    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn rejects_disallowed_domain() {
    let api = spawn_api(settings()).await;
    let (status, body) =
        get_json(&format!("http://{}/scrape?url=https://example.com/file/ABC", api)).await;

    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn limits_per_forwarded_client() {
    let api = spawn_api(Settings {
        rate_limit_per_minute: 2,
        trust_forwarded: true,
        ..settings()
    })
    .await;
    let url = format!("http://{}/scrape", api);
    let client = client();

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = client
            .get(&url)
            .header("X-Forwarded-For", "198.51.100.7")
            .send()
            .await
            .unwrap();
        statuses.push(response.status().as_u16());
    }
    assert_eq!(statuses, vec![400, 400, 429]);

    // A different forwarded client has its own window
    let response = client
        .get(&url)
        .header("X-Forwarded-For", "198.51.100.8")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn health_and_info() {
    let api = spawn_api(settings()).await;

    let (status, body) = get_json(&format!("http://{}/health", api)).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get_json(&format!("http://{}/", api)).await;
    assert_eq!(status, 200);
    assert_eq!(body["service"], "gdscrape");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
