//! HTTP API exposing the scrape pipeline.
//!
//! Routes:
//! - `GET /scrape?url=` and `GET /?url=` scrape one file page
//! - `GET /` service info
//! - `GET /health` liveness

mod handlers;
mod policy;
mod routes;

pub use handlers::{ErrorBody, ScrapeResponse, ServiceInfo};
pub use policy::{validate_target, RequestPolicy, UNKNOWN_CLIENT};
pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::scrapers::browser::{create_renderer, PageRenderer};
use crate::scrapers::Orchestrator;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub policy: RequestPolicy,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let renderer = create_renderer(&settings.browser)?;
        Ok(Self::with_renderer(settings, renderer))
    }

    /// Build state around an existing renderer.
    pub fn with_renderer(settings: &Settings, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::from_settings(settings, renderer)),
            policy: RequestPolicy::from_settings(settings),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::scrapers::browser::{HtmlPage, RenderError, RenderedPage};

    const LANDING_PAGE: &str = r#"
        <html><body>
          <h3>movie.mkv</h3>
          <div class="list-group-item">Size : 700 MB</div>
          <a class="btn" href="https://instant.example/f">Instant DL [10GBPS]</a>
          <a class="btn" href="https://t.me/filebot?start=abc">Telegram</a>
          <a class="btn" href="/login">Login</a>
        </body></html>
    "#;

    struct StaticRenderer(String);

    #[async_trait]
    impl PageRenderer for StaticRenderer {
        async fn open(&self) -> Result<Box<dyn RenderedPage>, RenderError> {
            Ok(Box::new(HtmlPage::new(self.0.clone())))
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn test_settings() -> Settings {
        Settings {
            ready_timeout_secs: 1,
            ..Settings::default()
        }
    }

    fn setup_test_app(settings: &Settings, html: &str) -> axum::Router {
        let state = AppState::with_renderer(settings, Arc::new(StaticRenderer(html.to_string())));
        create_router(state)
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_root_without_url_is_service_info() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "gdscrape");
        assert_eq!(body["status"], "running");
        assert!(body["usage"].as_str().unwrap().contains("/scrape?url="));
    }

    #[tokio::test]
    async fn test_missing_url() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/scrape").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "URL parameter required");
    }

    #[tokio::test]
    async fn test_disallowed_domain() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/scrape?url=https://example.com/file/ABC").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("example.com"));
    }

    #[tokio::test]
    async fn test_scrape_success() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/scrape?url=https://gdflix.net/file/ABC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["type"], "file");
        assert_eq!(body["fileName"], "movie.mkv");
        assert_eq!(body["fileSize"], "700 MB");
        assert_eq!(body["totalServers"], 2);
        assert_eq!(body["downloads"][0]["server"], "Instant Download [10GBPS]");
        assert_eq!(body["downloads"][1]["server"], "Telegram Bot");
        assert!(body["responseTime"].is_number());
    }

    #[tokio::test]
    async fn test_root_with_url_scrapes() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/?url=https://gdflix.net/file/ABC").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fileName"], "movie.mkv");
    }

    #[tokio::test]
    async fn test_page_without_links_is_server_error() {
        let app = setup_test_app(&test_settings(), "<html><body><h3>x</h3></body></html>");
        let (status, body) = get(app, "/scrape?url=https://gdflix.net/file/ABC").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let settings = Settings {
            rate_limit_per_minute: 1,
            ..test_settings()
        };
        let app = setup_test_app(&settings, LANDING_PAGE);

        let (status, _) = get(app.clone(), "/scrape?url=https://example.com/x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get(app, "/scrape?url=https://gdflix.net/file/ABC").await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "Rate limit exceeded. Max 1 requests per minute");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = setup_test_app(&test_settings(), LANDING_PAGE);
        let (status, body) = get(app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }
}
