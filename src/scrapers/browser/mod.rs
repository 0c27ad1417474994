//! Page renderers for JavaScript-built file host pages.
//!
//! Chrome (via chromiumoxide) renders the real page; the HTTP renderer and
//! [`HtmlPage`] serve pre-rendered markup and fixtures through the same
//! [`RenderedPage`] interface.

mod chrome;
mod config;
mod http;
mod page;
mod types;

pub use chrome::ChromeRenderer;
pub use config::{BrowserEngineConfig, RendererKind, DEFAULT_USER_AGENT};
pub use http::HttpRenderer;
pub use page::{collapse_whitespace, HtmlPage, PageRenderer, ReadyCondition, RenderedPage};
pub use types::{ElementSnapshot, RenderError};

use std::sync::Arc;

use tracing::info;

/// Build the renderer selected by `config.engine`.
pub fn create_renderer(config: &BrowserEngineConfig) -> Result<Arc<dyn PageRenderer>, RenderError> {
    let renderer: Arc<dyn PageRenderer> = match config.engine {
        RendererKind::Chrome => Arc::new(ChromeRenderer::new(config.clone())),
        RendererKind::Http => Arc::new(HttpRenderer::new(config)?),
    };
    info!("Using {} renderer", renderer.name());
    Ok(renderer)
}
