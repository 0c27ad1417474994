//! Scrape pipeline for rendered file host landing pages.

pub mod browser;
pub mod classify;
pub mod extract;
pub mod orchestrator;

pub use browser::{create_renderer, BrowserEngineConfig, PageRenderer, RenderedPage};
pub use classify::{CategoryRule, LinkClassifier, MatchField};
pub use extract::MetadataExtractor;
pub use orchestrator::{Orchestrator, ReadyWaitPolicy, ScrapeOptions, ScrapePhase};
