//! One-shot scrape command.

use console::style;

use crate::config::Settings;
use crate::scrapers::{create_renderer, Orchestrator};
use crate::server::{validate_target, ErrorBody, ScrapeResponse};

/// Scrape a single page and print the API response body to stdout.
///
/// Domain validation applies; rate limiting does not.
pub async fn cmd_scrape(settings: &Settings, url: &str, pretty: bool) -> anyhow::Result<()> {
    let request = validate_target(Some(url), &settings.allowed_domains)?;
    let renderer = create_renderer(&settings.browser)?;
    let orchestrator = Orchestrator::from_settings(settings, renderer);

    eprintln!(
        "{} Scraping {} with {} renderer",
        style("→").cyan(),
        request.target_url,
        orchestrator.renderer_name()
    );

    match orchestrator.scrape(&request).await {
        Ok(result) => {
            let response = ScrapeResponse::from(result);
            eprintln!(
                "  {} {} ({}, {} servers, {:.2}s)",
                style("✓").green(),
                response.file_name,
                response.file_size,
                response.total_servers,
                response.response_time
            );
            print_json(&response, pretty)
        }
        Err(e) => {
            eprintln!("  {} {}", style("✗").red(), e);
            print_json(&ErrorBody::new(e.to_string()), pretty)?;
            Err(e.into())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}
