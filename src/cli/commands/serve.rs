//! API server command.

use console::style;

use crate::config::Settings;

/// Start the API server.
pub async fn cmd_serve(settings: &Settings, bind: Option<&str>) -> anyhow::Result<()> {
    let (host, port) = match bind {
        Some(bind) => parse_bind_address(bind, &settings.host, settings.port),
        None => (settings.host.clone(), settings.port),
    };

    println!(
        "{} Starting gdscrape at http://{}:{} ({} renderer)",
        style("→").cyan(),
        host,
        port,
        style(format!("{:?}", settings.browser.engine).to_lowercase()).bold()
    );
    println!(
        "  Allowed domains: {}",
        style(settings.allowed_domains.join(", ")).dim()
    );
    println!("  Press Ctrl+C to stop");

    crate::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3030" -> default_host:3030
/// - Just a host: "127.0.0.1" -> 127.0.0.1:default_port
/// - Host and port: "127.0.0.1:3030" -> 127.0.0.1:3030
fn parse_bind_address(bind: &str, default_host: &str, default_port: u16) -> (String, u16) {
    // Try parsing as just a port number
    if let Ok(port) = bind.parse::<u16>() {
        return (default_host.to_string(), port);
    }

    // Try parsing as host:port
    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return (host.to_string(), port);
        }
    }

    // Must be just a host, use default port
    (bind.to_string(), default_port)
}
