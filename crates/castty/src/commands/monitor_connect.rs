use clap::ArgMatches;
use tracing::{error, info, warn};

/// Only http/https with an explicit host are accepted — this is a pointer to
/// a locally-run monitor server, never a file:// or other scheme.
fn validate_url(url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| format!("unsupported URL scheme, only http:// and https:// are allowed: {url}"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(format!("URL is missing a host: {url}"));
    }
    Ok(())
}

pub fn handle(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let url = matches.get_one::<String>("url").ok_or("url argument is required")?;
    if let Err(message) = validate_url(url) {
        eprintln!("❌ {message}");
        return Err(message.into());
    }

    if matches.get_flag("no-open") {
        println!("{url}");
        return Ok(());
    }

    info!(event = "cli.monitor_connect_started", url = %url);

    let result = match matches.get_one::<String>("browser") {
        Some(browser) => open::with(url, browser),
        None => open::that(url),
    };

    match result {
        Ok(()) => {
            println!("✅ Opened {url}");
            info!(event = "cli.monitor_connect_completed", url = %url);
            Ok(())
        }
        Err(e) => {
            warn!(event = "cli.monitor_connect_browser_failed", url = %url, error = %e);
            println!("Could not launch a browser automatically. Open this URL manually:");
            println!("{url}");
            error!(event = "cli.monitor_connect_failed", error = %e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_schemes() {
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("javascript:alert(1)").is_err());
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_url("http://localhost:8888").is_ok());
        assert!(validate_url("https://example.com:8888").is_ok());
    }

    #[test]
    fn rejects_missing_host() {
        assert!(validate_url("http://").is_err());
    }
}
