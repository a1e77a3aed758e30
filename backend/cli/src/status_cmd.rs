//! `perceptor status`: report on a running server.

use anyhow::Result;
use perceptor_config::ServerConfig;

/// Base URL for the configured server, with wildcard binds mapped to loopback.
pub fn default_base_url(server: &ServerConfig) -> String {
    let host = match server.bind.as_str() {
        "0.0.0.0" | "::" | "[::]" | "" => "127.0.0.1",
        other => other,
    };
    format!("http://{}:{}", host, server.port)
}

pub async fn run(base_url: &str) -> Result<()> {
    let url = format!("{}/api/health", base_url.trim_end_matches('/'));
    println!("perceptor status: checking {url}");

    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(resp) => {
            println!("perceptor responded with {}", resp.status());
        }
        Err(_) => {
            println!("perceptor is not running at {base_url}");
        }
    }
    Ok(())
}
