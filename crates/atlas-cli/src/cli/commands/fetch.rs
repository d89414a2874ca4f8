//! Authenticated GET with cache support.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use atlas_api::client::ApiClient;
use atlas_api::config::{Config, paths};
use atlas_api::session::Session;

pub async fn run(path: &str, query: &[String], ttl: u64) -> Result<()> {
    let config = Config::load()?;
    let session = Session::new(
        reqwest_client(&config)?,
        config.refresh_url()?,
        Some(paths::session_path()),
    );
    if !session.bootstrap()? {
        tracing::debug!("no stored session, sending unauthenticated");
    }
    let client = ApiClient::new(&config, session)?;

    let pairs = parse_query(query)?;
    let query_refs: Vec<(&str, &str)> = pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let value: serde_json::Value = if ttl == 0 {
        client.get_json(path, &query_refs).await?
    } else {
        client
            .get_json_cached(path, &query_refs, Duration::from_secs(ttl))
            .await?
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn reqwest_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("Failed to build HTTP client")
}

/// Parses repeated `key=value` arguments.
fn parse_query(raw: &[String]) -> Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => bail!("Invalid query parameter '{pair}': expected key=value"),
        })
        .collect()
}
