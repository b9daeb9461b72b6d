use reqwest::Client;
use tracing::debug;

use crate::{
    WebringError,
    models::{Directory, Site},
};

pub const WEBRING_API: &str =
    "https://raw.githubusercontent.com/open-making/site/main/data/webring.json";

/// Fetches the directory and keeps only active members.
pub async fn fetch_sites(client: &Client, url: &str) -> Result<Vec<Site>, WebringError> {
    let response = client.get(url).send().await?.error_for_status()?;
    let directory: Directory = response.json().await?;

    let sites = directory.active();
    debug!("Loaded {} active webring sites", sites.len());

    Ok(sites)
}
