//! # Webring
//!
//! Circular list of affiliated sites with prev/random/next navigation.
//!
//! ## Flow
//! 1. Fetch the directory JSON, keep sites marked `active`
//! 2. Find the current page by matching its host against each site URL host
//! 3. Render a compact or full fragment, a "not a member" invite, or an error box
//!
//! Navigation is circular in directory order: `next(i) = (i + 1) mod n`,
//! `prev(i) = (i - 1 + n) mod n`. Random never lands on the current site.
use reqwest::Client;
use thiserror::Error;
use tracing::warn;

pub mod models;
pub mod remote;
pub mod render;
pub mod ring;

pub use models::Site;
pub use render::{Options, Style, Theme, render, render_error, render_not_member};
pub use ring::Ring;

#[derive(Error, Debug)]
pub enum WebringError {
    #[error("Failed to load webring data: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct Widget {
    client: Client,
    url: String,
}

impl Widget {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }

    pub async fn load(&self, host: &str, current_site: Option<&str>) -> Result<Ring, WebringError> {
        let sites = remote::fetch_sites(&self.client, &self.url).await?;

        Ok(Ring::locate(sites, host, current_site))
    }

    /// Whatever the container should show for `host`, falling back to the error box.
    pub async fn render_for(&self, host: &str, current_site: Option<&str>, options: Options) -> String {
        match self.load(host, current_site).await {
            Ok(ring) => render(&ring, options, &mut rand::thread_rng()),
            Err(e) => {
                warn!("Webring widget failed to initialize: {e}");
                render_error()
            }
        }
    }
}
