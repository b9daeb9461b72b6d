use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Deserialize)]
pub struct Directory {
    pub sites: Vec<Site>,
}

impl Directory {
    /// Members currently in the ring, in directory order.
    pub fn active(self) -> Vec<Site> {
        self.sites.into_iter().filter(|site| site.active).collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Site {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub active: bool,
}

impl Site {
    pub fn host(&self) -> Option<String> {
        host_of(&self.url)
    }
}

pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}
