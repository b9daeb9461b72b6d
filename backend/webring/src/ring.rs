use rand::{Rng, seq::SliceRandom};

use crate::models::{Site, host_of};

/// Active members in directory order, plus where the current page sits.
#[derive(Clone, Debug)]
pub struct Ring {
    sites: Vec<Site>,
    current: Option<usize>,
}

impl Ring {
    /// Finds the member whose URL host equals `host`.
    ///
    /// When the page host is not a member, `current_site` (a full URL the
    /// embedding page declares as its own) is tried as a second chance.
    pub fn locate(sites: Vec<Site>, host: &str, current_site: Option<&str>) -> Self {
        let position = |host: &str| {
            sites
                .iter()
                .position(|site| site.host().as_deref() == Some(host))
        };

        let current = position(host).or_else(|| current_site.and_then(host_of).and_then(|h| position(&h)));

        Self { sites, current }
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn current(&self) -> Option<&Site> {
        self.sites.get(self.current?)
    }

    pub fn is_member(&self) -> bool {
        self.current.is_some()
    }

    /// Next member, wrapping around. Non-members are sent to the first site.
    pub fn next(&self) -> Option<&Site> {
        let index = match self.current {
            Some(i) => (i + 1) % self.sites.len(),
            None => 0,
        };

        self.sites.get(index)
    }

    /// Previous member, wrapping around. Non-members are sent to the last site.
    pub fn prev(&self) -> Option<&Site> {
        let n = self.sites.len();
        let index = match self.current {
            Some(i) => (i + n - 1) % n,
            None => n.checked_sub(1)?,
        };

        self.sites.get(index)
    }

    /// Uniform pick among every member except the current one.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Site> {
        let candidates: Vec<&Site> = self
            .sites
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.current)
            .map(|(_, site)| site)
            .collect();

        candidates.choose(rng).copied()
    }
}
