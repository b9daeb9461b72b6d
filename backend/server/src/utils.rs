use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, REFERER},
        request::Parts,
    },
};

use crate::{
    config::{Config, Environment},
    models::GeoHint,
    state::AppState,
};

pub const UNKNOWN_LOCATION: &str = "Unknown";
pub const LOCAL_LOCATION: &str = "Local Development";

/// Trims, then keeps at most `max_chars` characters.
pub fn sanitize(input: &str, max_chars: usize) -> String {
    input.trim().chars().take(max_chars).collect()
}

pub fn location(geo: Option<&GeoHint>, environment: Environment) -> String {
    if environment == Environment::Development {
        return LOCAL_LOCATION.to_string();
    }

    let Some(geo) = geo else {
        return UNKNOWN_LOCATION.to_string();
    };

    match (non_empty(&geo.city), non_empty(&geo.country)) {
        (Some(city), Some(country)) => format!("{city}, {country}"),
        (None, Some(country)) => country.to_string(),
        _ => UNKNOWN_LOCATION.to_string(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Reads the geolocation headers a reverse proxy or CDN stamps on the request.
pub fn geo_hint(headers: &HeaderMap, config: &Config) -> Option<GeoHint> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    let geo = GeoHint {
        city: header(&config.geo_city_header),
        country: header(&config.geo_country_header),
    };

    (geo.city.is_some() || geo.country.is_some()).then_some(geo)
}

/// Token of an `Authorization: Bearer <token>` header.
pub fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Host of the page that embedded the widget, taken from `Referer`.
pub fn referer_host(headers: &HeaderMap) -> Option<String> {
    let referer = headers.get(REFERER)?.to_str().ok()?;

    url::Url::parse(referer).ok()?.host_str().map(str::to_string)
}

/// Address used as the rate-limit key for a submitter.
///
/// `X-Forwarded-For` is written left to right by every hop, so only the entries
/// appended by our own proxies can be believed. With `trusted_hops` proxies in
/// front, the submitter is the entry that many places from the right. Without
/// trusted proxies the socket peer is used and the header is ignored.
pub fn submitter_address(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_hops: usize) -> String {
    let peer = peer.map(|peer| peer.ip().to_string());

    if trusted_hops == 0 {
        return peer.unwrap_or_else(|| "unknown".to_string());
    }

    let hops: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();

    hops.len()
        .checked_sub(trusted_hops)
        .map(|index| hops[index].to_string())
        .or(peer)
        .unwrap_or_else(|| "unknown".to_string())
}

pub struct ClientAddress(pub String);

impl FromRequestParts<Arc<AppState>> for ClientAddress {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(peer)| *peer);

        Ok(Self(submitter_address(
            &parts.headers,
            peer,
            state.config.trusted_proxy_hops,
        )))
    }
}
