//! Upstream feed retrieval.
//!
//! [`fetch_bytes`] is the raw GET; [`FeedFetcher`] wraps it with decoding, a
//! hard timeout and the conversion of every failure into
//! [`FeedResult::Unavailable`].

mod basic;
mod client;
mod source;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use source::{
    DEFAULT_ALERTS_URL, DEFAULT_TRIP_UPDATES_URL, DEFAULT_VEHICLE_POSITIONS_URL, FeedEndpoints,
    FeedFetcher, FeedKind, FeedResult, FeedSource,
};

use anyhow::{Context, Result};

/// GETs `url` and returns the body. Non-2xx statuses are errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL '{url}'"))?,
    );

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
