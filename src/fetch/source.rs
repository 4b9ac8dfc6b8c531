use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{BasicClient, HttpClient, fetch_bytes};
use crate::feed::{FeedEntity, FeedMessage};
use crate::parser::parse_feed;

pub const DEFAULT_VEHICLE_POSITIONS_URL: &str = "https://gtfsrt.renfe.com/vehicle_positions.json";
pub const DEFAULT_TRIP_UPDATES_URL: &str = "https://gtfsrt.renfe.com/trip_updates.json";
pub const DEFAULT_ALERTS_URL: &str = "https://gtfsrt.renfe.com/alerts.json";

/// The three independent upstream feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    VehiclePositions,
    TripUpdates,
    Alerts,
}

impl FeedKind {
    pub const ALL: [FeedKind; 3] = [
        FeedKind::VehiclePositions,
        FeedKind::TripUpdates,
        FeedKind::Alerts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::VehiclePositions => "vehicle_positions",
            FeedKind::TripUpdates => "trip_updates",
            FeedKind::Alerts => "alerts",
        }
    }
}

/// Outcome of one feed fetch. `Unavailable` is a normal, silent degraded state.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedResult {
    Available(FeedMessage),
    Unavailable,
}

impl FeedResult {
    /// Entities of the feed; empty when unavailable.
    pub fn entities(&self) -> &[FeedEntity] {
        match self {
            FeedResult::Available(feed) => &feed.entity,
            FeedResult::Unavailable => &[],
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, FeedResult::Available(_))
    }
}

/// Anything that can produce the three feeds. Implementations never fail;
/// errors are reported as [`FeedResult::Unavailable`].
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, kind: FeedKind) -> FeedResult;
}

/// Upstream URLs for each feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEndpoints {
    pub vehicle_positions: String,
    pub trip_updates: String,
    pub alerts: String,
}

impl FeedEndpoints {
    pub fn url(&self, kind: FeedKind) -> &str {
        match kind {
            FeedKind::VehiclePositions => &self.vehicle_positions,
            FeedKind::TripUpdates => &self.trip_updates,
            FeedKind::Alerts => &self.alerts,
        }
    }
}

impl Default for FeedEndpoints {
    fn default() -> Self {
        Self {
            vehicle_positions: DEFAULT_VEHICLE_POSITIONS_URL.to_string(),
            trip_updates: DEFAULT_TRIP_UPDATES_URL.to_string(),
            alerts: DEFAULT_ALERTS_URL.to_string(),
        }
    }
}

/// [`FeedSource`] backed by HTTP.
pub struct FeedFetcher<C = BasicClient> {
    client: C,
    endpoints: FeedEndpoints,
    timeout: Duration,
}

impl FeedFetcher<BasicClient> {
    pub fn new(endpoints: FeedEndpoints, timeout: Duration) -> Result<Self> {
        Ok(Self::with_client(BasicClient::new(timeout)?, endpoints, timeout))
    }
}

impl<C: HttpClient> FeedFetcher<C> {
    /// `timeout` bounds the whole fetch, independent of what `client` enforces.
    pub fn with_client(client: C, endpoints: FeedEndpoints, timeout: Duration) -> Self {
        Self {
            client,
            endpoints,
            timeout,
        }
    }

    pub fn endpoints(&self) -> &FeedEndpoints {
        &self.endpoints
    }

    /// Fetches and decodes `url`, logging and swallowing any failure.
    #[tracing::instrument(skip(self), fields(url = %url))]
    pub async fn fetch_url(&self, url: &str) -> FeedResult {
        let started = Instant::now();

        match tokio::time::timeout(self.timeout, self.try_fetch(url)).await {
            Ok(Ok(feed)) => {
                debug!(
                    entity_count = feed.entity.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Feed fetched"
                );
                FeedResult::Available(feed)
            }
            Ok(Err(e)) => {
                warn!(url, error = %format!("{e:#}"), "Feed fetch failed, serving it as empty");
                FeedResult::Unavailable
            }
            Err(_) => {
                warn!(
                    url,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Feed fetch timed out, serving it as empty"
                );
                FeedResult::Unavailable
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<FeedMessage> {
        let bytes = fetch_bytes(&self.client, url).await?;
        parse_feed(&bytes)
    }
}

#[async_trait]
impl<C: HttpClient> FeedSource for FeedFetcher<C> {
    async fn fetch(&self, kind: FeedKind) -> FeedResult {
        debug!(feed = kind.as_str(), "Fetching feed");
        self.fetch_url(self.endpoints.url(kind)).await
    }
}
