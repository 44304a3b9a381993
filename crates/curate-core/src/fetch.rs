//! Radio Browser client: fetches the candidate catalog for one tag.
//!
//! Server order: last server that worked, then the discovered mirror list
//! (shuffled, cached for a day), then the configured fallbacks (shuffled).
//! The first server that answers 2xx with a JSON array wins.  When every
//! server fails the whole fetch fails; a partial catalog is never returned.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::StationCatalog;
use crate::config::FetchConfig;
use crate::error::{CurateError, Result};
use crate::station::RawStation;

pub const DISCOVERY_URL: &str = "https://all.api.radio-browser.info/json/servers";

/// How long a discovered mirror list stays usable.
const SERVER_LIST_TTL_HOURS: i64 = 24;

/// Bookkeeping persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchState {
    #[serde(default)]
    pub last_server: Option<String>,
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub servers_fetched_at: Option<DateTime<Utc>>,
}

impl FetchState {
    pub fn load(path: &Path) -> Self {
        if let Ok(content) = std::fs::read_to_string(path) {
            if let Ok(state) = serde_json::from_str::<FetchState>(&content) {
                return state;
            }
        }
        FetchState::default()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Cached mirror list, if still fresh at `now`.
    pub fn fresh_servers(&self, now: DateTime<Utc>) -> Option<&[String]> {
        let at = self.servers_fetched_at?;
        if self.servers.is_empty() || now - at > chrono::Duration::hours(SERVER_LIST_TTL_HOURS) {
            return None;
        }
        Some(&self.servers)
    }
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    name: String,
}

/// Build the ordered, de-duplicated list of servers to try.
pub fn servers_to_try(
    last_server: Option<&str>,
    discovered: &[String],
    fallbacks: &[String],
    rng: &mut impl rand::Rng,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut add = |s: &str| {
        let s = s.trim_end_matches('/');
        if !s.is_empty() && !out.iter().any(|o| o == s) {
            out.push(s.to_string());
        }
    };

    if let Some(last) = last_server {
        add(last);
    }
    let mut discovered = discovered.to_vec();
    discovered.shuffle(rng);
    for s in &discovered {
        add(s);
    }
    let mut fallbacks = fallbacks.to_vec();
    fallbacks.shuffle(rng);
    for s in &fallbacks {
        add(s);
    }
    out
}

pub struct RadioBrowserClient {
    client: reqwest::Client,
    config: FetchConfig,
    state_file: PathBuf,
    discovery_url: String,
}

impl RadioBrowserClient {
    pub fn new(config: FetchConfig, state_file: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CurateError::Fetch(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            state_file,
            discovery_url: DISCOVERY_URL.to_string(),
        })
    }

    /// Point mirror discovery somewhere else (used by tests).
    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    /// Fetch and normalize the catalog for the configured tag.
    pub async fn fetch_catalog(&self) -> Result<StationCatalog> {
        let mut state = FetchState::load(&self.state_file);
        let discovered = self.discovered_servers(&mut state).await;
        let servers = servers_to_try(
            state.last_server.as_deref(),
            &discovered,
            &self.config.servers,
            &mut rand::thread_rng(),
        );

        if servers.is_empty() {
            return Err(CurateError::Fetch("no directory servers configured".to_string()));
        }

        let mut last_error = String::new();
        for server in &servers {
            match self.fetch_from(server).await {
                Ok(raw) => {
                    info!("fetch: {} record(s) from {}", raw.len(), server);
                    state.last_server = Some(server.clone());
                    if let Err(e) = state.save(&self.state_file) {
                        warn!("fetch: could not save fetch state: {}", e);
                    }
                    return Ok(StationCatalog::from_raw(raw));
                }
                Err(e) => {
                    warn!("fetch: server {} failed: {:#}, trying next", server, e);
                    last_error = format!("{}: {:#}", server, e);
                }
            }
        }

        Err(CurateError::Fetch(format!(
            "all {} server(s) failed, last error: {}",
            servers.len(),
            last_error
        )))
    }

    /// One attempt against one server.
    pub async fn fetch_from(&self, server: &str) -> anyhow::Result<Vec<RawStation>> {
        let mut url = reqwest::Url::parse(server).context("invalid server URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("server URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["json", "stations", "bytag", self.config.tag.as_str()]);

        let limit = self.config.limit.to_string();
        let query = [
            ("hidebroken", bool_param(self.config.hide_broken)),
            ("order", self.config.order.as_str()),
            ("reverse", bool_param(self.config.reverse)),
            ("limit", limit.as_str()),
        ];
        debug!("fetch: GET {} {:?}", url, query);

        let response = self
            .client
            .get(url)
            .query(&query)
            .header("Accept", "application/json")
            .send()
            .await
            .context("request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("directory returned status {}", response.status());
        }

        let stations: Vec<RawStation> = response
            .json()
            .await
            .context("response is not a JSON station list")?;
        Ok(stations)
    }

    async fn discovered_servers(&self, state: &mut FetchState) -> Vec<String> {
        if !self.config.discover_servers {
            return Vec::new();
        }
        if let Some(cached) = state.fresh_servers(Utc::now()) {
            debug!("fetch: using {} cached mirror(s)", cached.len());
            return cached.to_vec();
        }
        match self.discover().await {
            Ok(list) if !list.is_empty() => {
                state.servers = list.clone();
                state.servers_fetched_at = Some(Utc::now());
                list
            }
            Ok(_) => {
                warn!("fetch: mirror discovery returned an empty list");
                Vec::new()
            }
            Err(e) => {
                warn!("fetch: mirror discovery failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn discover(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(&self.discovery_url)
            .send()
            .await
            .context("server list request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("server list returned status {}", response.status());
        }
        let entries: Vec<ServerEntry> = response.json().await.context("bad server list")?;
        Ok(entries
            .into_iter()
            .map(|e| format!("https://{}", e.name))
            .collect())
    }
}

fn bool_param(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_last_server_first_and_deduplicated() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let discovered = vec![
            "https://de1.api.radio-browser.info".to_string(),
            "https://nl1.api.radio-browser.info".to_string(),
        ];
        let fallbacks = vec![
            "https://de1.api.radio-browser.info/".to_string(),
            "https://fi1.api.radio-browser.info".to_string(),
        ];
        let out = servers_to_try(
            Some("https://fi1.api.radio-browser.info"),
            &discovered,
            &fallbacks,
            &mut rng,
        );
        assert_eq!(out[0], "https://fi1.api.radio-browser.info");
        assert_eq!(out.len(), 3);
        // discovered mirrors come before the remaining fallbacks
        assert!(out[1..3].contains(&"https://nl1.api.radio-browser.info".to_string()));
        assert!(out[1..3].contains(&"https://de1.api.radio-browser.info".to_string()));
    }

    #[test]
    fn test_server_cache_expires() {
        let now = Utc::now();
        let state = FetchState {
            last_server: None,
            servers: vec!["https://a".to_string()],
            servers_fetched_at: Some(now - chrono::Duration::hours(2)),
        };
        assert!(state.fresh_servers(now).is_some());
        assert!(state
            .fresh_servers(now + chrono::Duration::hours(SERVER_LIST_TTL_HOURS))
            .is_none());
        assert!(FetchState::default().fresh_servers(now).is_none());
    }

    #[test]
    fn test_state_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch-state.json");
        assert!(FetchState::load(&path).last_server.is_none());
        let state = FetchState {
            last_server: Some("https://de2.api.radio-browser.info".to_string()),
            ..Default::default()
        };
        state.save(&path).unwrap();
        assert_eq!(
            FetchState::load(&path).last_server.as_deref(),
            Some("https://de2.api.radio-browser.info")
        );
    }
}
