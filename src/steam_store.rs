use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use ureq::Agent;

const DEFAULT_BASE_URL: &str = "https://store.steampowered.com";
const PREFERRED_VIDEO_QUALITY: &str = "480";

/// Cover and trailer metadata for one Steam app.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppDetails {
    pub header_image: String,
    pub background_video: Option<String>,
}

/// Source of per-app store metadata.
pub trait AppDetailsSource: Send + Sync {
    /// `Ok(None)` means the store answered but has no details for the app.
    fn fetch_details(&self, app_id: &str) -> Result<Option<AppDetails>>;
}

#[derive(Clone)]
pub struct SteamStoreClient {
    agent: Agent,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct AppDetailsEnvelope {
    success: bool,
    data: Option<AppData>,
}

#[derive(Debug, Deserialize)]
struct AppData {
    #[serde(default)]
    header_image: Option<String>,
    #[serde(default)]
    movies: Vec<Movie>,
}

#[derive(Debug, Deserialize)]
struct Movie {
    #[serde(default)]
    webm: HashMap<String, String>,
}

impl SteamStoreClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(15)))
            .build()
            .new_agent();
        Self { agent, base_url }
    }
}

impl Default for SteamStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AppDetailsSource for SteamStoreClient {
    fn fetch_details(&self, app_id: &str) -> Result<Option<AppDetails>> {
        let url = format!("{}/api/appdetails", self.base_url);
        let mut resp = self
            .agent
            .get(&url)
            .query("appids", app_id)
            .call()
            .with_context(|| format!("Failed to fetch store details for app {}", app_id))?;

        let body: HashMap<String, AppDetailsEnvelope> = resp
            .body_mut()
            .read_json()
            .context("Failed to parse store details response")?;

        Ok(details_from_response(body, app_id))
    }
}

fn details_from_response(
    mut body: HashMap<String, AppDetailsEnvelope>,
    app_id: &str,
) -> Option<AppDetails> {
    let envelope = body.remove(app_id)?;
    if !envelope.success {
        return None;
    }
    let data = envelope.data?;

    let background_video = data
        .movies
        .into_iter()
        .find_map(|mut movie| movie.webm.remove(PREFERRED_VIDEO_QUALITY));

    Some(AppDetails {
        header_image: data.header_image.unwrap_or_default(),
        background_video,
    })
}
