use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

use crate::storage::project_dirs;

/// Local copies of remote cover art, resized for display.
#[derive(Clone)]
pub struct ArtCache {
    cache_dir: PathBuf,
    agent: Agent,
}

impl ArtCache {
    pub fn new() -> Result<Self> {
        let cache_dir = project_dirs()?.cache_dir().join("art");
        Self::with_dir(cache_dir)
    }

    pub fn with_dir(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir).context("Failed to create art cache directory")?;
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(15)))
            .build()
            .new_agent();
        Ok(Self { cache_dir, agent })
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.png", sanitize_name(id)))
    }

    pub fn find_existing(&self, id: &str) -> Option<PathBuf> {
        let path = self.image_path(id);
        path.exists().then_some(path)
    }

    /// Drop every cached image so the next fetch downloads current art.
    pub fn clear(&self) -> Result<()> {
        let entries = fs::read_dir(&self.cache_dir).context("Failed to read art cache")?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete {}", path.display()))?;
            }
        }
        Ok(())
    }

    /// Download `url` for game `id` unless a cached copy already exists.
    pub fn fetch(&self, id: &str, url: &str, width: u32, height: u32) -> Result<PathBuf> {
        if let Some(path) = self.find_existing(id) {
            return Ok(path);
        }

        debug!("Downloading cover art for {} from {}", id, url);
        let mut resp = self
            .agent
            .get(url)
            .call()
            .context("Failed to download image")?;
        let bytes = resp
            .body_mut()
            .read_to_vec()
            .context("Failed to read response body")?;

        let img = image::load_from_memory(&bytes).context("Failed to decode image")?;
        // Fits inside the poster box, keeping the aspect ratio.
        let resized = img.resize(width, height, image::imageops::FilterType::Triangle);

        let path = self.image_path(id);
        resized.save(&path).context("Failed to save resized image")?;
        Ok(path)
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
