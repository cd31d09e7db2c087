use crate::vdf::{self, VdfObject, VdfValue};
use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Ids of Steam packages that are tools or runtimes rather than games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredApps {
    ids: BTreeSet<String>,
}

impl IgnoredApps {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.ids.contains(app_id)
    }

    pub fn insert(&mut self, app_id: impl Into<String>) {
        self.ids.insert(app_id.into());
    }
}

impl Default for IgnoredApps {
    fn default() -> Self {
        Self::new([
            "228980",  // Steamworks Common Redistributables
            "1070560", // Steam Linux Runtime
            "1391110", // Steam Linux Runtime - Soldier
            "1628350", // Steam Linux Runtime - Sniper
            "1493710", // Proton Experimental
            "1887720", // Proton EasyAntiCheat Runtime
        ])
    }
}

/// A title found in an `appmanifest_*.acf` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub app_id: String,
    pub name: String,
    pub manifest_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct ManifestScan {
    pub entries: Vec<ManifestEntry>,
    /// Manifest files that could not be read or parsed.
    pub failed: Vec<PathBuf>,
}

/// Return every library folder of the Steam installation at `root`, starting
/// with `root` itself.
pub fn enumerate_library_folders(root: &Path) -> Vec<PathBuf> {
    let mut folders = vec![root.to_path_buf()];

    let candidates = [
        root.join("config").join("libraryfolders.vdf"),
        root.join("steamapps").join("libraryfolders.vdf"),
    ];
    let Some(library_file) = candidates.iter().find(|path| path.is_file()) else {
        warn!("No libraryfolders.vdf found under {:?}", root);
        return folders;
    };

    let parsed = fs::read_to_string(library_file)
        .with_context(|| format!("Failed to read {}", library_file.display()))
        .and_then(|contents| {
            vdf::parse(&contents)
                .with_context(|| format!("Failed to parse {}", library_file.display()))
        });

    match parsed {
        Ok(tree) => {
            for path in library_paths(&tree) {
                if !folders.contains(&path) {
                    folders.push(path);
                }
            }
        }
        Err(e) => warn!("Could not read library folders: {:#}", e),
    }

    folders
}

fn library_paths(tree: &VdfObject) -> Vec<PathBuf> {
    let Some(library_folders) = tree.get_object("libraryfolders") else {
        return Vec::new();
    };

    library_folders
        .iter()
        .filter_map(|(key, value)| match value {
            VdfValue::Object(entry) => entry.get_str("path"),
            // Older clients wrote `"1" "D:\\Games"` directly.
            VdfValue::Str(path) if key.chars().all(|c| c.is_ascii_digit()) => Some(path.as_str()),
            VdfValue::Str(_) => None,
        })
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Walk the `steamapps` directory of every library folder and collect the
/// installed titles. Unreadable manifests are logged and skipped.
pub fn scan_manifests(library_folders: &[PathBuf], ignored: &IgnoredApps) -> ManifestScan {
    let mut scan = ManifestScan::default();
    let mut seen = HashSet::new();

    for folder in library_folders {
        let steamapps = folder.join("steamapps");
        if !steamapps.is_dir() {
            debug!("Skipping library folder without steamapps: {:?}", folder);
            continue;
        }

        let mut manifest_paths: Vec<PathBuf> = match fs::read_dir(&steamapps) {
            Ok(entries) => entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| is_manifest_file(path))
                .collect(),
            Err(e) => {
                warn!("Could not list {:?}: {}", steamapps, e);
                continue;
            }
        };
        manifest_paths.sort();

        for path in manifest_paths {
            let entry = match parse_manifest_file(&path) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Could not read or parse app manifest: {:#}", e);
                    scan.failed.push(path);
                    continue;
                }
            };

            if ignored.contains(&entry.app_id) {
                info!("Skipping ignored app: {} ({})", entry.name, entry.app_id);
                continue;
            }

            if seen.insert(entry.app_id.clone()) {
                scan.entries.push(entry);
            }
        }
    }

    scan
}

fn parse_manifest_file(path: &Path) -> Result<ManifestEntry> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let tree =
        vdf::parse(&contents).with_context(|| format!("Failed to parse {}", path.display()))?;

    let app_state = tree
        .get_object("AppState")
        .ok_or_else(|| anyhow!("{} has no AppState section", path.display()))?;

    let app_id = app_state
        .get_str("appid")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(|| appid_from_manifest_path(path))
        .ok_or_else(|| anyhow!("{} has no appid", path.display()))?;

    let name = app_state
        .get_str("name")
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| anyhow!("{} has no name", path.display()))?;

    Ok(ManifestEntry {
        app_id,
        name: name.to_string(),
        manifest_path: path.to_path_buf(),
    })
}

fn is_manifest_file(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    file_name.starts_with("appmanifest_") && file_name.ends_with(".acf")
}

fn appid_from_manifest_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let appid = stem.strip_prefix("appmanifest_")?;
    if !appid.is_empty() && appid.chars().all(|c| c.is_ascii_digit()) {
        Some(appid.to_string())
    } else {
        None
    }
}
