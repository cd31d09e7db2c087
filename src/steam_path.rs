use directories::BaseDirs;
use std::path::PathBuf;
use tracing::{debug, warn};

const REGISTRY_KEY: &str = r"HKEY_CURRENT_USER\Software\Valve\Steam";
const REGISTRY_VALUE: &str = "SteamPath";

/// Locates the root directory of the Steam client.
pub trait SteamRootResolver: Send + Sync {
    fn resolve(&self) -> Option<PathBuf>;
}

/// Resolves the Steam root from the host: the registry on Windows, the
/// well-known install locations everywhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSteamRoot;

impl SteamRootResolver for HostSteamRoot {
    fn resolve(&self) -> Option<PathBuf> {
        let root = if cfg!(windows) {
            query_registry()
        } else {
            probe_install_dirs()
        };

        match &root {
            Some(path) => debug!("Steam root resolved to {:?}", path),
            None => warn!("Steam installation not found"),
        }
        root
    }
}

/// A resolver with a fixed answer; `None` simulates a host without Steam.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct FixedSteamRoot(pub Option<PathBuf>);

#[cfg(test)]
impl SteamRootResolver for FixedSteamRoot {
    fn resolve(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

fn query_registry() -> Option<PathBuf> {
    let output = match std::process::Command::new("reg")
        .args(["query", REGISTRY_KEY, "/v", REGISTRY_VALUE])
        .stderr(std::process::Stdio::null())
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to query registry for Steam path: {}", e);
            return None;
        }
    };

    if !output.status.success() {
        warn!("Registry key {} not found", REGISTRY_KEY);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let value = parse_registry_value(&stdout, REGISTRY_VALUE);
    if value.is_none() {
        warn!("Could not parse {} from registry output", REGISTRY_VALUE);
    }
    value.map(PathBuf::from)
}

/// Extract `<VALUE>` from a `reg query` line shaped like
/// `    SteamPath    REG_SZ    c:/program files (x86)/steam`.
pub fn parse_registry_value(output: &str, name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(name)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim_start();
        let (kind, value) = rest.split_once(char::is_whitespace)?;
        if !kind.starts_with("REG_") {
            return None;
        }
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn probe_install_dirs() -> Option<PathBuf> {
    let base_dirs = BaseDirs::new()?;
    let home = base_dirs.home_dir();

    [
        home.join(".steam/steam"),
        home.join(".local/share/Steam"),
        home.join(".steam/root"),
        home.join("Library/Application Support/Steam"),
    ]
    .into_iter()
    .find(|candidate| candidate.join("steamapps").is_dir())
}
