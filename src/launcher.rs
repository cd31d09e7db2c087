use std::path::Path;
use std::process::{Child, Command, Stdio};
use thiserror::Error;
use tracing::{error, info};

use crate::model::{GameRecord, GameSource};

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{title} has no executable configured.")]
    NoExecutable { title: String },
    #[error("Executable not found: {path}")]
    MissingExecutable { path: String },
    #[error("Failed to launch `{command}`: {source}")]
    LaunchFailed {
        command: String,
        source: std::io::Error,
    },
}

/// What the caller can wait on after a launch.
#[derive(Debug)]
pub enum LaunchHandle {
    /// Handed off to another program (the Steam client); nothing to wait for.
    Detached,
    Child(Child),
}

pub fn launch_game(game: &GameRecord) -> Result<LaunchHandle, LaunchError> {
    match game.source {
        GameSource::Steam => {
            let uri = steam_run_uri(&game.id);
            info!("Launching Steam game {} via {}", game.title, uri);
            open_uri(&uri)?;
            Ok(LaunchHandle::Detached)
        }
        GameSource::Manual => {
            let exe = game
                .executable_path
                .as_deref()
                .ok_or_else(|| LaunchError::NoExecutable {
                    title: game.title.clone(),
                })?;
            launch_executable(exe).map(LaunchHandle::Child)
        }
    }
}

pub fn steam_run_uri(app_id: &str) -> String {
    format!("steam://run/{}", app_id)
}

fn launch_executable(exe: &Path) -> Result<Child, LaunchError> {
    if !exe.is_file() {
        return Err(LaunchError::MissingExecutable {
            path: exe.display().to_string(),
        });
    }

    let mut command = Command::new(exe);
    if let Some(dir) = exe.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        command.current_dir(dir);
    }

    spawn(&mut command, &exe.display().to_string())
}

fn open_uri(uri: &str) -> Result<(), LaunchError> {
    let mut command = if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", uri]);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(uri);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(uri);
        command
    };

    spawn(&mut command, uri).map(|_| ())
}

fn spawn(command: &mut Command, label: &str) -> Result<Child, LaunchError> {
    match command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            info!("Successfully launched {} (PID: {})", label, child.id());
            Ok(child)
        }
        Err(e) => {
            error!("Failed to launch {}: {}", label, e);
            Err(LaunchError::LaunchFailed {
                command: label.to_string(),
                source: e,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_steam_run_uri() {
        assert_eq!(steam_run_uri("570"), "steam://run/570");
    }

    #[test]
    fn test_missing_executable_is_reported() {
        let game = GameRecord::manual("Ghost", PathBuf::from("/no/such/dir/ghost.exe"));
        match launch_game(&game) {
            Err(LaunchError::MissingExecutable { path }) => {
                assert!(path.ends_with("ghost.exe"))
            }
            other => panic!("expected missing executable, got {:?}", other),
        }
    }

    #[test]
    fn test_manual_game_without_executable() {
        let mut game = GameRecord::manual("Nothing", PathBuf::new());
        game.executable_path = None;
        assert!(matches!(
            launch_game(&game),
            Err(LaunchError::NoExecutable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_manual_game_runs_in_executable_folder() {
        use std::os::unix::fs::PermissionsExt;
        use std::time::Duration;

        let dir = tempfile::TempDir::new().unwrap();
        let game_dir = dir.path().join("game");
        std::fs::create_dir(&game_dir).unwrap();
        let script = game_dir.join("run.sh");
        std::fs::write(&script, "#!/bin/sh\npwd -P > cwd.txt\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let game = GameRecord::manual("Script", script);
        // Another test thread forking while the script was open for writing
        // makes exec fail with ETXTBSY for a moment.
        let mut attempts = 0;
        let mut child = loop {
            match launch_game(&game) {
                Ok(LaunchHandle::Child(child)) => break child,
                Err(LaunchError::LaunchFailed { source, .. })
                    if source.raw_os_error() == Some(26) && attempts < 20 =>
                {
                    attempts += 1;
                    std::thread::sleep(Duration::from_millis(50));
                }
                other => panic!("expected a child process, got {:?}", other),
            }
        };
        assert!(child.wait().unwrap().success());

        let written = std::fs::read_to_string(game_dir.join("cwd.txt")).unwrap();
        assert_eq!(
            PathBuf::from(written.trim()),
            std::fs::canonicalize(&game_dir).unwrap()
        );
    }
}
