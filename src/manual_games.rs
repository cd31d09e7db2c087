//! Create, update and delete user-registered games.

use crate::covers::CoverStore;
use anyhow::anyhow;
use crate::model::{GameRecord, ManualGameUpdate, NewManualGame};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ManualGameError {
    #[error("{0} is required")]
    Validation(&'static str),
    #[error("Failed to store cover image: {0:#}")]
    CoverImport(anyhow::Error),
}

pub fn create(
    games: &mut Vec<GameRecord>,
    covers: &CoverStore,
    input: NewManualGame,
) -> Result<GameRecord, ManualGameError> {
    let title = input.title.trim();
    if title.is_empty() {
        return Err(ManualGameError::Validation("Title"));
    }
    if is_blank(&input.executable_path) {
        return Err(ManualGameError::Validation("Executable path"));
    }

    let mut game = GameRecord::manual(title, input.executable_path);
    if let Some(source) = input.cover_source.filter(|path| !is_blank(path)) {
        game.cover_art = covers
            .import(&game.id, &source)
            .map_err(ManualGameError::CoverImport)?;
    }

    info!("Added manual game: {} ({})", game.title, game.id);
    games.push(game.clone());
    Ok(game)
}

/// Merge `update` into the stored record. Returns `Ok(None)` when no record
/// has the given id.
///
/// A new cover source that is not a readable file is rejected before the
/// record or the stored cover change. If the copy fails after the previous
/// cover was deleted, the record keeps an empty cover and the error is
/// returned; callers persist the record in that case.
pub fn update(
    games: &mut [GameRecord],
    covers: &CoverStore,
    update: ManualGameUpdate,
) -> Result<Option<GameRecord>, ManualGameError> {
    let Some(game) = games.iter_mut().find(|g| g.id == update.id) else {
        return Ok(None);
    };

    let title = match update.title {
        Some(title) if title.trim().is_empty() => {
            return Err(ManualGameError::Validation("Title"))
        }
        Some(title) => Some(title.trim().to_string()),
        None => None,
    };
    if update.executable_path.as_deref().is_some_and(is_blank) {
        return Err(ManualGameError::Validation("Executable path"));
    }

    if let Some(cover) = update.cover_art.filter(|c| !c.trim().is_empty()) {
        if CoverStore::is_app_owned(&cover) {
            game.cover_art = cover;
        } else {
            let source = Path::new(&cover);
            if !source.is_file() {
                return Err(ManualGameError::CoverImport(anyhow!(
                    "{} is not a readable file",
                    source.display()
                )));
            }
            let previous = std::mem::take(&mut game.cover_art);
            if let Err(e) = covers.remove(&previous) {
                warn!("Failed to delete old cover for game {}: {:#}", game.id, e);
            }
            game.cover_art = covers
                .import(&game.id, source)
                .map_err(ManualGameError::CoverImport)?;
        }
    }
    if let Some(title) = title {
        game.title = title;
    }
    if let Some(path) = update.executable_path {
        game.executable_path = Some(path);
    }

    info!("Updated manual game: {} ({})", game.title, game.id);
    Ok(Some(game.clone()))
}

/// Remove the record with `id`; its stored cover is deleted best-effort.
pub fn delete(games: &mut Vec<GameRecord>, covers: &CoverStore, id: &str) -> Option<GameRecord> {
    let index = games.iter().position(|g| g.id == id)?;
    let removed = games.remove(index);

    if removed.has_cover() {
        if let Err(e) = covers.remove(&removed.cover_art) {
            warn!("Failed to delete cover art for game {}: {:#}", id, e);
        }
    }

    info!("Deleted manual game: {} ({})", removed.title, removed.id);
    Some(removed)
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        data: TempDir,
        covers: CoverStore,
    }

    impl Fixture {
        fn new() -> Self {
            let data = TempDir::new().unwrap();
            let covers = CoverStore::new(data.path().join("appdata"));
            Self { data, covers }
        }

        fn image(&self, name: &str) -> PathBuf {
            let path = self.data.path().join(name);
            fs::write(&path, name.as_bytes()).unwrap();
            path
        }
    }

    fn new_game(title: &str, cover: Option<PathBuf>) -> NewManualGame {
        NewManualGame {
            title: title.to_string(),
            executable_path: PathBuf::from("/games/bin/game"),
            cover_source: cover,
        }
    }

    #[test]
    fn test_create_requires_title_and_executable() {
        let fx = Fixture::new();
        let mut games = Vec::new();

        let err = create(&mut games, &fx.covers, new_game("  ", None)).unwrap_err();
        assert!(matches!(err, ManualGameError::Validation("Title")));

        let input = NewManualGame {
            title: "Doom".to_string(),
            ..Default::default()
        };
        let err = create(&mut games, &fx.covers, input).unwrap_err();
        assert!(matches!(err, ManualGameError::Validation("Executable path")));
        assert!(games.is_empty());
    }

    #[test]
    fn test_create_copies_cover() {
        let fx = Fixture::new();
        let source = fx.image("doom.jpg");
        let mut games = Vec::new();

        let game = create(&mut games, &fx.covers, new_game("Doom", Some(source.clone()))).unwrap();

        assert_eq!(games, vec![game.clone()]);
        assert_eq!(game.cover_art, format!("local-file://covers/{}.jpg", game.id));
        assert!(fx.covers.resolve(&game.cover_art).unwrap().exists());
        assert!(source.exists());
    }

    #[test]
    fn test_create_with_unreadable_cover_fails() {
        let fx = Fixture::new();
        let mut games = Vec::new();
        let result = create(
            &mut games,
            &fx.covers,
            new_game("Doom", Some(PathBuf::from("/missing.png"))),
        );

        assert!(matches!(result, Err(ManualGameError::CoverImport(_))));
        assert!(games.is_empty());
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let fx = Fixture::new();
        let mut games = vec![GameRecord::manual("A", PathBuf::from("/a"))];
        let before = games.clone();

        let result = update(
            &mut games,
            &fx.covers,
            ManualGameUpdate {
                id: "missing".to_string(),
                title: Some("B".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(result.is_none());
        assert_eq!(games, before);
    }

    #[test]
    fn test_update_merges_fields() {
        let fx = Fixture::new();
        let mut games = Vec::new();
        let game = create(&mut games, &fx.covers, new_game("Doom", None)).unwrap();

        let updated = update(
            &mut games,
            &fx.covers,
            ManualGameUpdate {
                id: game.id.clone(),
                title: Some("Doom II".to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated.title, "Doom II");
        assert_eq!(updated.executable_path, game.executable_path);
        assert_eq!(updated.id, game.id);
        assert_eq!(games[0], updated);
    }

    #[test]
    fn test_update_rejects_blank_title() {
        let fx = Fixture::new();
        let mut games = vec![GameRecord::manual("A", PathBuf::from("/a"))];
        let id = games[0].id.clone();

        let result = update(
            &mut games,
            &fx.covers,
            ManualGameUpdate {
                id,
                title: Some(" ".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ManualGameError::Validation("Title"))));
        assert_eq!(games[0].title, "A");
    }

    #[test]
    fn test_update_replaces_cover_file() {
        let fx = Fixture::new();
        let mut games = Vec::new();
        let game = create(
            &mut games,
            &fx.covers,
            new_game("Doom", Some(fx.image("old.png"))),
        )
        .unwrap();
        let old_file = fx.covers.resolve(&game.cover_art).unwrap();

        let new_source = fx.image("new.jpg");
        let updated = update(
            &mut games,
            &fx.covers,
            ManualGameUpdate {
                id: game.id.clone(),
                cover_art: Some(new_source.to_string_lossy().to_string()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

        assert!(!old_file.exists());
        assert_eq!(
            updated.cover_art,
            format!("local-file://covers/{}.jpg", game.id)
        );
        let new_file = fx.covers.resolve(&updated.cover_art).unwrap();
        assert_eq!(fs::read(new_file).unwrap(), b"new.jpg");
    }

    #[test]
    fn test_update_with_missing_cover_leaves_record_untouched() {
        let fx = Fixture::new();
        let mut games = Vec::new();
        let game = create(
            &mut games,
            &fx.covers,
            new_game("Doom", Some(fx.image("old.png"))),
        )
        .unwrap();
        let old_file = fx.covers.resolve(&game.cover_art).unwrap();

        let result = update(
            &mut games,
            &fx.covers,
            ManualGameUpdate {
                id: game.id.clone(),
                title: Some("Doom II".to_string()),
                cover_art: Some("/no/such/new.jpg".to_string()),
                ..Default::default()
            },
        );

        assert!(matches!(result, Err(ManualGameError::CoverImport(_))));
        assert_eq!(games[0], game);
        assert!(old_file.exists());
    }

    #[test]
    fn test_update_keeps_app_owned_reference() {
        let fx = Fixture::new();
        let mut games = Vec::new();
        let game = create(
            &mut games,
            &fx.covers,
            new_game("Doom", Some(fx.image("c.png"))),
        )
        .unwrap();

        let updated = update(
            &mut games,
            &fx.covers,
            ManualGameUpdate {
                id: game.id.clone(),
                cover_art: Some(game.cover_art.clone()),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();

        assert_eq!(updated.cover_art, game.cover_art);
        assert!(fx.covers.resolve(&updated.cover_art).unwrap().exists());
    }

    #[test]
    fn test_delete_removes_cover_file() {
        let fx = Fixture::new();
        let mut games = Vec::new();
        let game = create(
            &mut games,
            &fx.covers,
            new_game("Doom", Some(fx.image("c.webp"))),
        )
        .unwrap();
        let file = fx.covers.resolve(&game.cover_art).unwrap();
        assert!(file.exists());

        let removed = delete(&mut games, &fx.covers, &game.id).unwrap();

        assert_eq!(removed.id, game.id);
        assert!(games.is_empty());
        assert!(!file.exists());
        assert!(delete(&mut games, &fx.covers, &game.id).is_none());
    }
}
