use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Scheme of references pointing into app-owned storage.
pub const LOCAL_FILE_SCHEME: &str = "local-file://";
const COVERS_DIR: &str = "covers";

/// App-owned storage for cover images of manual games.
///
/// Covers are stored as `{data_dir}/covers/{id}{ext}` and referenced as
/// `local-file://covers/{id}{ext}`, so a record can move between machines
/// without carrying absolute paths.
#[derive(Debug, Clone)]
pub struct CoverStore {
    data_dir: PathBuf,
}

impl CoverStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.data_dir.join(COVERS_DIR)
    }

    pub fn is_app_owned(reference: &str) -> bool {
        reference.starts_with(LOCAL_FILE_SCHEME)
    }

    /// Absolute path of an app-owned reference; `None` for anything else.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let relative = reference.strip_prefix(LOCAL_FILE_SCHEME)?;
        if relative.is_empty() || Path::new(relative).is_absolute() || relative.contains("..") {
            return None;
        }
        Some(self.data_dir.join(relative))
    }

    /// Copy `source` into the covers directory as `{id}{ext}` and return the
    /// reference to the stored file. The source file is left in place.
    pub fn import(&self, id: &str, source: &Path) -> Result<String> {
        let covers_dir = self.covers_dir();
        fs::create_dir_all(&covers_dir).context("Failed to create covers directory")?;

        let file_name = format!("{}{}", id, extension_of(source));
        let target = covers_dir.join(&file_name);
        fs::copy(source, &target).with_context(|| {
            format!(
                "Failed to copy cover {} to {}",
                source.display(),
                target.display()
            )
        })?;

        Ok(format!("{}{}/{}", LOCAL_FILE_SCHEME, COVERS_DIR, file_name))
    }

    /// Delete the file behind an app-owned reference. Missing files and
    /// foreign references are not an error.
    pub fn remove(&self, reference: &str) -> Result<()> {
        let Some(path) = self.resolve(reference) else {
            return Ok(());
        };
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete cover {}", path.display()))?;
        }
        Ok(())
    }
}

/// Extension including the leading dot, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_import_copies_and_names_by_id() {
        let data = TempDir::new().unwrap();
        let source_dir = TempDir::new().unwrap();
        let source = source_dir.path().join("box art.PNG");
        fs::write(&source, b"png").unwrap();

        let store = CoverStore::new(data.path().to_path_buf());
        let reference = store.import("abc", &source).unwrap();

        assert_eq!(reference, "local-file://covers/abc.PNG");
        assert!(source.exists());
        let stored = store.resolve(&reference).unwrap();
        assert_eq!(stored, data.path().join("covers").join("abc.PNG"));
        assert_eq!(fs::read(stored).unwrap(), b"png");
    }

    #[test]
    fn test_import_without_extension() {
        let data = TempDir::new().unwrap();
        let source = data.path().join("cover");
        fs::write(&source, b"x").unwrap();

        let store = CoverStore::new(data.path().to_path_buf());
        assert_eq!(
            store.import("id1", &source).unwrap(),
            "local-file://covers/id1"
        );
    }

    #[test]
    fn test_import_missing_source_fails() {
        let data = TempDir::new().unwrap();
        let store = CoverStore::new(data.path().to_path_buf());
        assert!(store.import("id", Path::new("/no/such/file.png")).is_err());
    }

    #[test]
    fn test_resolve_rejects_foreign_references() {
        let store = CoverStore::new(PathBuf::from("/data"));
        assert_eq!(store.resolve("https://cdn/header.jpg"), None);
        assert_eq!(store.resolve("local-file://"), None);
        assert_eq!(store.resolve("local-file://../etc/passwd"), None);
        assert_eq!(
            store.resolve("local-file://covers/a.jpg"),
            Some(PathBuf::from("/data/covers/a.jpg"))
        );
    }

    #[test]
    fn test_remove() {
        let data = TempDir::new().unwrap();
        let store = CoverStore::new(data.path().to_path_buf());
        let source = data.path().join("c.jpg");
        fs::write(&source, b"x").unwrap();
        let reference = store.import("gone", &source).unwrap();

        store.remove(&reference).unwrap();
        assert!(!store.resolve(&reference).unwrap().exists());
        // Second removal and foreign references are no-ops.
        store.remove(&reference).unwrap();
        store.remove("https://cdn/x.jpg").unwrap();
    }
}
