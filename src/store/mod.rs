// src/store/mod.rs
//! The Media Store: one flat directory of downloaded media plus the
//! rendered feed and archive artifacts.

pub mod name;

pub use name::{MediaName, PUBLISHABLE_EXTENSIONS};

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::{ConfigError, StoreError};

/// Filesystem-level publish boundary for a co-located web server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// World-readable (0644).
    Public,
    /// Owner-only (0600).
    Private,
}

impl Visibility {
    pub fn mode(self) -> u32 {
        match self {
            Visibility::Public => 0o644,
            Visibility::Private => 0o600,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    /// Fails unless `path` is an existing directory.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = path.into();
        if !root.is_dir() {
            return Err(ConfigError::StorePath(root.display().to_string()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `rel` below the root. Only plain components are accepted, so
    /// nothing can be written outside the store.
    fn confined(&self, rel: &Path) -> Result<PathBuf, StoreError> {
        let plain = rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !plain || rel.as_os_str().is_empty() {
            return Err(StoreError::InvalidName(rel.display().to_string()));
        }
        Ok(self.root.join(rel))
    }

    pub fn path_of(&self, name: &MediaName) -> PathBuf {
        self.root.join(name.file_name())
    }

    /// Dedup check. A story counts as stored if either its canonical file or
    /// its unplayable-container fallback exists.
    pub async fn contains(&self, name: &MediaName) -> bool {
        exists(&self.path_of(name)).await || exists(&self.path_of(&name.with_ext("zip"))).await
    }

    /// Every media-shaped file in the store, newest first.
    pub async fn snapshot(&self) -> Result<Vec<MediaName>, StoreError> {
        let mut rd = fs::read_dir(&self.root)
            .await
            .map_err(|e| StoreError::io("read_dir", &self.root, e))?;
        let mut out = Vec::new();
        while let Some(entry) = rd
            .next_entry()
            .await
            .map_err(|e| StoreError::io("read_dir", &self.root, e))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().and_then(MediaName::parse) {
                out.push(name);
            }
        }
        out.sort_by(MediaName::newest_first);
        Ok(out)
    }

    /// Accounts that own at least one publishable file.
    pub async fn accounts(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .filter(MediaName::is_publishable)
            .map(|n| n.account().to_string())
            .collect())
    }

    /// Write `bytes` to `rel` (relative to the root) via `.<file>.part` then
    /// rename, so scans never observe a partial file. Permissions are set
    /// before the rename.
    pub async fn write_atomic(
        &self,
        rel: &Path,
        bytes: &[u8],
        visibility: Visibility,
    ) -> Result<PathBuf, StoreError> {
        let dest = self.confined(rel)?;
        let file_name = dest
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| StoreError::InvalidName(rel.display().to_string()))?;
        let tmp = dest.with_file_name(format!(".{file_name}.part"));

        let res = async {
            fs::write(&tmp, bytes)
                .await
                .map_err(|e| StoreError::io("write", &tmp, e))?;
            set_mode(&tmp, visibility).await?;
            fs::rename(&tmp, &dest)
                .await
                .map_err(|e| StoreError::io("rename", &dest, e))
        }
        .await;

        if let Err(e) = res {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(dest)
    }

    /// Create `rel` and its parents below the root.
    pub async fn ensure_dir(&self, rel: &Path) -> Result<PathBuf, StoreError> {
        let dir = self.confined(rel)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io("create_dir_all", &dir, e))?;
        Ok(dir)
    }
}

async fn exists(p: &Path) -> bool {
    fs::try_exists(p).await.unwrap_or(false)
}

#[cfg(unix)]
async fn set_mode(p: &Path, visibility: Visibility) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(p, std::fs::Permissions::from_mode(visibility.mode()))
        .await
        .map_err(|e| StoreError::io("chmod", p, e))
}

#[cfg(not(unix))]
async fn set_mode(_p: &Path, _visibility: Visibility) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            MediaStore::open(&missing),
            Err(ConfigError::StorePath(_))
        ));
        assert!(MediaStore::open(tmp.path()).is_ok());
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = MediaStore::open(tmp.path()).unwrap();
        let dest = store
            .write_atomic(Path::new("a~0000000000001.jpg"), b"img", Visibility::Public)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"img");
        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a~0000000000001.jpg".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_skips_dirs_and_foreign_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("archive")).unwrap();
        std::fs::write(tmp.path().join("a.xml"), "x").unwrap();
        std::fs::write(tmp.path().join(".a~1.jpg.part"), "x").unwrap();
        std::fs::write(tmp.path().join("a~1.jpg"), "x").unwrap();
        std::fs::write(tmp.path().join("a~2.zip"), "x").unwrap();
        let store = MediaStore::open(tmp.path()).unwrap();
        let snap = store.snapshot().await.unwrap();
        let names: Vec<_> = snap.iter().map(|n| n.file_name()).collect();
        assert_eq!(names, vec!["a~2.zip", "a~1.jpg"]);
        assert_eq!(
            store.accounts().await.unwrap().into_iter().collect::<Vec<_>>(),
            vec!["a".to_string()]
        );
    }

    #[tokio::test]
    async fn writes_outside_the_root_are_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("store");
        std::fs::create_dir(&root).unwrap();
        let store = MediaStore::open(&root).unwrap();

        for rel in ["../escaped.xml", "archive/../../x.html", "/tmp/abs.xml", ""] {
            let res = store
                .write_atomic(Path::new(rel), b"x", Visibility::Public)
                .await;
            assert!(matches!(res, Err(StoreError::InvalidName(_))), "{rel}");
        }
        assert!(matches!(
            store.ensure_dir(Path::new("archive/../../up")).await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(!tmp.path().join("escaped.xml").exists());
        assert!(!tmp.path().join("up").exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn contains_recognises_zip_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a~0000000000007.zip"), "PK").unwrap();
        let store = MediaStore::open(tmp.path()).unwrap();
        let name = MediaName::parse("a~0000000000007.mp4").unwrap();
        assert!(store.contains(&name).await);
        let other = MediaName::parse("a~0000000000008.mp4").unwrap();
        assert!(!store.contains(&other).await);
    }
}
