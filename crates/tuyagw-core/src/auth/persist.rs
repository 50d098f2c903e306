use std::path::{Path, PathBuf};

use super::error::PersistError;
use super::token::AuthRecord;

/// The JSON file holding the last successful token response.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record. Runs once at startup, before any request is served.
    pub fn load(&self) -> Result<AuthRecord, PersistError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                PersistError::NotFound(self.path.clone())
            } else {
                PersistError::Io {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&contents).map_err(|source| PersistError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the file with `record`.
    ///
    /// Writes a sibling temp file and renames it over the target so a crash
    /// mid-write never leaves a truncated record behind.
    pub async fn save(&self, record: &AuthRecord) -> Result<(), PersistError> {
        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let contents = serde_json::to_string(record).map_err(|source| PersistError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, contents).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }

    /// Delete the file. A file that is already gone is not an error.
    pub async fn remove(&self) -> Result<(), PersistError> {
        match tokio::fs::remove_file(&self.path).await {
            Err(source) if source.kind() != std::io::ErrorKind::NotFound => {
                Err(PersistError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::TokenState;

    fn record() -> AuthRecord {
        serde_json::from_str(
            r#"{"t": 1700000000000, "success": true,
                "result": {"access_token": "tok", "expire_time": 3600, "refresh_token": "ref"}}"#,
        )
        .expect("valid record")
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TokenFile::new(dir.path().join("nested").join("auth.json"));

        file.save(&record()).await.expect("save");
        let loaded = file.load().expect("load");

        assert_eq!(loaded, record());
        assert_eq!(
            TokenState::from_record(loaded),
            TokenState::from_record(record())
        );
        assert!(!file.tmp_path().exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TokenFile::new(dir.path().join("auth.json"));
        std::fs::write(file.path(), "old garbage that is much longer than json").expect("seed");

        file.save(&record()).await.expect("save");
        assert_eq!(file.load().expect("load"), record());
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TokenFile::new(dir.path().join("auth.json"));
        file.save(&record()).await.expect("save");

        file.remove().await.expect("remove");
        assert!(!file.path().exists());
        file.remove().await.expect("removing a missing file");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TokenFile::new(dir.path().join("absent.json"));
        assert!(matches!(file.load(), Err(PersistError::NotFound(_))));
    }

    #[test]
    fn test_load_unparsable_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = TokenFile::new(dir.path().join("auth.json"));
        std::fs::write(file.path(), "{not json").expect("seed");
        assert!(matches!(file.load(), Err(PersistError::Parse { .. })));
    }
}
