//! Profile photos kept on the local disk

use std::io;
use std::path::{Path, PathBuf};

use super::StoreError;
use super::db::{now, to_millis};

/// Photo storage rooted at one directory, one folder per user
#[derive(Debug, Clone)]
pub struct AvatarStore {
    root: PathBuf,
}

impl AvatarStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the photo to `<uid>/<uid>-<millis>.<ext>` and return its `file://` URL.
    ///
    /// Earlier photos are left in place; the profile only points at the newest.
    pub async fn upload(
        &self,
        user_id: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        if user_id.is_empty() || user_id.contains(['/', '\\']) || user_id.starts_with('.') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unusable user id for a photo path: {user_id:?}"),
            )
            .into());
        }

        let dir = self.root.join(user_id);
        tokio::fs::create_dir_all(&dir).await?;

        let ext = photo_extension(file_name);
        let path = dir.join(format!("{user_id}-{}.{ext}", to_millis(now())));
        tokio::fs::write(&path, bytes).await?;

        let path = std::path::absolute(&path)?;
        tracing::debug!(user_id, path = %path.display(), "stored profile photo");
        Ok(format!("file://{}", path.display()))
    }
}

/// Text after the last dot of the bare file name
fn photo_extension(file_name: &str) -> &str {
    let bare = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match bare.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_the_last_dot() {
        assert_eq!(photo_extension("me.jpeg"), "jpeg");
        assert_eq!(photo_extension("archive.tar.PNG"), "PNG");
        assert_eq!(photo_extension("../../etc/passwd"), "bin");
        assert_eq!(photo_extension("trailing."), "bin");
    }

    #[tokio::test]
    async fn upload_writes_under_the_user_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path());

        let url = store.upload("uid-7", "Me.PNG", b"\x89PNG").await.unwrap();
        let path = PathBuf::from(url.strip_prefix("file://").unwrap());

        assert!(path.starts_with(std::path::absolute(dir.path().join("uid-7")).unwrap()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("uid-7-"), "{name}");
        assert!(name.ends_with(".PNG"), "{name}");
        assert_eq!(std::fs::read(&path).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn user_id_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = AvatarStore::new(dir.path());

        for id in ["", "../other", "a/b", ".."] {
            let err = store.upload(id, "me.png", b"x").await.unwrap_err();
            assert!(matches!(err, StoreError::Io(_)), "{id:?}");
        }
    }
}
