use std::io;
use std::io::ErrorKind;
use std::path::Path;

pub mod writable_file;

/// create_dir_all creates `path` and its parents. Concurrent creators of the
/// same directory all succeed.
pub async fn create_dir_all(path: impl AsRef<Path>) -> io::Result<()> {
    match tokio::fs::create_dir_all(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.as_ref().is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// remove_file_if_exists deletes a file, returning false if it was already absent.
pub async fn remove_file_if_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match tokio::fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// remove_dir_if_exists deletes a directory tree, returning false if it was already absent.
pub async fn remove_dir_if_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match tokio::fs::remove_dir_all(path.as_ref()).await {
        Ok(()) => {
            tracing::debug!(path = %path.as_ref().display(), "removed directory");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use crate::file::{create_dir_all, remove_dir_if_exists, remove_file_if_exists};

    #[tokio::test]
    async fn test_create_dir_all_racing() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let target = dir.as_ref().join("a").join("b");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let target = target.clone();
            handles.push(tokio::spawn(async move { create_dir_all(target).await }));
        }
        for h in handles {
            h.await.unwrap()?;
        }
        assert!(target.is_dir());

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_idempotent() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.as_ref().join("f");
        tokio::fs::write(&file, b"1").await?;

        assert!(remove_file_if_exists(&file).await?);
        assert!(!remove_file_if_exists(&file).await?);

        let sub = dir.as_ref().join("sub");
        create_dir_all(&sub).await?;
        assert!(remove_dir_if_exists(&sub).await?);
        assert!(!remove_dir_if_exists(&sub).await?);

        Ok(())
    }
}
