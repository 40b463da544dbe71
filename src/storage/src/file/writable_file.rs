use std::path::Path;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::Writable;

pub struct WritableFile {
    f: File,
}

impl WritableFile {
    /// create_truncate opens `path` for writing, discarding any previous content.
    pub async fn create_truncate(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path.as_ref())
            .await?;

        Ok(Self { f })
    }

    pub async fn close(mut self) -> std::io::Result<()> {
        self.f.flush().await?;
        self.f.shutdown().await
    }
}

#[async_trait]
impl Writable for WritableFile {
    async fn append(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.f.write_all(data).await?;
        Ok(data.len())
    }

    async fn sync(&mut self) -> std::io::Result<()> {
        self.f.flush().await?;
        self.f.sync_all().await
    }
}

#[cfg(test)]
mod tests {
    use crate::file::writable_file::WritableFile;
    use crate::Writable;

    #[tokio::test]
    async fn test_writable_file_append() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.as_ref().join("append_test");

        let mut w = WritableFile::create_truncate(&path).await?;
        assert_eq!(w.append(b"0123").await?, 4);
        assert_eq!(w.append(b"4567").await?, 4);
        w.sync().await?;
        w.close().await?;

        let data = tokio::fs::read(&path).await?;
        assert_eq!(data.as_slice(), b"01234567");

        Ok(())
    }

    #[tokio::test]
    async fn test_writable_file_truncates_existing() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.as_ref().join("exists");
        tokio::fs::write(&path, b"leftover").await?;

        let mut w = WritableFile::create_truncate(&path).await?;
        w.append(b"yz").await?;
        w.close().await?;
        assert_eq!(tokio::fs::read(&path).await?.as_slice(), b"yz");

        Ok(())
    }
}
