use crate::domain::ports::Storage;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

/// 本機檔案系統。`root` 之下解析所有絕對路徑，正式執行時為 `/`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn system() -> Self {
        Self::new("/")
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path))?;
        Ok(data)
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(self.resolve(path))?;
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve(path);
        if full_path.exists() {
            fs::remove_dir_all(full_path)?;
        }
        Ok(())
    }

    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(self.resolve(path), fs::Permissions::from_mode(mode))?;
        }
        #[cfg(not(unix))]
        let _ = (path, mode);
        Ok(())
    }
}
