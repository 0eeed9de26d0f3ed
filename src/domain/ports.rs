use crate::domain::model::{CommandOutput, CommandSpec};
use crate::utils::error::{Result, SetupError};
use async_trait::async_trait;
use std::path::Path;

/// 使用者可寫入的檔案系統（家目錄下的 app 與虛擬環境）
#[async_trait]
pub trait Storage: Send + Sync {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
    async fn exists(&self, path: &Path) -> bool;
    async fn create_dir_all(&self, path: &Path) -> Result<()>;
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;
    async fn set_mode(&self, path: &Path, mode: u32) -> Result<()>;

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let data = self.read_file(path).await?;
        String::from_utf8(data).map_err(|e| SetupError::ConfigError {
            message: format!("{} is not valid UTF-8: {}", path.display(), e),
        })
    }
}

/// 外部指令執行器
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 執行指令並回傳結果；非零結束碼不視為錯誤
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// 非零結束碼轉為 CommandFailed
    async fn run_checked(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(spec).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(SetupError::CommandFailed {
                command: spec.display(),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// 網路連線探測
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// 回傳第一個有回應的 URL
    async fn first_reachable(&self, urls: &[String]) -> Option<String>;
}

/// 與操作者互動（重新開機確認）
#[async_trait]
pub trait Prompt: Send + Sync {
    fn is_interactive(&self) -> bool;
    async fn confirm(&self, question: &str) -> bool;
}
