use crate::config::SetupConfig;
use crate::utils::system_info::HostFacts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 直譯器版本，可由 "Python 3.11.2" 或 "3.9" 解析
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for PythonVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw.strip_prefix("Python").unwrap_or(raw).trim();
        // 去掉像 "3.12.0rc1" 之類的後綴
        let numeric: String = raw
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let mut next = |name: &str, required: bool| -> Result<u32, String> {
            match parts.next() {
                Some(p) => p
                    .parse::<u32>()
                    .map_err(|e| format!("invalid {} version '{}': {}", name, p, e)),
                None if required => Err(format!("missing {} version in '{}'", name, s.trim())),
                None => Ok(0),
            }
        };

        let major = next("major", true)?;
        let minor = next("minor", true)?;
        let patch = next("patch", false)?;
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 偵測到的目標使用者與主機
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostContext {
    pub user: String,
    /// 使用者的主要群組
    pub group: String,
    pub home: PathBuf,
    pub python: PythonVersion,
    pub facts: HostFacts,
}

/// 所有產出物的絕對路徑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallLayout {
    pub app_dir: PathBuf,
    pub venv_dir: PathBuf,
    pub launcher: PathBuf,
    pub log_dir: PathBuf,
    pub log_file: PathBuf,
    pub config_file: PathBuf,
    pub unit_file: PathBuf,
    pub logrotate_file: PathBuf,
    pub cron_file: PathBuf,
}

impl InstallLayout {
    pub fn resolve(home: &Path, config: &SetupConfig) -> Self {
        let app_dir = home.join(&config.repository.dir_name);
        let log_dir = app_dir.join(&config.logging.dir_name);
        let service = &config.target.service_name;

        Self {
            venv_dir: home.join(&config.python.venv_dir_name),
            launcher: app_dir.join(&config.service.launcher_name),
            log_file: log_dir.join(&config.logging.file_name),
            config_file: app_dir.join(&config.app.config_file),
            unit_file: PathBuf::from(format!("/etc/systemd/system/{}.service", service)),
            logrotate_file: PathBuf::from(format!("/etc/logrotate.d/{}", service)),
            cron_file: PathBuf::from(format!("/etc/cron.d/{}", service)),
            log_dir,
            app_dir,
        }
    }

    pub fn venv_python(&self) -> PathBuf {
        self.venv_dir.join("bin").join("python")
    }

    pub fn venv_pip(&self) -> PathBuf {
        self.venv_dir.join("bin").join("pip")
    }
}

/// 外部指令描述
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// 以 sudo 執行
    pub privileged: bool,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
    pub current_dir: Option<PathBuf>,
    /// 執行期間逐行輸出到日誌
    #[serde(default)]
    pub streamed: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn sudo(program: impl Into<String>) -> Self {
        Self {
            privileged: true,
            ..Self::new(program)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn streamed(mut self) -> Self {
        self.streamed = true;
        self
    }

    /// 實際要執行的 argv（含 sudo 與環境變數前綴）
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::new();
        if self.privileged {
            argv.push("sudo".to_string());
            if !self.env.is_empty() {
                argv.push("env".to_string());
                argv.extend(self.env.iter().map(|(k, v)| format!("{}={}", k, v)));
            }
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    pub fn display(&self) -> String {
        self.argv().join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// 被訊號終止時為 None
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// 單一步驟的執行報告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepReport {
    pub summary: String,
    pub artifacts: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

impl StepReport {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}
