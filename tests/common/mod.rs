#![allow(dead_code)]

use async_trait::async_trait;
use soil_monitor_setup::config::{RebootPolicy, SetupConfig};
use soil_monitor_setup::core::{CommandOutput, CommandRunner, CommandSpec, ConnectivityProbe, Prompt, Storage};
use soil_monitor_setup::{LocalStorage, ProvisionContext, Result, SetupError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const CONFIG_PY: &str = r#"import mysql.connector
import serial

class Config:
    DB_CONFIG = {
        'user': "DevOps",
        'password': "DevTeam",
        'host': "192.168.1.100",
        'port': 3306,
        'database': "soilmonitornig"
    }

    SERIAL_PORT = 'COM3'
    SERIAL_BAUDRATE = 9600
"#;

/// 模擬 OS：記錄所有指令，並在暫存目錄中重現 git/tee/venv 的副作用
pub struct MockRunner {
    storage: LocalStorage,
    calls: Mutex<Vec<CommandSpec>>,
    groups: Mutex<String>,
    pub uid: String,
    /// None 時主要群組與使用者同名
    pub primary_group: Option<String>,
    pub python_version: Option<String>,
    pub sudo_ok: bool,
    pub repo_files: Vec<(String, String)>,
    pub failing_imports: Vec<String>,
}

impl MockRunner {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            calls: Mutex::new(Vec::new()),
            groups: Mutex::new("pi adm sudo".to_string()),
            uid: "1000".to_string(),
            primary_group: None,
            python_version: Some("Python 3.11.2".to_string()),
            sudo_ok: true,
            repo_files: [
                ("Config.py", CONFIG_PY),
                ("MainController.py", "print('main')\n"),
                ("SensorReader.py", "\n"),
                ("OnlineLogger.py", "\n"),
                ("OfflineLogger.py", "\n"),
            ]
            .iter()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect(),
            failing_imports: Vec::new(),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.display()).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn ran(&self, prefix: &str) -> bool {
        self.commands().iter().any(|c| c.starts_with(prefix))
    }

    fn ok(stdout: impl Into<String>) -> CommandOutput {
        CommandOutput {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    fn fail(stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    async fn write_repo(&self, dir: &Path) -> Result<()> {
        self.storage.create_dir_all(&dir.join(".git")).await?;
        for (name, content) in &self.repo_files {
            self.storage.write_file(&dir.join(name), content.as_bytes()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        let args: Vec<&str> = spec.args.iter().map(String::as_str).collect();

        match (spec.program.as_str(), args.as_slice()) {
            ("id", ["-u"]) => Ok(Self::ok(format!("{}\n", self.uid))),
            ("id", ["-gn", user]) => {
                let group = self.primary_group.clone().unwrap_or_else(|| user.to_string());
                Ok(Self::ok(format!("{}\n", group)))
            }
            ("id", ["-nG", _]) => Ok(Self::ok(self.groups.lock().unwrap().clone())),
            ("usermod", ["-aG", group, _]) => {
                let mut groups = self.groups.lock().unwrap();
                groups.push(' ');
                groups.push_str(group);
                Ok(Self::ok(""))
            }
            ("sudo", ["-v"]) if self.sudo_ok => Ok(Self::ok("")),
            ("sudo", ["-v"]) => Ok(Self::fail("Sorry, user pi may not run sudo")),
            ("python3", ["--version"]) => match &self.python_version {
                Some(version) => Ok(Self::ok(format!("{}\n", version))),
                None => Err(SetupError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "python3 not found",
                ))),
            },
            ("python3", ["-m", "venv", dir]) => {
                let python = PathBuf::from(dir).join("bin/python");
                self.storage.write_file(&python, b"").await?;
                Ok(Self::ok(""))
            }
            ("git", ["clone", .., dest]) => {
                self.write_repo(Path::new(dest)).await?;
                Ok(Self::ok(""))
            }
            ("git", ["-C", dir, "checkout", "--", file]) => {
                if let Some((_, content)) = self.repo_files.iter().find(|(n, _)| n == file) {
                    self.storage
                        .write_file(&Path::new(dir).join(file), content.as_bytes())
                        .await?;
                }
                Ok(Self::ok(""))
            }
            ("tee", [path]) => {
                let content = spec.stdin.clone().unwrap_or_default();
                self.storage.write_file(Path::new(path), content.as_bytes()).await?;
                Ok(Self::ok(content))
            }
            (program, ["-c", statement]) if program.ends_with("/bin/python") => {
                let module = statement.trim_start_matches("import ");
                if self.failing_imports.iter().any(|m| m == module) {
                    Ok(Self::fail(&format!("ModuleNotFoundError: No module named '{}'", module)))
                } else {
                    Ok(Self::ok(""))
                }
            }
            _ => Ok(Self::ok("")),
        }
    }
}

pub struct StaticProbe(pub Option<String>);

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn first_reachable(&self, _urls: &[String]) -> Option<String> {
        self.0.clone()
    }
}

pub struct FixedPrompt {
    pub interactive: bool,
    pub answer: bool,
}

#[async_trait]
impl Prompt for FixedPrompt {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn confirm(&self, _question: &str) -> bool {
        self.answer
    }
}

/// 以暫存目錄作為根目錄的測試環境
pub struct Harness {
    pub temp_dir: TempDir,
    pub storage: LocalStorage,
    pub runner: Arc<MockRunner>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_runner(|_| {})
    }

    pub fn with_runner(customize: impl FnOnce(&mut MockRunner)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let mut runner = MockRunner::new(storage.clone());
        customize(&mut runner);

        Self {
            temp_dir,
            storage,
            runner: Arc::new(runner),
        }
    }

    pub fn config() -> SetupConfig {
        let mut config = SetupConfig::default();
        config.reboot.policy = RebootPolicy::Never;
        config.reboot.countdown_secs = 0;
        config
    }

    pub fn context(&self, config: SetupConfig) -> ProvisionContext {
        self.context_with_probe(config, Arc::new(StaticProbe(Some("http://www.google.com".to_string()))))
    }

    pub fn context_with_probe(
        &self,
        config: SetupConfig,
        probe: Arc<dyn ConnectivityProbe>,
    ) -> ProvisionContext {
        ProvisionContext::new(config, self.runner.clone(), Arc::new(self.storage.clone()), probe)
            .with_env([("USER", "pi"), ("HOME", "/home/pi")])
            .with_prompt(Arc::new(FixedPrompt {
                interactive: false,
                answer: false,
            }))
            .with_execution_id("setup_test")
    }

    /// 讀取模擬根目錄下的檔案
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.storage.resolve(Path::new(path))).unwrap()
    }

    /// 模擬操作人員手動修改檔案
    pub fn write(&self, path: &str, content: &str) {
        std::fs::write(self.storage.resolve(Path::new(path)), content).unwrap();
    }

    pub fn exists(&self, path: &str) -> bool {
        self.storage.resolve(Path::new(path)).exists()
    }
}
