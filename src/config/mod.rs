#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{Result, SetupError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "soil-setup.toml";

/// 安裝程式設定。所有欄位都有預設值，不帶設定檔時即為原本固定的常數
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    pub target: TargetConfig,
    pub repository: RepositoryConfig,
    pub system: SystemConfig,
    pub python: PythonConfig,
    pub app: AppConfig,
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub schedule: ScheduleConfig,
    pub network: NetworkConfig,
    pub reboot: RebootConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// 未設定時由 SUDO_USER / USER 推得
    pub user: Option<String>,
    /// 未設定時由 HOME 或 /home/<user> 推得
    pub home: Option<String>,
    pub service_name: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            user: None,
            home: None,
            service_name: "soil-monitor".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub url: String,
    pub branch: Option<String>,
    /// 家目錄下的資料夾名稱
    pub dir_name: String,
    pub required_files: Vec<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            url: "https://github.com/DevTeam/SoilMonitor.git".to_string(),
            branch: None,
            dir_name: "SoilMonitor".to_string(),
            required_files: [
                "Config.py",
                "MainController.py",
                "SensorReader.py",
                "OnlineLogger.py",
                "OfflineLogger.py",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub packages: Vec<String>,
    pub serial_group: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            packages: [
                "python3",
                "python3-venv",
                "python3-pip",
                "python3-dev",
                "git",
                "logrotate",
                "cron",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            serial_group: "dialout".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PythonConfig {
    pub interpreter: String,
    /// 家目錄下的虛擬環境資料夾名稱
    pub venv_dir_name: String,
    pub profiles: Vec<PythonProfile>,
}

/// 依直譯器版本挑選的套件組合
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PythonProfile {
    /// 例如 "3.11"
    pub min_version: String,
    pub packages: Vec<String>,
    /// 冒煙測試要 import 的模組；留空則由套件名稱推導
    #[serde(default)]
    pub smoke_modules: Vec<String>,
}

impl PythonProfile {
    pub fn import_modules(&self) -> Vec<String> {
        if !self.smoke_modules.is_empty() {
            return self.smoke_modules.clone();
        }
        self.packages.iter().map(|pin| import_name(pin.as_str())).collect()
    }
}

/// 由 pip 版本釘選推導 import 名稱，例如 "pyserial==3.5" → "serial"
fn import_name(pin: &str) -> String {
    let distribution = pin
        .split(|c: char| "=<>!~;[ ".contains(c))
        .next()
        .unwrap_or(pin)
        .trim()
        .to_lowercase();

    match distribution.as_str() {
        "pyserial" => "serial".to_string(),
        "mysql-connector-python" => "mysql.connector".to_string(),
        other => other.replace('-', "_"),
    }
}

impl Default for PythonConfig {
    fn default() -> Self {
        let profile = |min: &str, pins: &[&str]| PythonProfile {
            min_version: min.to_string(),
            packages: pins.iter().map(|s| s.to_string()).collect(),
            smoke_modules: ["serial", "mysql.connector", "pandas"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        Self {
            interpreter: "python3".to_string(),
            venv_dir_name: "soil_monitor_env".to_string(),
            profiles: vec![
                profile(
                    "3.11",
                    &["pyserial==3.5", "mysql-connector-python==8.3.0", "pandas==2.2.2"],
                ),
                profile(
                    "3.9",
                    &["pyserial==3.5", "mysql-connector-python==8.0.33", "pandas==1.5.3"],
                ),
                profile(
                    "3.7",
                    &["pyserial==3.5", "mysql-connector-python==8.0.29", "pandas==1.3.5"],
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 倉庫內的設定檔
    pub config_file: String,
    pub entry_point: String,
    pub serial: SerialPolicy,
    pub database: DatabaseOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: "Config.py".to_string(),
            entry_point: "MainController.py".to_string(),
            serial: SerialPolicy::default(),
            database: DatabaseOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedAction {
    #[default]
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialPolicy {
    /// 開發機（非樹莓派）上的預設值
    pub placeholder: String,
    pub target: String,
    pub recognized: Vec<String>,
    pub on_unrecognized: UnrecognizedAction,
}

impl Default for SerialPolicy {
    fn default() -> Self {
        Self {
            placeholder: "COM3".to_string(),
            target: "/dev/ttyUSB0".to_string(),
            recognized: ["/dev/ttyUSB0", "/dev/ttyUSB1", "/dev/ttyAMA0", "/dev/serial0", "/dev/ttyS0"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            on_unrecognized: UnrecognizedAction::Warn,
        }
    }
}

/// 覆寫 DB_CONFIG 內的欄位，未設定者保持原值
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

impl DatabaseOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub description: String,
    pub restart_sec: u64,
    pub launcher_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            description: "Soil Monitor sensor logging service".to_string(),
            restart_sec: 10,
            launcher_name: "start_soil_monitor.sh".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// app 目錄下的日誌資料夾
    pub dir_name: String,
    pub file_name: String,
    pub frequency: String,
    pub rotate: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir_name: "logs".to_string(),
            file_name: "soil_monitor.log".to_string(),
            frequency: "daily".to_string(),
            rotate: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub health_check: String,
    pub cleanup: String,
    pub cleanup_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            health_check: "*/5 * * * *".to_string(),
            cleanup: "0 3 * * 0".to_string(),
            cleanup_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub test_urls: Vec<String>,
    pub timeout_secs: u64,
    pub required: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            test_urls: vec![
                "http://www.google.com".to_string(),
                "http://www.cloudflare.com".to_string(),
            ],
            timeout_secs: 3,
            required: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RebootPolicy {
    #[default]
    Ask,
    Always,
    Never,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebootConfig {
    pub policy: RebootPolicy,
    pub countdown_secs: u64,
}

impl Default for RebootConfig {
    fn default() -> Self {
        Self {
            policy: RebootPolicy::Ask,
            countdown_secs: 10,
        }
    }
}

impl SetupConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SetupError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SetupError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 指定路徑則必須存在；否則嘗試預設檔名，再退回內建預設值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }

    /// 替換環境變數 (例如 ${DB_PASSWORD})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::OnceLock;

        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"));

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(user) = &self.target.user {
            validation::validate_unix_name("target.user", user)?;
        }
        if let Some(home) = &self.target.home {
            validation::validate_home_path("target.home", home)?;
        }
        validation::validate_unix_name("target.service_name", &self.target.service_name)?;

        validation::validate_repository_url("repository.url", &self.repository.url)?;
        validation::validate_path_component("repository.dir_name", &self.repository.dir_name)?;
        if self.repository.required_files.is_empty() {
            return Err(SetupError::MissingConfigError {
                field: "repository.required_files".to_string(),
            });
        }

        validation::validate_unix_name("system.serial_group", &self.system.serial_group)?;

        validation::validate_non_empty_string("python.interpreter", &self.python.interpreter)?;
        validation::validate_path_component("python.venv_dir_name", &self.python.venv_dir_name)?;
        if self.python.profiles.is_empty() {
            return Err(SetupError::MissingConfigError {
                field: "python.profiles".to_string(),
            });
        }
        for profile in &self.python.profiles {
            profile
                .min_version
                .parse::<crate::domain::model::PythonVersion>()
                .map_err(|_| SetupError::InvalidConfigValueError {
                    field: "python.profiles.min_version".to_string(),
                    value: profile.min_version.clone(),
                    reason: "Expected a version such as 3.11".to_string(),
                })?;
        }

        validation::validate_path_component("app.config_file", &self.app.config_file)?;
        validation::validate_path_component("app.entry_point", &self.app.entry_point)?;
        validation::validate_non_empty_string("app.serial.target", &self.app.serial.target)?;

        validation::validate_path_component("service.launcher_name", &self.service.launcher_name)?;
        validation::validate_range("service.restart_sec", self.service.restart_sec, 1, 3600)?;

        validation::validate_path_component("logging.dir_name", &self.logging.dir_name)?;
        validation::validate_path_component("logging.file_name", &self.logging.file_name)?;
        let valid_frequencies = ["daily", "weekly", "monthly"];
        if !valid_frequencies.contains(&self.logging.frequency.as_str()) {
            return Err(SetupError::InvalidConfigValueError {
                field: "logging.frequency".to_string(),
                value: self.logging.frequency.clone(),
                reason: format!(
                    "Unsupported frequency. Valid values: {}",
                    valid_frequencies.join(", ")
                ),
            });
        }
        validation::validate_range("logging.rotate", self.logging.rotate, 1, 365)?;

        validation::validate_cron_expression("schedule.health_check", &self.schedule.health_check)?;
        validation::validate_cron_expression("schedule.cleanup", &self.schedule.cleanup)?;
        validation::validate_range("schedule.cleanup_days", self.schedule.cleanup_days, 1, 3650)?;

        for url in &self.network.test_urls {
            validation::validate_http_url("network.test_urls", url)?;
        }
        validation::validate_range("network.timeout_secs", self.network.timeout_secs, 1, 60)?;

        Ok(())
    }
}

impl Validate for SetupConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
