use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Wrong invoking identity: {message}")]
    WrongIdentity { message: String },

    #[error("Privilege escalation unavailable: {message}")]
    PrivilegeUnavailable { message: String },

    #[error("Interpreter not found: {program}")]
    InterpreterMissing { program: String },

    #[error("Unsupported interpreter version {version}: {reason}")]
    UnsupportedInterpreter { version: String, reason: String },

    #[error("Command failed: `{command}` (exit code: {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Missing source files in {dir}: {}", files.join(", "))]
    MissingSourceFiles { dir: String, files: Vec<String> },

    #[error("No network connectivity (tried: {})", urls.join(", "))]
    NetworkUnavailable { urls: Vec<String> },

    #[error("Unrecognized serial port value '{value}' in {file}")]
    UnrecognizedSerialPort { file: String, value: String },

    #[error("Smoke test failed, modules not importable: {}", modules.join(", "))]
    SmokeTestFailed { modules: Vec<String> },

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<SetupError>,
    },

    #[error("Provisioning context error: {message}")]
    ContextError { message: String },
}

impl SetupError {
    /// 取得最內層的錯誤（跳過 StepFailed 包裝）
    pub fn root_cause(&self) -> &SetupError {
        match self {
            SetupError::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// 給使用者看的錯誤訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            SetupError::StepFailed { step, source } => {
                format!("[{}] {}", step, source.user_friendly_message())
            }
            SetupError::WrongIdentity { message } => {
                format!("ERROR: wrong user. {}", message)
            }
            SetupError::PrivilegeUnavailable { .. } => {
                "ERROR: this user cannot run commands with sudo".to_string()
            }
            SetupError::InterpreterMissing { program } => {
                format!("ERROR: '{}' is not installed or not on PATH", program)
            }
            SetupError::MissingSourceFiles { dir, files } => {
                format!("ERROR: {} not found in {}", files.join(", "), dir)
            }
            SetupError::NetworkUnavailable { .. } => {
                "ERROR: no internet connection".to_string()
            }
            SetupError::SmokeTestFailed { modules } => {
                format!("ERROR: cannot import {}", modules.join(", "))
            }
            other => format!("ERROR: {}", other),
        }
    }

    /// 修復建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self.root_cause() {
            SetupError::WrongIdentity { .. } => {
                "Run the installer as the regular device user (for example `pi`), not as root or via sudo"
            }
            SetupError::PrivilegeUnavailable { .. } => {
                "Add the user to the sudo group or configure sudoers, then re-run"
            }
            SetupError::InterpreterMissing { .. } => {
                "Install python3 (`sudo apt-get install python3`) or set python.interpreter in the config"
            }
            SetupError::UnsupportedInterpreter { .. } => {
                "Upgrade the system interpreter or add a matching [[python.profiles]] entry"
            }
            SetupError::MissingSourceFiles { .. } => {
                "Check repository.url and repository.branch point at the Soil Monitor sources"
            }
            SetupError::NetworkUnavailable { .. } | SetupError::HttpError(_) => {
                "Check the network connection or set network.required = false"
            }
            SetupError::CommandFailed { .. } => {
                "Inspect the command output above, fix the cause and re-run; completed steps are safe to repeat"
            }
            SetupError::UnrecognizedSerialPort { .. } => {
                "Set SERIAL_PORT manually or add the value to app.serial.recognized"
            }
            SetupError::SmokeTestFailed { .. } => {
                "Re-run the installer; if it persists, install the missing libraries into the environment by hand"
            }
            SetupError::ConfigError { .. }
            | SetupError::MissingConfigError { .. }
            | SetupError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and try again"
            }
            _ => "Re-run with --verbose for more details",
        }
    }

    /// 依錯誤種類決定程式結束碼
    pub fn exit_code(&self) -> i32 {
        match self.root_cause() {
            SetupError::NetworkUnavailable { .. }
            | SetupError::HttpError(_)
            | SetupError::CommandFailed { .. } => 2,
            SetupError::SmokeTestFailed { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, SetupError>;
